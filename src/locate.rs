use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::core::PageDriver;
use crate::errors::{AutofillError, Result};

/// One way of identifying a logical element on the target page. Each stage
/// carries several of these because the login page's markup is not under
/// our control and varies between deployments; the alternatives are
/// logically OR'd.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    /// CSS selector.
    Css(String),
    /// Visible text content of a clickable element.
    Text(String),
}

impl Criterion {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn text(needle: impl Into<String>) -> Self {
        Self::Text(needle.into())
    }
}

/// Outcome of an element wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Located {
    Present,
    /// Only produced in optional mode.
    Absent,
}

/// Wait until any criterion matches an element, polling every
/// `poll_interval` up to `timeout`. A timeout is fatal unless `optional`,
/// in which case it means the element is simply not part of this page.
pub async fn wait_for_any<P: PageDriver + ?Sized>(
    page: &P,
    criteria: &[Criterion],
    timeout: Duration,
    poll_interval: Duration,
    optional: bool,
) -> Result<Located> {
    let deadline = Instant::now() + timeout;

    loop {
        if page.probe(criteria).await? {
            return Ok(Located::Present);
        }

        let now = Instant::now();
        if now >= deadline {
            break;
        }
        sleep(poll_interval.min(deadline - now)).await;
    }

    if optional {
        Ok(Located::Absent)
    } else {
        Err(AutofillError::ElementNotFound(describe(criteria)))
    }
}

/// Human-readable rendering of a criteria list for error messages.
pub fn describe(criteria: &[Criterion]) -> String {
    criteria
        .iter()
        .map(|c| match c {
            Criterion::Css(selector) => selector.clone(),
            Criterion::Text(needle) => format!("text \"{}\"", needle),
        })
        .collect::<Vec<_>>()
        .join(" | ")
}
