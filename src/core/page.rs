use async_trait::async_trait;

use crate::errors::Result;
use crate::locate::Criterion;

/// Minimal surface the login flow needs from a page. The production
/// implementation drives a real page over the DevTools protocol; tests
/// substitute a scripted page.
///
/// Every method takes the full criteria list for one logical element; the
/// alternatives are treated as equivalent and matched as a whole.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Whether any of the criteria currently matches an element.
    async fn probe(&self, criteria: &[Criterion]) -> Result<bool>;

    /// Fill the first matching element with `value`. Returns `false` if no
    /// element matched at action time.
    async fn fill(&self, criteria: &[Criterion], value: &str) -> Result<bool>;

    /// Click the first matching element. Returns `false` if no element
    /// matched at action time.
    async fn click(&self, criteria: &[Criterion]) -> Result<bool>;

    /// Release the underlying session handle.
    async fn close(&self) -> Result<()>;
}
