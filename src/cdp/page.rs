//! Page handle driving a single tab through `Runtime.evaluate`.
//!
//! All interaction is lowered to generated JavaScript probes and actions.
//! Criteria lists become a comma-joined `querySelector` call (CSS
//! alternatives) plus a text-content scan over clickable elements (text
//! alternatives). Values are embedded via JSON string encoding so
//! arbitrary credentials cannot break out of the script.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::cdp::client::CdpClient;
use crate::core::PageDriver;
use crate::errors::{AutofillError, Result};
use crate::locate::Criterion;

/// Elements considered when matching a text criterion.
const TEXT_POOL: &str = "a, button, div[role=\"button\"], li, span";

pub struct CdpPage {
    client: CdpClient,
}

impl CdpPage {
    pub fn new(client: CdpClient) -> Self {
        Self { client }
    }

    /// Evaluate a JavaScript expression in the page and return its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        let result = self
            .client
            .call(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                }),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            let message = details
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(Value::as_str)
                .or_else(|| details.get("text").and_then(Value::as_str))
                .unwrap_or("unknown exception");
            return Err(AutofillError::Cdp(format!(
                "JavaScript exception: {}",
                message
            )));
        }

        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn evaluate_bool(&self, expression: &str) -> Result<bool> {
        Ok(self.evaluate(expression).await?.as_bool().unwrap_or(false))
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn probe(&self, criteria: &[Criterion]) -> Result<bool> {
        self.evaluate_bool(&build_probe_script(criteria)).await
    }

    async fn fill(&self, criteria: &[Criterion], value: &str) -> Result<bool> {
        self.evaluate_bool(&build_fill_script(criteria, value)).await
    }

    async fn click(&self, criteria: &[Criterion]) -> Result<bool> {
        self.evaluate_bool(&build_click_script(criteria)).await
    }

    async fn close(&self) -> Result<()> {
        self.client.close().await
    }
}

fn css_selectors(criteria: &[Criterion]) -> Vec<&str> {
    criteria
        .iter()
        .filter_map(|c| match c {
            Criterion::Css(selector) => Some(selector.as_str()),
            Criterion::Text(_) => None,
        })
        .collect()
}

fn text_needles(criteria: &[Criterion]) -> Vec<&str> {
    criteria
        .iter()
        .filter_map(|c| match c {
            Criterion::Text(needle) => Some(needle.as_str()),
            Criterion::Css(_) => None,
        })
        .collect()
}

fn js_array(items: &[&str]) -> String {
    // Vec<&str> always serializes.
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Script returning whether any criterion currently matches an element.
pub fn build_probe_script(criteria: &[Criterion]) -> String {
    format!(
        r#"(function() {{
    var selectors = {selectors};
    var needles = {needles};
    if (selectors.length && document.querySelector(selectors.join(", ")) !== null) return true;
    if (needles.length) {{
        var pool = document.querySelectorAll('{pool}');
        for (var i = 0; i < pool.length; i++) {{
            for (var j = 0; j < needles.length; j++) {{
                if (pool[i].textContent.includes(needles[j])) return true;
            }}
        }}
    }}
    return false;
}})()"#,
        selectors = js_array(&css_selectors(criteria)),
        needles = js_array(&text_needles(criteria)),
        pool = TEXT_POOL,
    )
}

/// Script filling the first matching element. Dispatches `input` and
/// `change` so framework-managed forms pick up the value.
pub fn build_fill_script(criteria: &[Criterion], value: &str) -> String {
    format!(
        r#"(function() {{
    var selectors = {selectors};
    if (!selectors.length) return false;
    var input = document.querySelector(selectors.join(", "));
    if (!input) return false;
    input.focus();
    input.value = {value};
    input.dispatchEvent(new Event('input', {{bubbles: true}}));
    input.dispatchEvent(new Event('change', {{bubbles: true}}));
    return true;
}})()"#,
        selectors = js_array(&css_selectors(criteria)),
        value = Value::from(value),
    )
}

/// Script clicking the first matching element.
pub fn build_click_script(criteria: &[Criterion]) -> String {
    format!(
        r#"(function() {{
    var selectors = {selectors};
    var needles = {needles};
    if (selectors.length) {{
        var el = document.querySelector(selectors.join(", "));
        if (el) {{ el.click(); return true; }}
    }}
    if (needles.length) {{
        var pool = document.querySelectorAll('{pool}');
        for (var i = 0; i < pool.length; i++) {{
            for (var j = 0; j < needles.length; j++) {{
                if (pool[i].textContent.includes(needles[j])) {{
                    pool[i].click();
                    return true;
                }}
            }}
        }}
    }}
    return false;
}})()"#,
        selectors = js_array(&css_selectors(criteria)),
        needles = js_array(&text_needles(criteria)),
        pool = TEXT_POOL,
    )
}
