//! Attaching to the already-running embedding browser.
//!
//! The browser is an external collaborator: it was started by the
//! embedding application with remote debugging enabled, and is expected to
//! host exactly one window with one page. Selection is deterministic
//! first-found; multiple contexts or pages are not disambiguated.

use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::cdp::{CdpClient, CdpPage};
use crate::core::Endpoint;
use crate::errors::{AutofillError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub web_socket_debugger_url: String,
}

/// One entry of `Target.getTargets`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub target_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub browser_context_id: Option<String>,
}

/// Attach to the running browser and return a handle to the first page of
/// the first browsing context.
pub async fn attach(client: &reqwest::Client, endpoint: &Endpoint) -> Result<CdpPage> {
    let version_url = format!("{}/json/version", endpoint.http_base());
    let version: VersionInfo = client
        .get(&version_url)
        .send()
        .await
        .map_err(|e| AutofillError::Attach(format!("failed to query {}: {}", version_url, e)))?
        .json()
        .await
        .map_err(|e| AutofillError::Attach(format!("invalid /json/version payload: {}", e)))?;

    Url::parse(&version.web_socket_debugger_url).map_err(|e| {
        AutofillError::Attach(format!(
            "invalid debugger URL {}: {}",
            version.web_socket_debugger_url, e
        ))
    })?;

    let browser = CdpClient::connect(&version.web_socket_debugger_url).await?;
    let targets = list_targets(&browser).await;
    // The enumeration connection is only needed to choose a target.
    if let Err(e) = browser.close().await {
        tracing::warn!(error = %e, "failed to close browser-level connection");
    }

    let targets = targets?;
    let target = select_first_page(&targets)?;
    tracing::info!(
        title = %target.title,
        url = %target.url,
        "attaching to page"
    );

    let page_client = CdpClient::connect(&endpoint.page_ws_url(&target.target_id)).await?;
    page_client.enable_domain("Runtime").await?;
    Ok(CdpPage::new(page_client))
}

async fn list_targets(browser: &CdpClient) -> Result<Vec<TargetInfo>> {
    let result = browser.call("Target.getTargets", json!({})).await?;
    let infos = result.get("targetInfos").cloned().unwrap_or_else(|| json!([]));
    Ok(serde_json::from_value(infos)?)
}

/// Pick the first page of the first browsing context. The first context is
/// the context of the first reported target.
pub fn select_first_page(targets: &[TargetInfo]) -> Result<&TargetInfo> {
    let first = targets
        .first()
        .ok_or_else(|| AutofillError::Attach("no contexts".to_string()))?;

    targets
        .iter()
        .filter(|t| t.browser_context_id == first.browser_context_id)
        .find(|t| t.kind == "page")
        .ok_or_else(|| AutofillError::Attach("no pages".to_string()))
}
