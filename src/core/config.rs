use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{AutofillError, Result};

/// Everything a run needs, resolved once at startup. Components receive
/// this by reference and never read the process environment themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub credentials: Credentials,
    pub endpoint: Endpoint,
    pub timing: Timing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Target portal address. When absent the flow starts directly at the
    /// username stage.
    pub portal: Option<String>,
    pub username: String,
    pub password: String,
    pub totp_secret: String,
}

/// Local remote-debugging endpoint of the embedding browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timing {
    pub probe_attempts: u32,
    pub probe_interval: Duration,
    /// Wait after the endpoint reports ready, before attaching. The page
    /// inside the embedding browser is still finishing its own navigation.
    pub ready_settle: Duration,
    /// Wait after clicking the MFA method chooser.
    pub mfa_settle: Duration,
    /// Wait after the final submit before releasing the session.
    pub close_delay: Duration,
    pub field_timeout: Duration,
    pub button_timeout: Duration,
    pub mfa_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9222,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            probe_attempts: 30,
            probe_interval: Duration::from_millis(2000),
            ready_settle: Duration::from_secs(3),
            mfa_settle: Duration::from_secs(3),
            close_delay: Duration::from_secs(5),
            field_timeout: Duration::from_secs(30),
            button_timeout: Duration::from_secs(5),
            mfa_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl Endpoint {
    /// Base URL of the DevTools HTTP interface.
    pub fn http_base(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// WebSocket URL for a specific page target.
    pub fn page_ws_url(&self, target_id: &str) -> String {
        format!("ws://{}:{}/devtools/page/{}", self.host, self.port, target_id)
    }
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let credentials = Credentials {
            portal: lookup("GP_PORTAL").filter(|v| !v.trim().is_empty()),
            username: required(&lookup, "GP_USERNAME")?,
            password: required(&lookup, "GP_PASSWORD")?,
            totp_secret: required(&lookup, "GP_TOTP_SECRET")?,
        };

        let mut endpoint = Endpoint::default();
        if let Some(port) = lookup("QTWEBENGINE_REMOTE_DEBUGGING").filter(|v| !v.trim().is_empty())
        {
            endpoint.port = port.trim().parse().map_err(|_| {
                AutofillError::Configuration(format!(
                    "QTWEBENGINE_REMOTE_DEBUGGING is not a valid port: {}",
                    port
                ))
            })?;
        }

        let mut timing = Timing::default();
        if let Some(delay) = lookup("STEP_DELAY").filter(|v| !v.trim().is_empty()) {
            let seconds: u64 = delay.trim().parse().map_err(|_| {
                AutofillError::Configuration(format!(
                    "STEP_DELAY is not a valid number of seconds: {}",
                    delay
                ))
            })?;
            timing.ready_settle = Duration::from_secs(seconds);
            timing.mfa_settle = Duration::from_secs(seconds);
        }

        Ok(Self {
            credentials,
            endpoint,
            timing,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AutofillError::Configuration(format!("{} must be set", name)))
}
