//! The one-shot login run: probe, attach, drive, release.

pub mod orchestrator;
pub mod stage;

pub use orchestrator::LoginFlow;
pub use stage::{login_stages, FillValue, Stage, StageAction};

use tokio::time::sleep;

use crate::core::{Config, PageDriver};
use crate::errors::Result;
use crate::totp::{CodeGenerator, OathtoolGenerator};
use crate::{attach, probe};

/// Run the full login flow against an attached page, releasing the session
/// handle on every exit path.
pub async fn drive<P, G>(page: &P, codes: &G, config: &Config) -> Result<()>
where
    P: PageDriver + ?Sized,
    G: CodeGenerator + ?Sized,
{
    let flow = LoginFlow::new(config);
    let result = flow.run(page, codes).await;

    if result.is_ok() {
        // Give the submission time to reach the server before tearing down.
        sleep(config.timing.close_delay).await;
    }
    if let Err(e) = page.close().await {
        tracing::warn!(error = %e, "failed to release the session cleanly");
    }

    result
}

/// Entry point for the binary: wait for the debugging endpoint, attach to
/// the running page, and drive the login sequence.
pub async fn run_login(config: &Config) -> Result<()> {
    let http = reqwest::Client::new();

    probe::wait_until_ready(
        &http,
        &config.endpoint.http_base(),
        config.timing.probe_attempts,
        config.timing.probe_interval,
    )
    .await?;

    // The embedded page is still running its own initial navigation when
    // the endpoint first answers.
    tracing::info!("endpoint ready, letting the page settle");
    sleep(config.timing.ready_settle).await;

    let page = attach::attach(&http, &config.endpoint).await?;
    let generator = OathtoolGenerator::new(config.credentials.totp_secret.clone());
    drive(&page, &generator, config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Credentials, Endpoint, Timing};
    use crate::errors::AutofillError;
    use crate::locate::{describe, Criterion};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Page that reveals elements phase by phase, the way the real login
    /// page does after each submission. Any successful click advances to
    /// the next phase.
    struct ScriptedPage {
        phases: Vec<Vec<Criterion>>,
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        phase: usize,
        fills: Vec<(String, String)>,
        clicks: Vec<String>,
        closed: bool,
    }

    impl ScriptedPage {
        fn new(phases: Vec<Vec<Criterion>>) -> Self {
            Self {
                phases,
                state: Mutex::new(ScriptedState::default()),
            }
        }

        fn matches(&self, phase: usize, criteria: &[Criterion]) -> bool {
            self.phases
                .get(phase)
                .map(|visible| visible.iter().any(|v| criteria.contains(v)))
                .unwrap_or(false)
        }

        fn fills(&self) -> Vec<(String, String)> {
            self.state.lock().unwrap().fills.clone()
        }

        fn clicks(&self) -> Vec<String> {
            self.state.lock().unwrap().clicks.clone()
        }

        fn closed(&self) -> bool {
            self.state.lock().unwrap().closed
        }
    }

    #[async_trait]
    impl PageDriver for ScriptedPage {
        async fn probe(&self, criteria: &[Criterion]) -> crate::errors::Result<bool> {
            let state = self.state.lock().unwrap();
            Ok(self.matches(state.phase, criteria))
        }

        async fn fill(&self, criteria: &[Criterion], value: &str) -> crate::errors::Result<bool> {
            let mut state = self.state.lock().unwrap();
            if !self.matches(state.phase, criteria) {
                return Ok(false);
            }
            let target = describe(criteria);
            state.fills.push((target, value.to_string()));
            Ok(true)
        }

        async fn click(&self, criteria: &[Criterion]) -> crate::errors::Result<bool> {
            let mut state = self.state.lock().unwrap();
            if !self.matches(state.phase, criteria) {
                return Ok(false);
            }
            let target = describe(criteria);
            state.clicks.push(target);
            state.phase += 1;
            Ok(true)
        }

        async fn close(&self) -> crate::errors::Result<()> {
            self.state.lock().unwrap().closed = true;
            Ok(())
        }
    }

    struct FakeGenerator {
        code: String,
        calls: AtomicU32,
        fail: bool,
    }

    impl FakeGenerator {
        fn new(code: &str) -> Self {
            Self {
                code: code.to_string(),
                calls: AtomicU32::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                code: String::new(),
                calls: AtomicU32::new(0),
                fail: true,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CodeGenerator for FakeGenerator {
        async fn current_code(&self) -> crate::errors::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AutofillError::CodeGeneration("generator broke".to_string()));
            }
            Ok(self.code.clone())
        }
    }

    fn test_config(portal: Option<&str>) -> Config {
        Config {
            credentials: Credentials {
                portal: portal.map(|p| p.to_string()),
                username: "alice".to_string(),
                password: "secret".to_string(),
                totp_secret: "SECRET".to_string(),
            },
            endpoint: Endpoint::default(),
            timing: Timing {
                probe_attempts: 1,
                probe_interval: Duration::from_millis(1),
                ready_settle: Duration::from_millis(1),
                mfa_settle: Duration::from_millis(1),
                close_delay: Duration::from_millis(1),
                field_timeout: Duration::from_millis(80),
                button_timeout: Duration::from_millis(80),
                mfa_timeout: Duration::from_millis(30),
                poll_interval: Duration::from_millis(5),
            },
        }
    }

    fn username_phase() -> Vec<Criterion> {
        vec![
            Criterion::css("input[name=\"username\"]"),
            Criterion::text("Continue"),
        ]
    }

    fn password_phase() -> Vec<Criterion> {
        vec![
            Criterion::css("input[name=\"password\"]"),
            Criterion::text("Continue"),
        ]
    }

    fn code_phase() -> Vec<Criterion> {
        vec![
            Criterion::css("input[name=\"otp\"]"),
            Criterion::text("Verify"),
        ]
    }

    #[tokio::test]
    async fn test_full_flow_without_mfa_chooser() {
        let page = ScriptedPage::new(vec![
            username_phase(),
            password_phase(),
            code_phase(),
            vec![],
        ]);
        let codes = FakeGenerator::new("246810");
        let config = test_config(None);

        drive(&page, &codes, &config).await.unwrap();

        let fills = page.fills();
        assert_eq!(fills.len(), 3);
        assert!(fills[0].0.contains("username") && fills[0].1 == "alice");
        assert!(fills[1].0.contains("password") && fills[1].1 == "secret");
        // The generated code is used verbatim.
        assert!(fills[2].0.contains("otp") && fills[2].1 == "246810");
        assert_eq!(codes.calls(), 1);

        // The absent chooser was skipped with no action.
        assert!(page.clicks().iter().all(|c| !c.contains("Google Authenticator")));
        assert_eq!(page.clicks().len(), 3);
        assert!(page.closed());
    }

    #[tokio::test]
    async fn test_full_flow_with_mfa_chooser() {
        let page = ScriptedPage::new(vec![
            username_phase(),
            password_phase(),
            vec![Criterion::text("Google Authenticator")],
            code_phase(),
            vec![],
        ]);
        let codes = FakeGenerator::new("135790");
        let config = test_config(None);

        drive(&page, &codes, &config).await.unwrap();

        assert!(page
            .clicks()
            .iter()
            .any(|c| c.contains("Google Authenticator")));
        let fills = page.fills();
        assert_eq!(fills.last().unwrap().1, "135790");
        assert!(page.closed());
    }

    #[tokio::test]
    async fn test_hardware_key_default_switches_factor_first() {
        // The default factor is a hardware key, so the chooser only appears
        // after switching factors.
        let page = ScriptedPage::new(vec![
            username_phase(),
            password_phase(),
            vec![Criterion::text("Change Authentication Factor")],
            vec![Criterion::text("Google Authenticator")],
            code_phase(),
            vec![],
        ]);
        let codes = FakeGenerator::new("112233");
        let config = test_config(None);

        drive(&page, &codes, &config).await.unwrap();

        let clicks = page.clicks();
        let change = clicks
            .iter()
            .position(|c| c.contains("Change Authentication Factor"))
            .unwrap();
        let chooser = clicks
            .iter()
            .position(|c| c.contains("Google Authenticator"))
            .unwrap();
        assert!(change < chooser);
        assert_eq!(page.fills().last().unwrap().1, "112233");
        assert!(page.closed());
    }

    #[tokio::test]
    async fn test_portal_variant_enters_portal_first() {
        let page = ScriptedPage::new(vec![
            vec![
                Criterion::css("input[name=\"portal\"]"),
                Criterion::text("Connect"),
            ],
            username_phase(),
            password_phase(),
            code_phase(),
            vec![],
        ]);
        let codes = FakeGenerator::new("000000");
        let config = test_config(Some("vpn.example.com"));

        drive(&page, &codes, &config).await.unwrap();

        let fills = page.fills();
        assert!(fills[0].0.contains("portal") && fills[0].1 == "vpn.example.com");
        assert_eq!(fills[1].1, "alice");
        assert!(page.closed());
    }

    #[tokio::test]
    async fn test_missing_password_field_fails_and_releases_session() {
        // The page never reveals a password field after the username step.
        let page = ScriptedPage::new(vec![username_phase(), vec![]]);
        let codes = FakeGenerator::new("246810");
        let config = test_config(None);

        let err = drive(&page, &codes, &config).await.unwrap_err();

        match err {
            AutofillError::ElementNotFound(msg) => assert!(msg.contains("password")),
            other => panic!("unexpected error: {:?}", other),
        }
        // The code was never generated and the handle was still released.
        assert_eq!(codes.calls(), 0);
        assert!(page.closed());
    }

    #[tokio::test]
    async fn test_code_generation_failure_aborts_run() {
        let page = ScriptedPage::new(vec![
            username_phase(),
            password_phase(),
            code_phase(),
            vec![],
        ]);
        let codes = FakeGenerator::failing();
        let config = test_config(None);

        let err = drive(&page, &codes, &config).await.unwrap_err();

        assert!(matches!(err, AutofillError::CodeGeneration(_)));
        assert!(page.closed());
    }
}
