//! Static definition of the login sequence.
//!
//! Each stage names one logical element, the alternative criteria that may
//! match it across page-markup variants, and the single action to perform.
//! The two deployment variants (with and without the portal address step)
//! share one stage builder parameterized by the configuration.

use std::time::Duration;

use crate::core::Config;
use crate::locate::Criterion;

/// Which configured value a fill stage enters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillValue {
    Portal,
    Username,
    Password,
    /// Generated at the moment the stage runs, never earlier.
    OneTimeCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAction {
    Fill(FillValue),
    Click,
}

#[derive(Debug, Clone)]
pub struct Stage {
    pub name: &'static str,
    pub criteria: Vec<Criterion>,
    pub action: StageAction,
    pub timeout: Duration,
    /// When the element never appears, skip the stage instead of failing.
    pub optional: bool,
    /// Fixed wait after the action, for page behavior we cannot observe.
    pub settle_after: Option<Duration>,
}

impl Stage {
    fn fill(name: &'static str, value: FillValue, criteria: Vec<Criterion>, timeout: Duration) -> Self {
        Self {
            name,
            criteria,
            action: StageAction::Fill(value),
            timeout,
            optional: false,
            settle_after: None,
        }
    }

    fn click(name: &'static str, criteria: Vec<Criterion>, timeout: Duration) -> Self {
        Self {
            name,
            criteria,
            action: StageAction::Click,
            timeout,
            optional: false,
            settle_after: None,
        }
    }
}

/// Build the ordered stage list for this run. The portal stages are only
/// present when a portal address is configured.
pub fn login_stages(config: &Config) -> Vec<Stage> {
    let timing = &config.timing;
    let mut stages = Vec::new();

    if config.credentials.portal.is_some() {
        stages.push(Stage::fill(
            "portal",
            FillValue::Portal,
            vec![
                Criterion::css("input[type=\"text\"]"),
                Criterion::css("input[name=\"portal\"]"),
                Criterion::css("input[placeholder*=\"portal\" i]"),
            ],
            timing.field_timeout,
        ));
        stages.push(Stage::click(
            "portal-submit",
            vec![
                Criterion::text("Connect"),
                Criterion::css("input[type=\"submit\"]"),
                Criterion::css("button[type=\"submit\"]"),
            ],
            timing.button_timeout,
        ));
    }

    stages.push(Stage::fill(
        "username",
        FillValue::Username,
        vec![
            Criterion::css("input[name=\"username\"]"),
            Criterion::css("input#username"),
            Criterion::css("input[type=\"email\"]"),
        ],
        timing.field_timeout,
    ));
    stages.push(Stage::click(
        "username-submit",
        vec![
            Criterion::text("Continue"),
            Criterion::css("button[type=\"submit\"]"),
            Criterion::css("input[type=\"submit\"]"),
        ],
        timing.button_timeout,
    ));

    stages.push(Stage::fill(
        "password",
        FillValue::Password,
        vec![
            Criterion::css("input[name=\"password\"]"),
            Criterion::css("input#password"),
            Criterion::css("input[type=\"password\"]"),
        ],
        timing.field_timeout,
    ));
    stages.push(Stage::click(
        "password-submit",
        vec![
            Criterion::text("Continue"),
            Criterion::text("Sign In"),
            Criterion::text("Log In"),
            Criterion::css("button[type=\"submit\"]"),
        ],
        timing.button_timeout,
    ));

    // Accounts with a hardware key as the default method land on its prompt
    // instead of the chooser; switching factors brings the chooser up.
    stages.push(Stage {
        name: "change-mfa-factor",
        criteria: vec![
            Criterion::text("Change Authentication Factor"),
            Criterion::css("[data-mfa=\"change\"]"),
        ],
        action: StageAction::Click,
        timeout: timing.mfa_timeout,
        optional: true,
        settle_after: Some(timing.mfa_settle),
    });

    // Some accounts land directly on the code entry page; the chooser is
    // speculative.
    stages.push(Stage {
        name: "mfa-method",
        criteria: vec![
            Criterion::text("Google Authenticator"),
            Criterion::css("[data-mfa=\"google\"]"),
        ],
        action: StageAction::Click,
        timeout: timing.mfa_timeout,
        optional: true,
        settle_after: Some(timing.mfa_settle),
    });

    stages.push(Stage::fill(
        "one-time-code",
        FillValue::OneTimeCode,
        vec![
            Criterion::css("input#security-code"),
            Criterion::css("input[name=\"otp\"]"),
            Criterion::css("input[name=\"totp\"]"),
            Criterion::css("input[name=\"code\"]"),
            Criterion::css("input[type=\"tel\"]"),
            Criterion::css("input[placeholder*=\"code\" i]"),
        ],
        timing.field_timeout,
    ));
    stages.push(Stage::click(
        "submit",
        vec![
            Criterion::text("Verify"),
            Criterion::text("Continue"),
            Criterion::text("Submit"),
            Criterion::css("button[type=\"submit\"]"),
        ],
        timing.button_timeout,
    ));

    stages
}
