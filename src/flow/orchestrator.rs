use tokio::time::sleep;

use crate::core::{Config, PageDriver};
use crate::errors::{AutofillError, Result};
use crate::locate::{self, Located};
use crate::totp::CodeGenerator;

use super::stage::{login_stages, FillValue, Stage, StageAction};

/// Drives the login sequence stage by stage. Strictly sequential: a stage
/// only starts once the previous one completed, and any failure aborts the
/// whole run.
pub struct LoginFlow<'a> {
    config: &'a Config,
    stages: Vec<Stage>,
}

impl<'a> LoginFlow<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            stages: login_stages(config),
        }
    }

    /// Run with a custom stage list. New markup variants get new criteria,
    /// not new orchestration.
    pub fn with_stages(config: &'a Config, stages: Vec<Stage>) -> Self {
        Self { config, stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub async fn run<P, G>(&self, page: &P, codes: &G) -> Result<()>
    where
        P: PageDriver + ?Sized,
        G: CodeGenerator + ?Sized,
    {
        for stage in &self.stages {
            self.run_stage(page, codes, stage).await?;
        }
        tracing::info!("credentials submitted");
        Ok(())
    }

    async fn run_stage<P, G>(&self, page: &P, codes: &G, stage: &Stage) -> Result<()>
    where
        P: PageDriver + ?Sized,
        G: CodeGenerator + ?Sized,
    {
        tracing::info!(stage = stage.name, "waiting for element");

        let located = locate::wait_for_any(
            page,
            &stage.criteria,
            stage.timeout,
            self.config.timing.poll_interval,
            stage.optional,
        )
        .await
        .map_err(|e| match e {
            AutofillError::ElementNotFound(msg) => {
                AutofillError::ElementNotFound(format!("{}: {}", stage.name, msg))
            }
            other => other,
        })?;

        if located == Located::Absent {
            tracing::info!(stage = stage.name, "element absent, skipping optional stage");
            return Ok(());
        }

        let acted = match stage.action {
            StageAction::Fill(value) => {
                let text = self.resolve(value, codes).await?;
                page.fill(&stage.criteria, &text).await?
            }
            StageAction::Click => page.click(&stage.criteria).await?,
        };

        if !acted {
            return Err(AutofillError::ElementNotFound(format!(
                "{}: element vanished before the action",
                stage.name
            )));
        }
        tracing::info!(stage = stage.name, "stage complete");

        if let Some(delay) = stage.settle_after {
            sleep(delay).await;
        }
        Ok(())
    }

    async fn resolve<G>(&self, value: FillValue, codes: &G) -> Result<String>
    where
        G: CodeGenerator + ?Sized,
    {
        match value {
            FillValue::Portal => self.config.credentials.portal.clone().ok_or_else(|| {
                AutofillError::Configuration(
                    "portal stage present without a portal address".to_string(),
                )
            }),
            FillValue::Username => Ok(self.config.credentials.username.clone()),
            FillValue::Password => Ok(self.config.credentials.password.clone()),
            // Codes expire within a short rolling window; generate at the
            // last possible moment.
            FillValue::OneTimeCode => {
                let code = codes.current_code().await?;
                tracing::info!("generated one-time code");
                Ok(code)
            }
        }
    }
}
