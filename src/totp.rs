//! One-time code generation, delegated to an external generator.
//!
//! The secret-to-code algorithm is not implemented here; `oathtool` is
//! invoked as a black box and its stdout is used verbatim. Codes are only
//! valid for a short rolling window, so callers generate them immediately
//! before use.

use async_trait::async_trait;
use tokio::process::Command;

use crate::errors::{AutofillError, Result};

#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Produce the one-time code valid right now.
    async fn current_code(&self) -> Result<String>;
}

/// Generates codes by running `oathtool --totp -b <secret>`.
pub struct OathtoolGenerator {
    program: String,
    secret: String,
}

impl OathtoolGenerator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            program: "oathtool".to_string(),
            secret: secret.into(),
        }
    }

    /// Override the generator binary (used by tests).
    pub fn with_program(program: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl CodeGenerator for OathtoolGenerator {
    async fn current_code(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("--totp")
            .arg("-b")
            .arg(&self.secret)
            .output()
            .await
            .map_err(|e| {
                AutofillError::CodeGeneration(format!("failed to run {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AutofillError::CodeGeneration(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let code = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if code.is_empty() {
            return Err(AutofillError::CodeGeneration(format!(
                "{} produced no output",
                self.program
            )));
        }
        Ok(code)
    }
}
