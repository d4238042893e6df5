//! Reloading the reverse proxy after certificate paths change.

use std::{
    path::{Path, PathBuf},
    process::Output,
};

use thiserror::Error;
use tokio::process::Command;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("failed to run {}: {source}", .binary.display())]
    Spawn {
        binary: PathBuf,
        source: std::io::Error,
    },

    #[error("`nginx {step}` exited with {status}: {stderr}")]
    Failed {
        step: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Validates and reloads a running nginx.
#[derive(Debug, Clone)]
pub struct NginxReloader {
    binary: PathBuf,
}

impl NginxReloader {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Runs `nginx -t` and, if the configuration is valid, `nginx -s reload`.
    #[instrument(skip(self), fields(binary = %self.binary.display()))]
    pub async fn reload(&self) -> Result<(), ReloadError> {
        self.run("-t", &["-t"]).await?;
        self.run("-s reload", &["-s", "reload"]).await?;
        info!("nginx reloaded");
        Ok(())
    }

    async fn run(&self, step: &'static str, args: &[&str]) -> Result<Output, ReloadError> {
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|source| ReloadError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ReloadError::Failed {
                step,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}
