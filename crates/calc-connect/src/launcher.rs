//! Starting LibreOffice with a URP acceptor.

use std::process::Stdio;

use tokio::process::Command;

use crate::config::ConnectorConfig;
use crate::error::{ConnectError, Result};
use crate::process::OfficeProcess;

/// Starts (or declines to start) the office process before the bridge is dialed.
pub trait Launcher: Send + Sync {
    /// Returns the spawned process, or None when nothing was launched.
    fn launch(&self, config: &ConnectorConfig) -> Result<Option<OfficeProcess>>;
}

/// Spawns `soffice` headless with `--accept` on the configured host and port.
#[derive(Debug, Clone, Copy, Default)]
pub struct SofficeLauncher;

impl SofficeLauncher {
    /// The command line [`launch`](Launcher::launch) runs.
    pub fn command(config: &ConnectorConfig) -> Command {
        let mut cmd = Command::new(config.program());
        cmd.arg("--headless")
            .arg("--invisible")
            .arg("--nocrashreport")
            .arg("--nodefault")
            .arg("--nologo")
            .arg("--nofirststartwizard")
            .arg("--norestore")
            .arg(format!("--accept={}", config.accept_string()))
            .args(&config.extra_args);

        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

impl Launcher for SofficeLauncher {
    fn launch(&self, config: &ConnectorConfig) -> Result<Option<OfficeProcess>> {
        let mut cmd = Self::command(config);
        tracing::info!("Starting LibreOffice: {:?}", cmd.as_std());
        let child = cmd.spawn().map_err(|source| ConnectError::ProcessLaunch {
            program: config.program(),
            source,
        })?;
        tracing::debug!("LibreOffice spawned with pid {:?}", child.id());
        Ok(Some(OfficeProcess::new(child)))
    }
}
