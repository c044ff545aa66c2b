//! Connector configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConnectError, Result};

pub const DEFAULT_PORT: u16 = 8100;
pub const DEFAULT_COUNTER_MAX: u32 = 5000;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything the connector needs to know to reach a Calc instance.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Path to the `soffice` executable. If None, searches PATH.
    pub soffice_path: Option<PathBuf>,
    /// Host the acceptor binds to and the bridge dials. Default: "localhost".
    pub host: String,
    /// Port for the URP socket. Default: 8100.
    pub port: u16,
    /// Maximum number of bridge attempts. Zero fails without trying.
    pub counter_max: u32,
    /// Pause between attempts for the default fixed-delay strategy.
    pub retry_delay: Duration,
    /// Longest a single bridge attempt (TCP connect plus handshake) may take.
    pub attempt_timeout: Duration,
    /// Load documents without showing a window.
    pub hidden: bool,
    /// Spawn `soffice` before dialing. When false, attach to a running instance.
    pub launch: bool,
    /// Extra arguments appended to the `soffice` command line.
    pub extra_args: Vec<String>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            soffice_path: None,
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            counter_max: DEFAULT_COUNTER_MAX,
            retry_delay: DEFAULT_RETRY_DELAY,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            hidden: false,
            launch: true,
            extra_args: Vec::new(),
        }
    }
}

impl ConnectorConfig {
    /// Default configuration bound to `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(ConnectError::InvalidConfig("port must be positive".into()));
        }
        if self.attempt_timeout.is_zero() {
            return Err(ConnectError::InvalidConfig(
                "attempt_timeout must be positive".into(),
            ));
        }
        if self.host.is_empty() {
            return Err(ConnectError::InvalidConfig("host must not be empty".into()));
        }
        Ok(())
    }

    /// The acceptor description passed to `soffice --accept=`.
    pub fn accept_string(&self) -> String {
        format!(
            "socket,host={},port={};urp;StarOffice.ComponentContext",
            self.host, self.port
        )
    }

    pub fn program(&self) -> PathBuf {
        self.soffice_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("soffice"))
    }
}
