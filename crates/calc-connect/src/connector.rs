//! Launch, retry, load.

use std::path::Path;

use tokio::time::{sleep, timeout};

use crate::config::ConnectorConfig;
use crate::dialer::{Dialer, Session, UrpDialer};
use crate::document::{path_to_file_url, CalcDocument, NEW_CALC_DOCUMENT_URL};
use crate::error::{ConnectError, Result};
use crate::launcher::{Launcher, SofficeLauncher};
use crate::process::OfficeProcess;
use crate::retry::{FixedDelay, RetryStrategy};

/// Starts LibreOffice and connects to it, retrying until it is ready.
///
/// The three parts are swappable: a [`Launcher`] that starts the process, a
/// [`Dialer`] that makes one bridge attempt, and a [`RetryStrategy`] that
/// paces the attempts.
///
/// ```no_run
/// use std::path::Path;
/// use calc_connect::{Connector, ConnectorConfig};
///
/// # async fn run() -> calc_connect::Result<()> {
/// let mut connector = Connector::new(ConnectorConfig::default());
/// let mut doc = connector.connect(None).await?;
/// doc.store_as(Some(Path::new("results.ods"))).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Connector<L = SofficeLauncher, D = UrpDialer, R = FixedDelay> {
    config: ConnectorConfig,
    launcher: L,
    dialer: D,
    retry: R,
}

impl Connector {
    /// `soffice` on the configured port, URP bridge, fixed `retry_delay` pauses.
    pub fn new(config: ConnectorConfig) -> Self {
        let retry = FixedDelay(config.retry_delay);
        Self {
            config,
            launcher: SofficeLauncher,
            dialer: UrpDialer,
            retry,
        }
    }
}

impl Default for Connector {
    fn default() -> Self {
        Self::new(ConnectorConfig::default())
    }
}

impl<L, D, R> Connector<L, D, R> {
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn with_launcher<L2: Launcher>(self, launcher: L2) -> Connector<L2, D, R> {
        Connector {
            config: self.config,
            launcher,
            dialer: self.dialer,
            retry: self.retry,
        }
    }

    pub fn with_dialer<D2: Dialer>(self, dialer: D2) -> Connector<L, D2, R> {
        Connector {
            config: self.config,
            launcher: self.launcher,
            dialer,
            retry: self.retry,
        }
    }

    pub fn with_retry<R2: RetryStrategy>(self, retry: R2) -> Connector<L, D, R2> {
        Connector {
            config: self.config,
            launcher: self.launcher,
            dialer: self.dialer,
            retry,
        }
    }
}

impl<L: Launcher, D: Dialer, R: RetryStrategy> Connector<L, D, R> {
    /// Launches (unless `config.launch` is false), waits for the bridge, and
    /// opens `file`, or a new blank spreadsheet when `file` is None.
    ///
    /// If no attempt succeeds, or the document cannot be loaded, a process
    /// spawned by this call is killed before the error is returned. On
    /// success the process belongs to the returned handle and keeps running.
    pub async fn connect(&mut self, file: Option<&Path>) -> Result<CalcDocument<D::Session>> {
        self.config.validate()?;
        let url = match file {
            Some(path) => Some(path_to_file_url(path)?),
            None => None,
        };

        let process = if self.config.launch {
            self.launcher.launch(&self.config)?
        } else {
            None
        };

        let mut session = match self.dial_with_retry().await {
            Ok(session) => session,
            Err(e) => return Err(abandon(process, e).await),
        };

        let target = url.as_deref().unwrap_or(NEW_CALC_DOCUMENT_URL);
        let document = match session.load_component(target, self.config.hidden).await {
            Ok(document) => document,
            Err(e) => return Err(abandon(process, e).await),
        };
        tracing::info!("Loaded {target} as {}", document.oid);

        Ok(CalcDocument::new(session, document, url, process))
    }

    /// At most `counter_max` dials, each cut off after `attempt_timeout`,
    /// pausing between failures.
    async fn dial_with_retry(&mut self) -> Result<D::Session> {
        let host = self.config.host.clone();
        let port = self.config.port;
        let max = self.config.counter_max;
        let limit = self.config.attempt_timeout;

        for attempt in 1..=max {
            match timeout(limit, self.dialer.dial(&host, port)).await {
                Ok(Ok(session)) => {
                    tracing::info!("Connected to LibreOffice at {host}:{port} (attempt {attempt})");
                    return Ok(session);
                }
                Ok(Err(e)) => {
                    tracing::debug!("Attempt {attempt}/{max} to reach {host}:{port} failed: {e}");
                }
                Err(_) => {
                    // Something accepted the socket but never answered the handshake.
                    tracing::debug!(
                        "Attempt {attempt}/{max} to reach {host}:{port} got no answer within {limit:?}"
                    );
                }
            }
            if attempt < max {
                sleep(self.retry.delay(attempt)).await;
            }
        }

        tracing::warn!("Giving up on {host}:{port} after {max} attempts");
        Err(ConnectError::ConnectionTimeout {
            host,
            port,
            attempts: max,
        })
    }
}

/// Kills a process we spawned for a connection that went nowhere.
async fn abandon(process: Option<OfficeProcess>, error: ConnectError) -> ConnectError {
    if let Some(process) = process {
        if let Err(kill_err) = process.terminate().await {
            tracing::warn!("Could not stop LibreOffice after failed connect: {kill_err}");
        }
    }
    error
}

/// Launches `soffice` on `port` and connects with up to `counter_max`
/// attempts, using defaults for everything else.
pub async fn connect2calc(
    file: Option<&Path>,
    port: u16,
    counter_max: u32,
) -> Result<CalcDocument> {
    let config = ConnectorConfig {
        port,
        counter_max,
        ..ConnectorConfig::default()
    };
    Connector::new(config).connect(file).await
}
