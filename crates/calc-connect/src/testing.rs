//! Scripted stand-ins for the bridge.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use libreoffice_urp::types::names;
use libreoffice_urp::{Type, UnoProxy, UrpError};
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tokio::time::Instant;

use crate::config::ConnectorConfig;
use crate::dialer::{Dialer, Session};
use crate::error::{ConnectError, Result};
use crate::launcher::Launcher;
use crate::process::OfficeProcess;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Load { url: String, hidden: bool },
    Store { url: String, filter: Option<String> },
    Close,
}

/// Records every document call; shares the log between clones.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingSession {
    calls: Arc<Mutex<Vec<Call>>>,
    pub fail_load: bool,
}

impl RecordingSession {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn document_proxy(&self) -> UnoProxy {
        UnoProxy::new("doc-1", Type::interface(names::X_COMPONENT))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Session for RecordingSession {
    async fn load_component(&mut self, url: &str, hidden: bool) -> Result<UnoProxy> {
        self.record(Call::Load {
            url: url.to_string(),
            hidden,
        });
        if self.fail_load {
            return Err(ConnectError::OperationFailed(format!("cannot load {url}")));
        }
        Ok(self.document_proxy())
    }

    async fn store_as_url(&mut self, _document: &UnoProxy, url: &str, filter: Option<&str>) -> Result<()> {
        self.record(Call::Store {
            url: url.to_string(),
            filter: filter.map(str::to_string),
        });
        Ok(())
    }

    async fn close_document(&mut self, _document: &UnoProxy) -> Result<()> {
        self.record(Call::Close);
        Ok(())
    }
}

/// Fails every dial until `succeed_on`, then hands out `session`.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedDialer {
    pub succeed_on: Option<u32>,
    hang: bool,
    pub session: RecordingSession,
    dialed_at: Arc<Mutex<Vec<Instant>>>,
    attempts: Arc<AtomicU32>,
}

impl ScriptedDialer {
    pub fn never() -> Self {
        Self::default()
    }

    /// Every attempt stalls forever, like a listener that never answers.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn succeeding_on(attempt: u32) -> Self {
        Self {
            succeed_on: Some(attempt),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn dialed_at(&self) -> Vec<Instant> {
        self.dialed_at.lock().unwrap().clone()
    }
}

impl Dialer for ScriptedDialer {
    type Session = RecordingSession;

    async fn dial(&self, _host: &str, _port: u16) -> Result<RecordingSession> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.dialed_at.lock().unwrap().push(Instant::now());
        if self.succeed_on == Some(attempt) {
            Ok(self.session.clone())
        } else if self.hang {
            std::future::pending().await
        } else {
            Err(UrpError::ConnectionClosed.into())
        }
    }
}

/// Counts launches; spawns `sleep` when asked to so cleanup has a real child.
#[derive(Debug, Clone, Default)]
pub(crate) struct CountingLauncher {
    spawn_sleeper: bool,
    launches: Arc<AtomicU32>,
    spawned: Arc<Mutex<Vec<u32>>>,
}

impl CountingLauncher {
    pub fn spawning() -> Self {
        Self {
            spawn_sleeper: true,
            ..Self::default()
        }
    }

    pub fn launches(&self) -> u32 {
        self.launches.load(Ordering::SeqCst)
    }

    /// PIDs of the children this launcher started.
    pub fn spawned(&self) -> Vec<u32> {
        self.spawned.lock().unwrap().clone()
    }
}

impl Launcher for CountingLauncher {
    fn launch(&self, _config: &ConnectorConfig) -> Result<Option<OfficeProcess>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if !self.spawn_sleeper {
            return Ok(None);
        }
        let child = tokio::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .map_err(|source| ConnectError::ProcessLaunch {
                program: "sleep".into(),
                source,
            })?;
        if let Some(pid) = child.id() {
            self.spawned.lock().unwrap().push(pid);
        }
        Ok(Some(OfficeProcess::new(child)))
    }
}

/// Whether `pid` is still a live (non-zombie) process.
pub(crate) fn is_running(pid: u32) -> bool {
    let mut sys = System::new_all();
    sys.refresh_processes(ProcessesToUpdate::All, true);
    sys.process(Pid::from_u32(pid))
        .is_some_and(|p| !matches!(p.status(), ProcessStatus::Zombie | ProcessStatus::Dead))
}

/// Polls until `pid` is gone; killed grandchildren may take a moment to be reaped.
pub(crate) async fn wait_until_gone(pid: u32) -> bool {
    for _ in 0..50 {
        if !is_running(pid) {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    false
}
