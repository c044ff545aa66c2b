//! The `soffice` processes we spawn, and the ones we find lying around.

use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::process::Child;

/// A LibreOffice process this crate started.
///
/// Dropping it leaves LibreOffice running; other clients may be sharing the
/// instance. Call [`terminate`](Self::terminate) to stop it.
#[derive(Debug)]
pub struct OfficeProcess {
    child: Child,
}

impl OfficeProcess {
    pub(crate) fn new(child: Child) -> Self {
        Self { child }
    }

    /// OS process id, or None once the process has been reaped.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Kills the process together with everything it started, and waits for
    /// the direct child to exit.
    ///
    /// On Linux `soffice` is a wrapper around `oosplash`, which forks
    /// `soffice.bin`; that grandchild holds the socket. Descendants are
    /// collected before the wrapper dies, while they are still parented to it.
    pub async fn terminate(mut self) -> std::io::Result<()> {
        tracing::info!("Terminating LibreOffice (pid {:?})", self.child.id());
        if let Some(pid) = self.child.id() {
            kill_descendants(pid);
        }
        self.child.kill().await
    }
}

/// Every process below `root` in the parent tree, children before grandchildren.
fn descendants_of(sys: &System, root: Pid) -> Vec<Pid> {
    let mut found = Vec::new();
    let mut frontier = vec![root];
    while let Some(parent) = frontier.pop() {
        for (pid, p) in sys.processes() {
            if p.parent() == Some(parent) && !found.contains(pid) {
                found.push(*pid);
                frontier.push(*pid);
            }
        }
    }
    found
}

fn kill_descendants(root: u32) -> Vec<u32> {
    let mut sys = System::new_all();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    let mut killed = Vec::new();
    for pid in descendants_of(&sys, Pid::from_u32(root)) {
        let Some(p) = sys.process(pid) else { continue };
        if p.kill() {
            tracing::debug!("Killed {} (pid {pid}), started by {root}", p.name().to_string_lossy());
            killed.push(pid.as_u32());
        }
    }
    killed
}

/// Executable names that make up a running office instance.
const OFFICE_PROCESS_NAMES: &[&str] = &["soffice", "oosplash"];

fn is_office_process(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    OFFICE_PROCESS_NAMES.iter().any(|n| name.contains(n))
}

/// PIDs of every running `soffice`/`oosplash` process.
pub fn find_office_processes() -> Vec<u32> {
    let mut sys = System::new_all();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    let mut pids: Vec<u32> = sys
        .processes()
        .iter()
        .filter(|(_, p)| is_office_process(&p.name().to_string_lossy()))
        .map(|(pid, _)| pid.as_u32())
        .collect();
    pids.sort_unstable();
    tracing::trace!("Found {} office processes", pids.len());
    pids
}

/// Kills every running office process, ours or not. Returns the PIDs that
/// were signalled.
///
/// Useful before launching when a previous headless instance still holds the
/// port or the user profile lock.
pub fn kill_office_processes() -> Vec<u32> {
    let mut sys = System::new_all();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    let mut killed = Vec::new();
    for (pid, p) in sys.processes() {
        let name = p.name().to_string_lossy();
        if !is_office_process(&name) {
            continue;
        }
        if p.kill() {
            tracing::debug!("Killed {name} (pid {pid})");
            killed.push(pid.as_u32());
        } else {
            tracing::warn!("Could not kill {name} (pid {pid})");
        }
    }
    killed
}
