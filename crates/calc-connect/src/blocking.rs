//! Synchronous entry points for callers without an async runtime.

use std::path::Path;

use tokio::runtime::{Builder, Runtime};

use crate::connector::Connector;
use crate::dialer::{Dialer, Session, UrpSession};
use crate::document::CalcDocument;
use crate::error::{ConnectError, Result};
use crate::launcher::Launcher;
use crate::process::OfficeProcess;
use crate::retry::RetryStrategy;

/// A [`CalcDocument`] bundled with the runtime its socket and child process
/// are registered with.
#[derive(Debug)]
pub struct BlockingDocument<S = UrpSession> {
    runtime: Runtime,
    document: CalcDocument<S>,
}

impl<L: Launcher, D: Dialer, R: RetryStrategy> Connector<L, D, R> {
    /// [`connect`](Connector::connect) on a private current-thread runtime.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a tokio runtime; use `connect` there.
    pub fn connect_blocking(&mut self, file: Option<&Path>) -> Result<BlockingDocument<D::Session>> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ConnectError::Runtime)?;
        let document = runtime.block_on(self.connect(file))?;
        Ok(BlockingDocument { runtime, document })
    }
}

impl<S: Session> BlockingDocument<S> {
    pub fn document(&self) -> &CalcDocument<S> {
        &self.document
    }

    pub fn url(&self) -> Option<&str> {
        self.document.url()
    }

    pub fn store_as(&mut self, path: Option<&Path>) -> Result<String> {
        self.runtime.block_on(self.document.store_as(path))
    }

    /// Closes the document, then stops the process if this connector spawned it.
    pub fn close_and_terminate(self) -> Result<()> {
        let Self { runtime, document } = self;
        runtime.block_on(async {
            if let Some(process) = document.close().await? {
                process.terminate().await.map_err(|e| {
                    ConnectError::OperationFailed(format!("could not stop LibreOffice: {e}"))
                })?;
            }
            Ok::<_, ConnectError>(())
        })
    }

    /// Closes the document, leaving any process running.
    pub fn close(self) -> Result<Option<OfficeProcess>> {
        let Self { runtime, document } = self;
        runtime.block_on(document.close())
    }

    /// The runtime and async handle, for callers that outgrow the blocking API.
    pub fn into_parts(self) -> (Runtime, CalcDocument<S>) {
        (self.runtime, self.document)
    }
}
