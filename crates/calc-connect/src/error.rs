//! Error types for connecting to Calc.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectError {
    /// The office executable could not be started at all.
    #[error("Failed to launch {}: {source}", program.display())]
    ProcessLaunch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The retry budget ran out before a bridge handshake succeeded.
    #[error(
        "No bridge to {host}:{port} after {attempts} attempts; \
         LibreOffice may still be starting, try a larger counter_max"
    )]
    ConnectionTimeout {
        host: String,
        port: u16,
        attempts: u32,
    },

    #[error("Bridge error: {0}")]
    Urp(#[from] libreoffice_urp::UrpError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot express {} as a file URL", .0.display())]
    InvalidPath(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Could not start the blocking runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConnectError>;
