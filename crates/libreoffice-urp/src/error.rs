//! Error type of the bridge client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UrpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Malformed message: {0}")]
    Protocol(String),

    #[error("Malformed value: {0}")]
    Marshal(String),

    #[error("Unknown type class: {0}")]
    UnknownTypeClass(u8),

    #[error("Cache miss: no {kind} at index {index}")]
    CacheMiss { kind: &'static str, index: u16 },

    #[error("Remote {type_name}: {message}")]
    RemoteException { type_name: String, message: String },

    #[error("{method} expects {expected} arguments, got {actual}")]
    Arity {
        method: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),
}

pub type Result<T> = std::result::Result<T, UrpError>;
