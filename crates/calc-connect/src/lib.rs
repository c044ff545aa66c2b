//! Launch LibreOffice Calc headless and get a document handle over URP.
//!
//! [`Connector`] spawns `soffice` with a socket acceptor, then dials the bridge
//! up to `counter_max` times, pausing between attempts as its
//! [`RetryStrategy`] dictates. On success it loads the requested file (or
//! creates a blank spreadsheet) and returns a [`CalcDocument`].
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! // Same shape as the classic helper: file, port, attempt budget.
//! let mut doc = calc_connect::connect2calc(None, 8100, 5000).await?;
//! let url = doc.store_as(Some(std::path::Path::new("fit.xlsx"))).await?;
//! println!("saved {url}");
//! if let Some(process) = doc.close().await? {
//!     process.terminate().await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Without an async runtime, use [`Connector::connect_blocking`].

pub mod blocking;
pub mod config;
pub mod connector;
pub mod dialer;
pub mod document;
pub mod error;
pub mod launcher;
pub mod process;
pub mod retry;

#[cfg(test)]
mod testing;

pub use blocking::BlockingDocument;
pub use config::ConnectorConfig;
pub use connector::{connect2calc, Connector};
pub use dialer::{Dialer, Session, UrpDialer, UrpSession};
pub use document::{path_to_file_url, CalcDocument};
pub use error::{ConnectError, Result};
pub use launcher::{Launcher, SofficeLauncher};
pub use process::{find_office_processes, kill_office_processes, OfficeProcess};
pub use retry::{ExponentialBackoff, FixedDelay, RetryStrategy};
