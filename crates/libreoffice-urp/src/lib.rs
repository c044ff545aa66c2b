//! Minimal client for the UNO Remote Protocol (URP), the binary bridge a
//! LibreOffice process speaks when started with a socket acceptor:
//!
//! ```text
//! soffice --headless --accept="socket,host=localhost,port=8100;urp;StarOffice.ComponentContext"
//! ```
//!
//! The crate covers what is needed to bootstrap a session and drive
//! document-level calls: block framing ([`transport`]), value encoding
//! ([`marshal`]), message headers with their caches ([`protocol`],
//! [`cache`]) and the call/bootstrap logic in [`connection`].
//!
//! ```rust,no_run
//! use libreoffice_urp::UrpConnection;
//!
//! # async fn example() -> libreoffice_urp::Result<()> {
//! let mut conn = UrpConnection::connect("localhost", 8100).await?;
//! let session = conn.bootstrap().await?;
//! println!("desktop is {}", session.desktop.oid);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod connection;
pub mod error;
pub mod interface;
pub mod marshal;
pub mod protocol;
pub mod proxy;
pub mod transport;
pub mod types;

pub use connection::{Bootstrap, UrpConnection};
pub use error::{Result, UrpError};
pub use proxy::UnoProxy;
pub use types::{Any, PropertyValue, Type, TypeClass, UnoValue};
