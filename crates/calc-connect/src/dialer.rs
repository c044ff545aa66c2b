//! The seam between the retry loop and the bridge.
//!
//! The [`Connector`](crate::Connector) only knows how to dial and what a live
//! session can do with a document. [`UrpDialer`] is the real implementation;
//! tests substitute scripted ones.

use std::future::Future;

use libreoffice_urp::interface;
use libreoffice_urp::types::names;
use libreoffice_urp::{Any, Bootstrap, PropertyValue, Type, UnoProxy, UnoValue, UrpConnection};

use crate::error::{ConnectError, Result};

/// One bridge attempt.
pub trait Dialer: Send + Sync {
    type Session: Session;

    /// Connects and bootstraps. Any error counts as a failed attempt.
    fn dial(&self, host: &str, port: u16) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// What a connected bridge can do with documents.
pub trait Session: Send {
    /// `loadComponentFromURL(url, "_blank", 0, args)`; returns the component.
    fn load_component(
        &mut self,
        url: &str,
        hidden: bool,
    ) -> impl Future<Output = Result<UnoProxy>> + Send;

    /// `XStorable::storeAsURL`, overwriting any existing file.
    fn store_as_url(
        &mut self,
        document: &UnoProxy,
        url: &str,
        filter: Option<&str>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// `XCloseable::close(true)`.
    fn close_document(&mut self, document: &UnoProxy) -> impl Future<Output = Result<()>> + Send;
}

/// Dials LibreOffice over TCP with the URP client.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrpDialer;

impl Dialer for UrpDialer {
    type Session = UrpSession;

    async fn dial(&self, host: &str, port: u16) -> Result<UrpSession> {
        let mut conn = UrpConnection::connect(host, port).await?;
        let bootstrap = conn.bootstrap().await?;
        Ok(UrpSession { conn, bootstrap })
    }
}

/// A bootstrapped bridge: the connection plus the Desktop it resolved.
pub struct UrpSession {
    conn: UrpConnection,
    bootstrap: Bootstrap,
}

impl UrpSession {
    pub fn connection(&mut self) -> &mut UrpConnection {
        &mut self.conn
    }

    pub fn desktop(&self) -> &UnoProxy {
        &self.bootstrap.desktop
    }

    /// `document` seen through `interface`, asking the bridge first.
    async fn view(&mut self, document: &UnoProxy, interface: &str) -> Result<UnoProxy> {
        let view = self
            .conn
            .query_interface(document, Type::interface(interface))
            .await?
            .unwrap_or_else(|| document.as_interface(interface));
        Ok(view)
    }
}

impl std::fmt::Debug for UrpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrpSession")
            .field("desktop", &self.bootstrap.desktop.oid)
            .finish_non_exhaustive()
    }
}

impl Session for UrpSession {
    async fn load_component(&mut self, url: &str, hidden: bool) -> Result<UnoProxy> {
        let args = load_arguments(hidden);
        let result = self
            .conn
            .call(
                &self.bootstrap.desktop,
                &interface::load_component_from_url(),
                &[
                    UnoValue::String(url.to_string()),
                    UnoValue::String("_blank".into()),
                    UnoValue::Long(0),
                    UnoValue::Sequence(args),
                ],
            )
            .await?;

        UnoProxy::from_return(&result, names::X_COMPONENT)
            .ok_or_else(|| ConnectError::OperationFailed(format!("LibreOffice could not load {url}")))
    }

    async fn store_as_url(&mut self, document: &UnoProxy, url: &str, filter: Option<&str>) -> Result<()> {
        let storable = self.view(document, names::X_STORABLE).await?;
        self.conn
            .call(
                &storable,
                &interface::store_as_url(),
                &[
                    UnoValue::String(url.to_string()),
                    UnoValue::Sequence(store_arguments(filter)),
                ],
            )
            .await?;
        Ok(())
    }

    async fn close_document(&mut self, document: &UnoProxy) -> Result<()> {
        let closeable = self.view(document, names::X_CLOSEABLE).await?;
        self.conn
            .call(&closeable, &interface::close(), &[UnoValue::Bool(true)])
            .await?;
        self.conn.release(document).await?;
        Ok(())
    }
}

fn load_arguments(hidden: bool) -> Vec<UnoValue> {
    if hidden {
        vec![PropertyValue::new("Hidden", Any::boolean(true)).into()]
    } else {
        Vec::new()
    }
}

fn store_arguments(filter: Option<&str>) -> Vec<UnoValue> {
    let mut args = vec![PropertyValue::new("Overwrite", Any::boolean(true)).into()];
    if let Some(filter) = filter {
        args.push(PropertyValue::new("FilterName", Any::string(filter)).into());
    }
    args
}
