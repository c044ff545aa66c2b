//! End-to-end tests against a real LibreOffice.
//!
//! They attach to an instance already listening on localhost:8100:
//!
//!    soffice --headless --accept="socket,host=localhost,port=8100;urp;StarOffice.ComponentContext"
//!
//! If nothing is listening there, every test is skipped.

use std::time::Duration;

use calc_connect::{Connector, ConnectorConfig};

const PORT: u16 = 8100;

fn office_available() -> bool {
    std::net::TcpStream::connect_timeout(
        &std::net::SocketAddr::from(([127, 0, 0, 1], PORT)),
        Duration::from_secs(2),
    )
    .is_ok()
}

macro_rules! skip_if_no_office {
    () => {
        if !office_available() {
            eprintln!(
                "SKIP: LibreOffice not listening on localhost:{PORT}.\n\
                 Start it with:\n  \
                 soffice --headless --accept=\"socket,host=localhost,port={PORT};urp;StarOffice.ComponentContext\""
            );
            return;
        }
    };
}

fn attach_config() -> ConnectorConfig {
    ConnectorConfig {
        launch: false,
        hidden: true,
        counter_max: 10,
        retry_delay: Duration::from_millis(200),
        ..ConnectorConfig::with_port(PORT)
    }
}

#[tokio::test]
async fn test_attach_new_document_store_and_reopen() {
    skip_if_no_office!();

    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("roundtrip");

    let mut connector = Connector::new(attach_config());
    let mut doc = connector.connect(None).await.expect("connect");
    assert!(doc.is_new());

    let url = doc.store_as(Some(&target)).await.expect("store_as");
    assert!(url.ends_with("/roundtrip.xlsx"), "{url}");
    assert!(dir.path().join("roundtrip.xlsx").exists());
    assert!(doc.close().await.expect("close").is_none());

    let reopened = connector
        .connect(Some(&dir.path().join("roundtrip.xlsx")))
        .await
        .expect("reopen");
    assert_eq!(reopened.url(), Some(url.as_str()));
    reopened.close().await.expect("close reopened");
}

#[test]
fn test_attach_blocking() {
    skip_if_no_office!();

    let mut connector = Connector::new(attach_config());
    let doc = connector.connect_blocking(None).expect("connect_blocking");
    assert_eq!(doc.url(), None);
    doc.close().expect("close");
}
