//! The handle `connect` returns: one Calc document on a live bridge.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use libreoffice_urp::UnoProxy;

use crate::dialer::{Session, UrpSession};
use crate::error::{ConnectError, Result};
use crate::process::OfficeProcess;

/// URL that makes the Desktop create an empty spreadsheet.
pub const NEW_CALC_DOCUMENT_URL: &str = "private:factory/scalc";

/// Where [`CalcDocument::store_as`] writes when no path is given.
pub const DEFAULT_STORE_PATH: &str = "./untitled.xlsx";

/// Appended to store paths that have no extension.
pub const DEFAULT_EXTENSION: &str = "xlsx";

/// A document loaded in LibreOffice Calc.
///
/// Valid as long as the office process stays up. Dropping the handle neither
/// closes the document nor stops the process.
#[derive(Debug)]
pub struct CalcDocument<S = UrpSession> {
    session: S,
    document: UnoProxy,
    url: Option<String>,
    process: Option<OfficeProcess>,
}

impl<S: Session> CalcDocument<S> {
    pub(crate) fn new(
        session: S,
        document: UnoProxy,
        url: Option<String>,
        process: Option<OfficeProcess>,
    ) -> Self {
        Self {
            session,
            document,
            url,
            process,
        }
    }

    /// The remote component.
    pub fn proxy(&self) -> &UnoProxy {
        &self.document
    }

    /// URL the document was loaded from, or None for a new document.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn is_new(&self) -> bool {
        self.url.is_none()
    }

    /// The bridge, for calls this crate does not wrap.
    pub fn session(&mut self) -> &mut S {
        &mut self.session
    }

    /// The office process, if this handle's connector spawned it.
    pub fn process(&self) -> Option<&OfficeProcess> {
        self.process.as_ref()
    }

    pub fn into_process(self) -> Option<OfficeProcess> {
        self.process
    }

    /// Saves the document, overwriting any existing file. Returns the URL written.
    ///
    /// `None` saves to `./untitled.xlsx`. A path without an extension gets
    /// `.xlsx`, and the export filter follows the extension.
    pub async fn store_as(&mut self, path: Option<&Path>) -> Result<String> {
        let path = with_default_extension(path.unwrap_or(Path::new(DEFAULT_STORE_PATH)));
        let url = path_to_file_url(&path)?;
        let filter = filter_for(&path);

        self.session
            .store_as_url(&self.document, &url, filter)
            .await?;
        tracing::info!("Saved document to {url} (filter {filter:?})");
        Ok(url)
    }

    /// Closes the document in LibreOffice. The process, if any, is handed back
    /// still running.
    pub async fn close(mut self) -> Result<Option<OfficeProcess>> {
        self.session.close_document(&self.document).await?;
        tracing::debug!("Closed document {}", self.document.oid);
        Ok(self.process)
    }
}

/// Absolute, percent-encoded `file://` URL for `path`. Relative paths are
/// resolved against the current directory; strings already starting with
/// `file://` pass through.
pub fn path_to_file_url(path: &Path) -> Result<String> {
    if let Some(s) = path.to_str() {
        if s.starts_with("file://") {
            return Ok(s.to_string());
        }
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|_| ConnectError::InvalidPath(path.to_path_buf()))?
            .join(path)
    };

    url::Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| ConnectError::InvalidPath(path.to_path_buf()))
}

/// Export filter for the path's extension, or None to let LibreOffice pick.
pub fn filter_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "xlsx" => Some("Calc MS Excel 2007 XML"),
        "ods" => Some("calc8"),
        "csv" => Some("Text - txt - csv (StarCalc)"),
        "xls" => Some("MS Excel 97"),
        _ => None,
    }
}

fn with_default_extension(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(DEFAULT_EXTENSION);
    PathBuf::from(name)
}
