//! File Proxy
//!
//! File access does not need the whole session, so this proxy talks to a
//! narrowed [`FileView`] built by [`Sender::make_temporary`]. Every request
//! gets a fresh view of the session's directory, translator and charset,
//! and the view is dropped as soon as the request returns.

use tandem_core::{Sender, WaitIndicator};
use thiserror::Error;

use crate::session::{Charset, Directory, Session, Translator};

/// Why a file could not be read
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FileError {
    /// No file with this name
    #[error("No such file: {0}")]
    NotFound(String),

    /// The bytes are not valid in the session's charset
    #[error("{name} is not valid {charset}")]
    Undecodable {
        /// File name
        name: String,
        /// Charset the decode was attempted with
        charset: &'static str,
    },
}

/// The slice of session state file requests may see
#[derive(Clone, Debug)]
pub struct FileView {
    directory: Directory,
    translator: Translator,
    charset: Charset,
}

impl FileView {
    /// Capture the file-related parts of the session
    pub fn from_session(session: &mut Session) -> Self {
        Self {
            directory: session.directory().clone(),
            translator: session.translator().clone(),
            charset: session.charset(),
        }
    }

    /// File names in sorted order
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.directory.names()
    }

    /// Decode and translate a file
    ///
    /// # Errors
    ///
    /// [`FileError::NotFound`] for unknown names, [`FileError::Undecodable`]
    /// when the contents are not valid in the session charset.
    pub fn read(&self, name: &str) -> Result<String, FileError> {
        let bytes = self
            .directory
            .get(name)
            .ok_or_else(|| FileError::NotFound(name.to_string()))?;
        let text = self
            .charset
            .decode(bytes)
            .ok_or_else(|| FileError::Undecodable {
                name: name.to_string(),
                charset: self.charset.name(),
            })?;
        Ok(self.translator.translate(&text))
    }
}

/// Synchronous file listing and reading
#[derive(Clone, Debug)]
pub struct FileProxy {
    view: Sender<FileView>,
}

impl FileProxy {
    /// Create the proxy from a session sender
    #[must_use]
    pub fn new(session: &Sender<Session>) -> Self {
        Self {
            view: session.make_temporary(FileView::from_session),
        }
    }

    /// The narrowed sender all file requests go through
    #[must_use]
    pub fn view_sender(&self) -> &Sender<FileView> {
        &self.view
    }

    /// File names, `None` if the session is gone
    pub fn list(&self, ind: &mut WaitIndicator) -> Option<Vec<String>> {
        ind.call(&self.view, |view: &mut FileView| view.list())
    }

    /// Read one file, `None` if the session is gone
    pub fn read(
        &self,
        ind: &mut WaitIndicator,
        name: impl Into<String>,
    ) -> Option<Result<String, FileError>> {
        let name = name.into();
        ind.call(&self.view, move |view: &mut FileView| view.read(&name))
    }
}
