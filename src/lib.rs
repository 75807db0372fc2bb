#![warn(missing_docs)]
//! Read-only decoder for the WIA compressed disc image format.
//!
//! WIA stores a GameCube or Wii disc image as a set of compressed chunks
//! ("groups"), with Wii partition data held decrypted and stripped of its
//! hash blocks. [`WiaReader`] reassembles the original disc bytes on demand:
//! raw regions are decompressed and copied out, while Wii partition regions
//! have their hash trees recomputed, patched with the stored hash
//! exceptions, and re-encrypted with the partition key. A separate
//! [`read_wii_decrypted`](WiaReader::read_wii_decrypted) path returns
//! partition payload without re-encryption, which is what most consumers
//! actually want.
//!
//! Supported compression methods: none, purge, BZIP2, LZMA, and LZMA2
//! (the latter two behind the default `compress-bzip2` / `compress-lzma`
//! features).
//!
//! # Examples
//!
//! ```no_run
//! let mut disc = wiadec::WiaReader::open("path/to/file.wia")?;
//! let mut buf = vec![0u8; 0x100];
//! disc.read(0, &mut buf)?;
//! println!("game id: {}", String::from_utf8_lossy(&buf[..6]));
//! # Ok::<(), wiadec::Error>(())
//! ```

pub mod common;
pub(crate) mod decompress;
pub mod format;
pub(crate) mod reader;
pub(crate) mod sector;
pub(crate) mod util;

pub use reader::{WiaReader, WiaStream};

/// Error type for all decoder operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Not a WIA file, or one using a disc type, compression method, or
    /// version this decoder does not support.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    /// Hash mismatch, malformed table, or compressed data the decompressor
    /// rejected.
    #[error("corrupt image: {0}")]
    Corrupt(String),
    /// The requested byte range does not map to a covered region.
    #[error("read out of range: {0}")]
    OutOfRange(String),
    /// The underlying stream failed.
    #[error("{0}")]
    Io(String, #[source] std::io::Error),
    /// The operation is not applicable to this image, e.g. a Wii decrypted
    /// read on a GameCube disc.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

/// Discriminant of [`Error`], used for classification and poisoning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`Error::UnsupportedFormat`].
    UnsupportedFormat,
    /// See [`Error::Corrupt`].
    Corrupt,
    /// See [`Error::OutOfRange`].
    OutOfRange,
    /// See [`Error::Io`].
    Io,
    /// See [`Error::Unsupported`].
    Unsupported,
}

impl Error {
    /// Returns the error's kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::Corrupt(_) => ErrorKind::Corrupt,
            Error::OutOfRange(_) => ErrorKind::OutOfRange,
            Error::Io(_, _) => ErrorKind::Io,
            Error::Unsupported(_) => ErrorKind::Unsupported,
        }
    }

    pub(crate) fn from_kind(kind: ErrorKind, message: String) -> Error {
        match kind {
            ErrorKind::UnsupportedFormat => Error::UnsupportedFormat(message),
            ErrorKind::Corrupt => Error::Corrupt(message),
            ErrorKind::OutOfRange => Error::OutOfRange(message),
            ErrorKind::Io => Error::Io(message, std::io::Error::other("poisoned reader")),
            ErrorKind::Unsupported => Error::Unsupported(message),
        }
    }

    pub(crate) fn render(&self) -> String {
        match self {
            Error::Io(message, source) => format!("{message}: {source}"),
            e => e.to_string(),
        }
    }
}

/// Helper result type for [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Helper trait for adding context to errors.
pub trait ErrorContext {
    /// Adds context to an error.
    fn context(self, context: impl Into<String>) -> Error;
}

impl ErrorContext for std::io::Error {
    #[inline]
    fn context(self, context: impl Into<String>) -> Error { Error::Io(context.into(), self) }
}

/// Helper trait for adding context to result errors.
pub trait ResultContext<T> {
    /// Adds context to a result error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Adds context to a result error using a closure.
    fn with_context<F>(self, f: F) -> Result<T>
    where F: FnOnce() -> String;
}

impl<T, E> ResultContext<T> for Result<T, E>
where E: ErrorContext
{
    #[inline]
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    #[inline]
    fn with_context<F>(self, f: F) -> Result<T>
    where F: FnOnce() -> String {
        self.map_err(|e| e.context(f()))
    }
}
