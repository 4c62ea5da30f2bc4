//! Result and Error types for the crate.
use miette::Diagnostic;
use thiserror::Error;

/// Result containing an error variant from this module.
pub type Result<T> = std::result::Result<T, Error>;

/// State estimation error variants.
///
/// These only occur while setting up or while reading and writing recordings. A running cycle
/// never fails.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] odal::Error),

    /// IO error, this wraps a [std::io::Error]
    #[error(transparent)]
    #[diagnostic(code(huginn::io))]
    Io(#[from] std::io::Error),

    /// A string in a recording is not valid utf-8
    #[error(transparent)]
    #[diagnostic(code(huginn::record::string))]
    InvalidString(#[from] std::string::FromUtf8Error),

    /// An enum in a recording has a discriminant that is not known
    #[error("invalid discriminant ({value}) for `{name}`")]
    #[diagnostic(
        code(huginn::record::discriminant),
        help("the recording was probably made with an incompatible version")
    )]
    InvalidDiscriminant { value: u8, name: &'static str },
}

impl Error {
    /// Whether this error was caused by the input ending in the middle of a record.
    #[must_use]
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, Error::Io(error) if error.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}
