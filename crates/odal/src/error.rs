//! Result and Error types for the crate.
use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// Result containing an error variant from this module.
pub type Result<T> = std::result::Result<T, Error>;

/// Which of the two config layers an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    Main,
    Overlay,
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigKind::Main => write!(f, "main"),
            ConfigKind::Overlay => write!(f, "overlay"),
        }
    }
}

/// Error raised while loading the config named `name`.
#[derive(Debug, Error, Diagnostic)]
#[error("failed to load config `{name}`")]
pub struct Error {
    /// Type name of the config that failed to load
    pub name: &'static str,
    #[source]
    #[diagnostic_source]
    pub kind: ErrorKind,
}

/// Configuration error variants
#[derive(Debug, Error, Diagnostic)]
pub enum ErrorKind {
    /// The file could not be read, this wraps a [std::io::Error]
    #[error("could not read {config_kind} config at `{path}`")]
    #[diagnostic(help("configs are looked up relative to the config directory"))]
    Load {
        path: String,
        config_kind: ConfigKind,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid toml, this wraps a [toml::de::Error]
    #[error("`{path}` is not valid toml")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// The merged table does not match the config type
    #[error("config does not match the expected layout")]
    Deserialize(#[source] toml::de::Error),
}
