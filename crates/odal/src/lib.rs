//! Configuration loading.
//!
//! A config is a serde type stored as a single toml file. Every config lives in a main
//! directory, and may be partially overridden by a file with the same name in an overlay
//! directory (usually one per robot).
mod error;

#[cfg(test)]
mod tests;

use std::{any::type_name, fs, path::Path};

use serde::de::DeserializeOwned;
use toml::{Table, Value};

pub use error::{ConfigKind, Error, ErrorKind, Result};

pub trait Config: DeserializeOwned {
    /// Path of the config file, relative to the config directory.
    const PATH: &'static str;

    /// Loads the config from `dir`.
    fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let table = read_table::<Self>(dir.as_ref(), ConfigKind::Main)?;
        into_config(table)
    }

    /// Loads the config from `main_dir`, with the values from `overlay_dir` applied on top.
    ///
    /// Fails with [`ConfigKind::Overlay`] if the overlay file cannot be read, so callers can
    /// decide to fall back to [`Config::load`].
    fn load_with_overlay(
        main_dir: impl AsRef<Path>,
        overlay_dir: impl AsRef<Path>,
    ) -> Result<Self> {
        let mut table = read_table::<Self>(main_dir.as_ref(), ConfigKind::Main)?;
        let overlay = read_table::<Self>(overlay_dir.as_ref(), ConfigKind::Overlay)?;
        merge_overlay(&mut table, overlay);
        into_config(table)
    }

    /// Like [`Config::load_with_overlay`], but a missing overlay is not an error.
    fn load_with_optional_overlay(
        main_dir: impl AsRef<Path>,
        overlay_dir: impl AsRef<Path>,
    ) -> Result<Self> {
        match Self::load_with_overlay(main_dir.as_ref(), overlay_dir) {
            Err(Error {
                kind:
                    ErrorKind::Load {
                        path,
                        config_kind: ConfigKind::Overlay,
                        ..
                    },
                name,
            }) => {
                tracing::debug!("`{name}`: no overlay at `{path}`, using main config only");
                Self::load(main_dir)
            }
            result => result,
        }
    }
}

/// Recursively merges `overlay` into `main`.
///
/// Tables are merged key by key; any other value in the overlay replaces the one in `main`.
pub fn merge_overlay(main: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (main.get_mut(&key), value) {
            (Some(Value::Table(main_table)), Value::Table(overlay_table)) => {
                merge_overlay(main_table, overlay_table);
            }
            (_, value) => {
                main.insert(key, value);
            }
        }
    }
}

fn read_table<T: Config>(dir: &Path, config_kind: ConfigKind) -> Result<Table> {
    let path = dir.join(T::PATH);
    let display = path.display().to_string();

    let contents = fs::read_to_string(&path).map_err(|source| Error {
        name: type_name::<T>(),
        kind: ErrorKind::Load {
            path: display.clone(),
            config_kind,
            source,
        },
    })?;

    contents.parse::<Table>().map_err(|source| Error {
        name: type_name::<T>(),
        kind: ErrorKind::Parse {
            path: display,
            source,
        },
    })
}

fn into_config<T: Config>(table: Table) -> Result<T> {
    Value::Table(table).try_into().map_err(|source| Error {
        name: type_name::<T>(),
        kind: ErrorKind::Deserialize(source),
    })
}
