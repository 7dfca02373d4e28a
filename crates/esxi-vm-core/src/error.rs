//! Error types for the esxi-vm core library.
//!
//! Everything in here is fatal: the run stops and the process exits non-zero.
//! Problems with the requested VM itself are not errors; they are collected as
//! [`Issue`](crate::validate::Issue)s so a dry run can report all of them.

use std::path::PathBuf;

/// The main error type for esxi-vm operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error with optional path context.
    #[error("I/O error{}: {source}", path.as_ref().map(|p| format!(" at '{}'", p.display())).unwrap_or_default())]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    /// SSH transport, authentication or channel failure.
    #[error("SSH error: {message}")]
    Ssh { message: String },

    /// The host answered, but not like an ESXi host.
    #[error("Unable to determine if this is a ESXi Host: {host}, username: {user}")]
    NotEsxiHost { host: String, user: String },

    /// A read-only host query returned nothing usable.
    #[error("Inventory error: {message}")]
    Inventory { message: String },

    /// A command ran but printed something other than what was expected.
    #[error("Remote command error: {message}")]
    Remote { message: String },

    /// Error reading, parsing or writing the defaults file.
    #[error("Config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for esxi-vm operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an I/O error with path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
        }
    }

    /// Create an I/O error without path context.
    pub fn io_simple(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }

    /// Create an SSH error.
    pub fn ssh(message: impl Into<String>) -> Self {
        Self::Ssh {
            message: message.into(),
        }
    }

    /// Create a not-an-ESXi-host error.
    pub fn not_esxi_host(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self::NotEsxiHost {
            host: host.into(),
            user: user.into(),
        }
    }

    /// Create an inventory error.
    pub fn inventory(message: impl Into<String>) -> Self {
        Self::Inventory {
            message: message.into(),
        }
    }

    /// Create a remote command error.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::io_simple(source)
    }
}

impl From<ssh2::Error> for Error {
    fn from(source: ssh2::Error) -> Self {
        Self::ssh(source.to_string())
    }
}
