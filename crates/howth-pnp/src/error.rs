use std::path::PathBuf;
use thiserror::Error;

/// Core error type for howth-pnp operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read PnP manifest at {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse PnP manifest at {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid PnP manifest at {path}: {message}")]
    ManifestInvalid { path: PathBuf, message: String },

    #[error("No PnP manifest found from {start}")]
    ManifestNotFound { start: PathBuf },

    /// The provider could not report its own manifest location, so no
    /// watch files can be computed for any resolution.
    #[error("Failed to resolve the PnP manifest path: {message}")]
    ManifestUnresolvable { message: String },

    #[error("Invalid filter pattern `{pattern}`: {message}")]
    InvalidFilter { pattern: String, message: String },

    #[error("Failed to read build options at {path}: {source}")]
    OptionsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse build options at {path}: {source}")]
    OptionsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
