//! Error types for the plugin layer.

use std::path::PathBuf;

use runninghub_api::ApiError;

/// Plugin-level errors.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// A remote call failed; the client error is passed through unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The plugin configuration is unusable or the plugin is not set up.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to parse config file `{path}`: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PluginError {
    pub(crate) fn not_initialized() -> Self {
        Self::Config("RunningHub plugin not initialized; call initialize() first".into())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, PluginError>;
