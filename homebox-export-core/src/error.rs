use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single call against the Homebox API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response, or the body could not be read.
    #[error("failed to send request: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// A required export option is missing or unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("server URL is required")]
    MissingServerUrl,
    #[error("username is required")]
    MissingUsername,
    #[error("password is required")]
    MissingPassword,
    #[error("download path is required")]
    MissingOutputDir,
}

/// Errors that abort an export run.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to login: {0}")]
    Login(#[source] ApiError),

    #[error("failed to create download directory {}: {source}", .path.display())]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list items (page {page}): {source}")]
    ListItems {
        page: u32,
        #[source]
        source: ApiError,
    },
}
