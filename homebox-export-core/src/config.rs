use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::ConfigError;

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_OUTPUT_DIR: &str = "downloads";

/// Everything an export run needs: where to connect, who to log in as, and
/// where to write.
#[derive(Clone)]
pub struct ExportConfig {
    pub server_url: String,
    pub username: String,
    pub password: String,
    pub output_dir: PathBuf,
    /// Items per listing request. Zero selects [`DEFAULT_PAGE_SIZE`].
    pub page_size: u32,
}

impl ExportConfig {
    /// Checks required fields in the order a user would fill them in and
    /// normalises the page size.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::MissingServerUrl);
        }
        if self.username.is_empty() {
            return Err(ConfigError::MissingUsername);
        }
        if self.password.is_empty() {
            return Err(ConfigError::MissingPassword);
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingOutputDir);
        }
        if self.page_size == 0 {
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        Ok(())
    }

    pub fn trace_loaded(&self) {
        info!(
            server_url = %self.server_url,
            username = %self.username,
            output_dir = %self.output_dir.display(),
            page_size = self.page_size,
            "Loaded ExportConfig"
        );
        debug!(config = ?self, "ExportConfig loaded (full debug)");
    }
}

// Hand-written so the password never reaches a log line.
impl std::fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportConfig")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("output_dir", &self.output_dir)
            .field("page_size", &self.page_size)
            .finish()
    }
}
