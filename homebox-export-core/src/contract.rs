//! # contract: data model and capability traits for the export pipeline
//!
//! This module defines the plain data types fetched from a Homebox server and
//! the two seams the [`crate::export::Exporter`] is written against:
//!
//! - [`HomeboxApi`]: the narrow read-only slice of the Homebox REST API the
//!   export needs (login, list, detail, attachment download). Implemented by the
//!   live reqwest client in the `homebox-export` crate and by [`MockHomeboxApi`].
//! - [`ExportReporter`]: receives per-item progress and failures, so reporting
//!   can be inspected in tests without capturing process output.
//!
//! ## Mocking & Testing
//! Both traits are annotated for `mockall`; the generated mocks are exported when
//! the `test-export-mocks` feature is enabled (on by default).

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use futures::stream::BoxStream;
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Response to a successful login.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    #[serde(default)]
    pub attachment_token: String,
    #[serde(default)]
    pub expires_at: String,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResult<T> {
    #[serde(default)]
    pub items: Vec<T>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total: u64,
}

/// An inventory item. Listing endpoints return a summary; attachments are only
/// guaranteed on the record returned by [`HomeboxApi::get_item`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub asset_id: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub insured: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A file attached to an item (photo, receipt, manual, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub document: Document,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub title: String,
}

/// Raw attachment bytes, delivered in chunks as they arrive from the transport.
pub type AttachmentStream = BoxStream<'static, Result<Vec<u8>, ApiError>>;

/// The read-only Homebox operations the export pipeline depends on.
///
/// Implementors own session state: after a successful [`HomeboxApi::login`],
/// every later call must carry the returned token.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait HomeboxApi: Send + Sync {
    /// Authenticate and keep the session token for subsequent calls.
    async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError>;

    /// Fetch one page (1-based) of item summaries.
    async fn list_items(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<PaginationResult<Item>, ApiError>;

    /// Fetch the full item record, including its attachments.
    async fn get_item(&self, id: &str) -> Result<Item, ApiError>;

    /// Open the raw byte stream of one attachment.
    async fn download_attachment(
        &self,
        item_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentStream, ApiError>;
}

/// Which step of per-item processing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureStage {
    DetailFetch,
    CreateDirectory,
    Download,
    Write,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureStage::DetailFetch => "detail fetch",
            FailureStage::CreateDirectory => "create directory",
            FailureStage::Download => "download",
            FailureStage::Write => "write",
        };
        f.write_str(s)
    }
}

/// A non-fatal failure recorded during an export run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportFailure {
    pub stage: FailureStage,
    pub item_id: String,
    pub item_name: String,
    pub attachment_id: Option<String>,
    pub message: String,
}

impl fmt::Display for ExportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed for item {} ({})",
            self.stage, self.item_name, self.item_id
        )?;
        if let Some(attachment_id) = &self.attachment_id {
            write!(f, " attachment {}", attachment_id)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Receives progress and failures from the exporter.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait ExportReporter: Send + Sync {
    /// The item's directory exists and all of its attachments were attempted.
    fn item_exported(&self, item: &Item, directory: &Path);

    /// One attachment was written in full.
    fn attachment_saved(&self, item: &Item, attachment: &Attachment, path: &Path, bytes: u64);

    /// A per-item or per-attachment step failed; the run continues.
    fn failure(&self, failure: &ExportFailure);
}
