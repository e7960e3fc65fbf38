use std::path::Path;

use serde::Serialize;
use tracing::{error, info};

use crate::contract::{Attachment, ExportFailure, ExportReporter, Item};

/// Outcome of a completed export run.
///
/// A run that returns a report finished every page; `failures` lists the items
/// and attachments that were skipped along the way.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ExportReport {
    /// Non-empty pages processed. The empty page that ends the listing is not counted.
    pub pages: u32,
    pub items_exported: usize,
    pub attachments_saved: usize,
    pub bytes_written: u64,
    pub failures: Vec<ExportFailure>,
}

impl ExportReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Production [`ExportReporter`]: every callback becomes a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ExportReporter for TracingReporter {
    fn item_exported(&self, item: &Item, directory: &Path) {
        info!(
            item_id = %item.id,
            item_name = %item.name,
            attachments = item.attachments.len(),
            directory = %directory.display(),
            "Exported item"
        );
    }

    fn attachment_saved(&self, item: &Item, attachment: &Attachment, path: &Path, bytes: u64) {
        info!(
            item_id = %item.id,
            attachment_id = %attachment.id,
            path = %path.display(),
            bytes,
            "Downloaded attachment"
        );
    }

    fn failure(&self, failure: &ExportFailure) {
        error!(
            stage = %failure.stage,
            item_id = %failure.item_id,
            item_name = %failure.item_name,
            attachment_id = failure.attachment_id.as_deref().unwrap_or("-"),
            error = %failure.message,
            "Export step failed, continuing"
        );
    }
}
