//! High-level pipeline: orchestrates login → paginate → fetch detail → download attachments.
//!
//! [`Exporter`] walks every item on a Homebox server and mirrors its attachments into
//! `<output_dir>/<item directory>/<attachment filename>`, with names derived by
//! [`crate::naming`].
//!
//! # Responsibilities
//! - One login, then sequential page requests starting at page 1 until a page comes back empty
//! - A full detail fetch per item (summaries do not reliably carry attachments)
//! - Idempotent directory creation and overwrite-in-place file writes
//! - Failure isolation: a failed detail fetch, directory or attachment is reported through the
//!   [`ExportReporter`], recorded in the [`ExportReport`], and the run moves on
//!
//! # Error Handling
//! Only configuration, login, export-root creation and page listing failures abort the run
//! with an [`ExportError`]. Nothing is retried.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::config::ExportConfig;
use crate::contract::{
    Attachment, ExportFailure, ExportReporter, FailureStage, HomeboxApi, Item,
};
use crate::error::ExportError;
use crate::filesystem::{ensure_dir, write_stream, WriteError};
use crate::naming::{directory_name_for, filename_for};
use crate::report::ExportReport;

pub struct Exporter<A, R> {
    config: ExportConfig,
    api: A,
    reporter: R,
}

impl<A, R> Exporter<A, R>
where
    A: HomeboxApi,
    R: ExportReporter,
{
    /// Validates `config` before anything touches the network.
    pub fn new(mut config: ExportConfig, api: A, reporter: R) -> Result<Self, ExportError> {
        config.validate()?;
        config.trace_loaded();
        Ok(Self {
            config,
            api,
            reporter,
        })
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Runs the full export. Returns a report even when individual items or
    /// attachments failed; see [`ExportReport::failures`].
    pub async fn export_all(&self) -> Result<ExportReport, ExportError> {
        info!(server_url = %self.config.server_url, "[EXPORT] Starting export");

        self.api
            .login(&self.config.username, &self.config.password)
            .await
            .map_err(|e| {
                error!(error = %e, username = %self.config.username, "[EXPORT][ERROR] Login failed");
                ExportError::Login(e)
            })?;
        info!(username = %self.config.username, "[EXPORT] Logged in");

        let root = self.config.output_dir.as_path();
        ensure_dir(root).await.map_err(|e| {
            error!(error = %e, path = %root.display(), "[EXPORT][ERROR] Cannot create export root");
            ExportError::CreateRoot {
                path: root.to_path_buf(),
                source: e,
            }
        })?;

        let mut report = ExportReport::default();
        let mut page: u32 = 1;

        loop {
            debug!(page, page_size = self.config.page_size, "[EXPORT] Listing items");
            let listing = self
                .api
                .list_items(page, self.config.page_size)
                .await
                .map_err(|e| {
                    error!(error = %e, page, "[EXPORT][ERROR] Listing items failed");
                    ExportError::ListItems { page, source: e }
                })?;

            if listing.items.is_empty() {
                info!(page, "[EXPORT] Empty page, listing complete");
                break;
            }

            info!(
                page,
                items = listing.items.len(),
                total = listing.total,
                "[EXPORT] Processing page"
            );
            for summary in &listing.items {
                self.export_item(summary, root, &mut report).await;
            }

            report.pages += 1;
            page += 1;
        }

        info!(
            pages = report.pages,
            items = report.items_exported,
            attachments = report.attachments_saved,
            failures = report.failures.len(),
            "[EXPORT] Export finished"
        );
        Ok(report)
    }

    async fn export_item(&self, summary: &Item, root: &Path, report: &mut ExportReport) {
        let item = match self.api.get_item(&summary.id).await {
            Ok(item) => item,
            Err(e) => {
                self.record(
                    report,
                    failure(FailureStage::DetailFetch, summary, None, e.to_string()),
                );
                return;
            }
        };

        info!(item_id = %item.id, item_name = %item.name, "[EXPORT] Processing item");
        match serde_json::to_string(&item) {
            Ok(json) => debug!(item_id = %item.id, json = %json, "[EXPORT] Item JSON"),
            Err(e) => debug!(item_id = %item.id, error = %e, "[EXPORT] Failed to serialize item"),
        }

        let directory = root.join(directory_name_for(&item));
        if let Err(e) = ensure_dir(&directory).await {
            self.record(
                report,
                failure(
                    FailureStage::CreateDirectory,
                    &item,
                    None,
                    format!("failed to create subdirectory {}: {}", directory.display(), e),
                ),
            );
            return;
        }

        for attachment in &item.attachments {
            match self.export_attachment(&item, attachment, &directory).await {
                Ok((path, bytes)) => {
                    report.attachments_saved += 1;
                    report.bytes_written += bytes;
                    self.reporter.attachment_saved(&item, attachment, &path, bytes);
                }
                Err(f) => self.record(report, f),
            }
        }

        report.items_exported += 1;
        self.reporter.item_exported(&item, &directory);
    }

    async fn export_attachment(
        &self,
        item: &Item,
        attachment: &Attachment,
        directory: &Path,
    ) -> Result<(PathBuf, u64), ExportFailure> {
        let path = directory.join(filename_for(item, attachment));
        debug!(
            item_id = %item.id,
            attachment_id = %attachment.id,
            path = %path.display(),
            "[EXPORT] Downloading attachment"
        );

        let stream = self
            .api
            .download_attachment(&item.id, &attachment.id)
            .await
            .map_err(|e| {
                failure(
                    FailureStage::Download,
                    item,
                    Some(attachment),
                    format!("failed to download attachment: {}", e),
                )
            })?;

        let bytes = write_stream(&path, stream).await.map_err(|e| {
            let stage = match e {
                WriteError::Source(_) => FailureStage::Download,
                WriteError::Create { .. } | WriteError::Write { .. } => FailureStage::Write,
            };
            failure(stage, item, Some(attachment), e.to_string())
        })?;

        Ok((path, bytes))
    }

    fn record(&self, report: &mut ExportReport, failure: ExportFailure) {
        self.reporter.failure(&failure);
        report.failures.push(failure);
    }
}

fn failure(
    stage: FailureStage,
    item: &Item,
    attachment: Option<&Attachment>,
    message: String,
) -> ExportFailure {
    ExportFailure {
        stage,
        item_id: item.id.clone(),
        item_name: item.name.clone(),
        attachment_id: attachment.map(|a| a.id.clone()),
        message,
    }
}
