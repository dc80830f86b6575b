//! Upload pass: `pending -> uploading -> {success, failed}`.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::ledger::{TaskLedger, TaskStatus};
use crate::metrics;
use crate::remote_storage::{remote_target, RemoteStorage};

use super::{IngestOutcome, OrchestratorError, OrchestratorSettings};

/// Uploads a completed download and records the result in the ledger.
pub struct UploadOrchestrator {
    ledger: Arc<dyn TaskLedger>,
    storage: Arc<dyn RemoteStorage>,
    settings: OrchestratorSettings,
}

impl UploadOrchestrator {
    pub fn new(
        ledger: Arc<dyn TaskLedger>,
        storage: Arc<dyn RemoteStorage>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            ledger,
            storage,
            settings,
        }
    }

    /// Upload `local_path` as `name` unless the task was already uploaded.
    ///
    /// A storage failure marks the task `failed` and is returned, so a
    /// scheduler can retry the whole call later. There is no internal retry.
    pub async fn ingest(
        &self,
        id: &str,
        name: &str,
        local_path: &Path,
    ) -> Result<IngestOutcome, OrchestratorError> {
        if let Some(task) = self.ledger.get(id)? {
            match task.status {
                TaskStatus::Success => {
                    info!("Task {} ({}) already uploaded, skipping", id, name);
                    metrics::UPLOADS_TOTAL.with_label_values(&["skipped"]).inc();
                    return Ok(IngestOutcome::AlreadyUploaded);
                }
                TaskStatus::Archived => {
                    info!("Task {} ({}) already archived, skipping", id, name);
                    metrics::UPLOADS_TOTAL.with_label_values(&["skipped"]).inc();
                    return Ok(IngestOutcome::AlreadyArchived);
                }
                TaskStatus::Uploading => {
                    warn!(
                        "Task {} ({}) was left uploading by an earlier run, restarting",
                        id, name
                    );
                }
                TaskStatus::Pending | TaskStatus::Failed => {}
            }
        }

        self.ledger.register(id, name)?;
        self.ledger.set_status(id, TaskStatus::Uploading, "started")?;

        info!(
            "Uploading {} ({}) to {}",
            name,
            id,
            remote_target(&self.settings.remote_dir, name)
        );
        let started = Instant::now();
        let result = self
            .storage
            .upload(
                local_path,
                &self.settings.remote_dir,
                name,
                self.settings.upload_timeout,
            )
            .await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(()) => {
                metrics::UPLOAD_DURATION
                    .with_label_values(&["success"])
                    .observe(elapsed);

                if let Err(e) = self.ledger.set_status(id, TaskStatus::Success, "uploaded") {
                    metrics::UPLOADS_TOTAL.with_label_values(&["failed"]).inc();
                    error!("Uploaded {} ({}) but could not record it: {}", name, id, e);
                    return Err(e.into());
                }
                metrics::UPLOADS_TOTAL.with_label_values(&["success"]).inc();

                info!("Upload of {} ({}) finished in {:.1}s", name, id, elapsed);
                Ok(IngestOutcome::Uploaded)
            }
            Err(e) => {
                metrics::UPLOAD_DURATION
                    .with_label_values(&["failed"])
                    .observe(elapsed);
                metrics::UPLOADS_TOTAL.with_label_values(&["failed"]).inc();

                error!("Upload of {} ({}) failed: {}", name, id, e);
                if let Err(ledger_err) =
                    self.ledger
                        .set_status(id, TaskStatus::Failed, &e.to_string())
                {
                    error!("Failed to record upload failure for {}: {}", id, ledger_err);
                }
                Err(OrchestratorError::Gateway(e))
            }
        }
    }
}
