//! Remote storage backed by an external CLI tool.
//!
//! Invocations:
//! - upload: `<program> upload <local_path> <remote_dir>/<name> [extra_args...]`
//! - exists: `<program> ls <remote_dir>/<name>` (exit status 0 means present)

use std::ffi::OsString;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::CommandStorageConfig;

use super::{remote_target, RemoteStorage, RemoteStorageError};

/// Storage backend that shells out to a storage CLI.
pub struct CommandStorage {
    config: CommandStorageConfig,
}

impl CommandStorage {
    pub fn new(config: CommandStorageConfig) -> Self {
        Self { config }
    }

    fn upload_args(&self, local_path: &Path, remote_path: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "upload".into(),
            local_path.as_os_str().to_owned(),
            remote_path.into(),
        ];
        args.extend(self.config.extra_args.iter().map(OsString::from));
        args
    }

    /// Run the tool to completion. The child is killed if `timeout` elapses.
    async fn run(&self, args: &[OsString], timeout: Duration) -> Result<Output, RemoteStorageError> {
        debug!("Executing {} {:?}", self.config.program.display(), args);

        let child = Command::new(&self.config.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RemoteStorageError::SpawnFailed {
                program: self.config.program.clone(),
                source,
            })?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(RemoteStorageError::command_failed(
                format!("failed to collect output: {}", e),
                None,
            )),
            // Dropping the wait future drops the child, which kills it.
            Err(_) => Err(RemoteStorageError::Timeout {
                timeout_secs: timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl RemoteStorage for CommandStorage {
    fn name(&self) -> &str {
        "command"
    }

    async fn upload(
        &self,
        local_path: &Path,
        remote_dir: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<(), RemoteStorageError> {
        let remote_path = remote_target(remote_dir, name);
        info!("Uploading {} -> {}", local_path.display(), remote_path);

        let output = self
            .run(&self.upload_args(local_path, &remote_path), timeout)
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            error!(
                "Upload command failed. stdout: {}, stderr: {}",
                stdout.trim(),
                stderr.trim()
            );
            return Err(RemoteStorageError::command_failed(
                format!("upload exited with {}", output.status),
                Some(stderr),
            ));
        }

        debug!("Upload command succeeded. stdout: {}", stdout.trim());
        Ok(())
    }

    async fn exists(
        &self,
        remote_dir: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<bool, RemoteStorageError> {
        let remote_path = remote_target(remote_dir, name);
        info!("Checking remote copy: {}", remote_path);

        let output = self
            .run(&["ls".into(), remote_path.into()], timeout)
            .await?;

        // A missing path makes `ls` exit non-zero; that is an answer, not an error.
        Ok(output.status.success())
    }
}
