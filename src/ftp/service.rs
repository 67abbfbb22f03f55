//! `Ftp` — the client façade. Owns the session pool and the task scheduler built on
//! top of it, and exposes task-returning operations instead of raw protocol calls.
//!
//! Recursive directory download is coordinated entirely here, not inside a worker: it
//! submits a LIST task, waits for it on the caller's own task (not a pool worker), then
//! fans DOWNLOAD tasks out across the directory tree. A worker blocking on a sub-listing
//! could starve the fixed worker set; this way traversal never touches a worker at all
//! until the actual downloads are queued.

use crate::ftp::client::FtpClient;
use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::pool::{spawn_pool_validator, FtpPool};
use crate::ftp::queue::Scheduler;
use crate::ftp::types::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// The concurrent FTP/FTPS client: a pooled façade over the protocol engine.
///
/// `pool_size` (via `FtpConnectionConfig::max_concurrent_transfers`) governs both the
/// session pool's capacity and the scheduler's worker count; `pool_size = 1` recovers
/// single-session, fully-serialized behavior.
pub struct Ftp {
    pool: Arc<FtpPool>,
    scheduler: Arc<Scheduler>,
    validator_handle: JoinHandle<()>,
}

impl std::fmt::Debug for Ftp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ftp").finish_non_exhaustive()
    }
}

impl Ftp {
    /// Connect once to validate the template (host, credentials, TLS) fails fast rather
    /// than deferring the first error to an arbitrary later task, then build the pool and
    /// scheduler around it.
    pub async fn connect(config: FtpConnectionConfig) -> FtpResult<Self> {
        let probe = FtpClient::connect(config.clone()).await?;
        let pool = FtpPool::new(config.clone());
        pool.release(probe).await;
        let validator_handle = spawn_pool_validator(pool.clone());

        let scheduler_config = SchedulerConfig::from(&config);
        let scheduler = Scheduler::spawn(pool.clone(), scheduler_config);

        Ok(Self { pool, scheduler, validator_handle })
    }

    /// Connect using a JSON connection config read from `path`. A missing file is not
    /// an error: defaults are written out to `path` and used, mirroring the original
    /// `Config._create_default_config` behavior.
    pub async fn connect_from_config_file(path: &str) -> FtpResult<Self> {
        Self::connect(load_or_create_config(path).await?).await
    }

    /// Submit a raw task. The typed helpers below (`upload`, `download`, ...) cover the
    /// common cases; this is the escape hatch for building `TaskArgs` directly.
    pub fn submit(
        &self,
        args: TaskArgs,
        priority: TaskPriority,
        callbacks: TaskCallbacks,
    ) -> FtpResult<String> {
        self.scheduler.submit(args, priority, callbacks)
    }

    pub async fn upload(
        &self,
        local_path: &str,
        remote_path: &str,
        priority: TaskPriority,
        callbacks: Option<TaskCallbacks>,
    ) -> FtpResult<String> {
        self.upload_with(local_path, remote_path, priority, false, false, None, callbacks)
    }

    /// Upload with resume (continue from the remote file's current size), optional
    /// post-transfer MD5/CRC-32 verification, and an optional transfer-type override
    /// (`None` auto-selects BINARY/ASCII from `local_path`'s extension).
    pub fn upload_with(
        &self,
        local_path: &str,
        remote_path: &str,
        priority: TaskPriority,
        resume: bool,
        verify: bool,
        transfer_type: Option<TransferType>,
        callbacks: Option<TaskCallbacks>,
    ) -> FtpResult<String> {
        self.submit(
            TaskArgs::Upload {
                local_path: local_path.to_string(),
                remote_path: remote_path.to_string(),
                resume,
                verify,
                transfer_type,
            },
            priority,
            callbacks.unwrap_or_default(),
        )
    }

    pub async fn download(
        &self,
        remote_path: &str,
        local_path: &str,
        priority: TaskPriority,
        callbacks: Option<TaskCallbacks>,
    ) -> FtpResult<String> {
        self.download_with(remote_path, local_path, priority, false, false, None, callbacks)
    }

    /// Download with resume, optional verification, and an optional transfer-type
    /// override (`None` auto-selects BINARY/ASCII from `remote_path`'s extension).
    pub fn download_with(
        &self,
        remote_path: &str,
        local_path: &str,
        priority: TaskPriority,
        resume: bool,
        verify: bool,
        transfer_type: Option<TransferType>,
        callbacks: Option<TaskCallbacks>,
    ) -> FtpResult<String> {
        self.submit(
            TaskArgs::Download {
                remote_path: remote_path.to_string(),
                local_path: local_path.to_string(),
                resume,
                verify,
                transfer_type,
            },
            priority,
            callbacks.unwrap_or_default(),
        )
    }

    pub async fn delete(&self, remote_path: &str, priority: TaskPriority) -> FtpResult<String> {
        self.submit(
            TaskArgs::Delete { remote_path: remote_path.to_string() },
            priority,
            TaskCallbacks::default(),
        )
    }

    pub async fn rename(&self, from: &str, to: &str, priority: TaskPriority) -> FtpResult<String> {
        self.submit(
            TaskArgs::Rename { from: from.to_string(), to: to.to_string() },
            priority,
            TaskCallbacks::default(),
        )
    }

    pub async fn mkdir(
        &self,
        remote_path: &str,
        recursive: bool,
        priority: TaskPriority,
    ) -> FtpResult<String> {
        self.submit(
            TaskArgs::Mkdir { remote_path: remote_path.to_string(), recursive },
            priority,
            TaskCallbacks::default(),
        )
    }

    pub async fn rmdir(
        &self,
        remote_path: &str,
        recursive: bool,
        priority: TaskPriority,
    ) -> FtpResult<String> {
        self.submit(
            TaskArgs::Rmdir { remote_path: remote_path.to_string(), recursive },
            priority,
            TaskCallbacks::default(),
        )
    }

    pub async fn list(
        &self,
        remote_path: &str,
        options: ListOptions,
        priority: TaskPriority,
    ) -> FtpResult<String> {
        self.submit(
            TaskArgs::List { remote_path: remote_path.to_string(), options },
            priority,
            TaskCallbacks::default(),
        )
    }

    /// Recursively download `remote_dir` into `local_dir`. Returns the ids of every
    /// DOWNLOAD (and nested LIST) task spawned; callers `wait_for_task`/`wait_all` on
    /// those as with any other task. A listing failure anywhere in the tree is reported
    /// as a single synthetic failed task rather than aborting the whole walk.
    pub async fn download_directory(
        &self,
        remote_dir: &str,
        local_dir: &str,
        priority: TaskPriority,
    ) -> Vec<String> {
        let mut spawned = Vec::new();
        self.download_directory_inner(remote_dir, local_dir, priority, &mut spawned)
            .await;
        spawned
    }

    fn download_directory_inner<'a>(
        &'a self,
        remote_dir: &'a str,
        local_dir: &'a str,
        priority: TaskPriority,
        spawned: &'a mut Vec<String>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let list_id = match self.submit(
                TaskArgs::List {
                    remote_path: remote_dir.to_string(),
                    options: ListOptions::default(),
                },
                TaskPriority::Urgent,
                TaskCallbacks::default(),
            ) {
                Ok(id) => id,
                Err(e) => {
                    spawned.push(self.scheduler.register_synthetic_failure(e));
                    return;
                }
            };

            if !self.wait_for_task(&list_id, None).await {
                let err = self
                    .get_task(&list_id)
                    .and_then(|t| t.error)
                    .unwrap_or_else(|| FtpError::queue_error(format!("listing {} failed", remote_dir)));
                spawned.push(self.scheduler.register_synthetic_failure(err));
                return;
            }

            let entries = match self.get_task(&list_id).and_then(|t| t.result) {
                Some(TaskResult::Listing { entries }) => entries,
                _ => {
                    spawned.push(
                        self.scheduler
                            .register_synthetic_failure(FtpError::queue_error("listing produced no result")),
                    );
                    return;
                }
            };

            for entry in entries {
                let remote_path = format!("{}/{}", remote_dir.trim_end_matches('/'), entry.name);
                let local_path = format!("{}/{}", local_dir.trim_end_matches('/'), entry.name);
                match entry.kind {
                    FtpEntryKind::Directory => {
                        self.download_directory_inner(&remote_path, &local_path, priority, &mut *spawned)
                            .await;
                    }
                    _ => match self.submit(
                        TaskArgs::Download {
                            remote_path,
                            local_path,
                            resume: false,
                            verify: false,
                            transfer_type: None,
                        },
                        priority,
                        TaskCallbacks::default(),
                    ) {
                        Ok(id) => spawned.push(id),
                        Err(e) => spawned.push(self.scheduler.register_synthetic_failure(e)),
                    },
                }
            }
        })
    }

    pub async fn wait_for_task(&self, id: &str, timeout: Option<Duration>) -> bool {
        self.scheduler.wait_for_task(id, timeout).await
    }

    pub async fn wait_all(&self, timeout: Option<Duration>) -> bool {
        self.scheduler.wait_all(timeout).await
    }

    pub fn cancel(&self, id: &str) -> FtpResult<()> {
        self.scheduler.cancel(id)
    }

    pub fn get_task(&self, id: &str) -> Option<Task> {
        self.scheduler.get_task(id)
    }

    pub fn list_tasks(&self) -> Vec<Task> {
        self.scheduler.list_tasks()
    }

    pub async fn pool_stats(&self) -> PoolStats {
        self.pool.stats().await
    }

    /// Stop accepting new submissions and tear down the scheduler and pool. `wait=true`
    /// drains every already-queued task first; `wait=false` only lets in-flight tasks
    /// finish.
    pub async fn shutdown(&self, wait: bool) {
        self.scheduler.shutdown(wait).await;
        self.validator_handle.abort();
    }
}

/// Read `path` as a JSON `FtpConnectionConfig`. If it doesn't exist, serialize the
/// defaults, create any missing parent directories, and write it out so the next run
/// finds the same config it just used.
async fn load_or_create_config(path: &str) -> FtpResult<FtpConnectionConfig> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => serde_json::from_str(&contents)
            .map_err(|e| FtpError::invalid_config(format!("malformed config file {}: {}", path, e))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let config = FtpConnectionConfig::default();
            let json = serde_json::to_string_pretty(&config)
                .map_err(|e| FtpError::invalid_config(format!("failed to render default config: {}", e)))?;
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            tokio::fs::write(path, json).await?;
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_rejects_empty_host_before_building_pool() {
        let err = Ftp::connect(FtpConnectionConfig::default()).await.unwrap_err();
        assert_eq!(err.kind, crate::ftp::error::FtpErrorKind::InvalidConfig);
    }

    #[tokio::test]
    async fn missing_config_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ftp.json");
        let path = path.to_str().unwrap();

        let loaded = load_or_create_config(path).await.unwrap();
        assert_eq!(loaded.host, FtpConnectionConfig::default().host);
        assert!(std::path::Path::new(path).exists());

        let reloaded = load_or_create_config(path).await.unwrap();
        assert_eq!(reloaded.port, loaded.port);
    }

    #[tokio::test]
    async fn malformed_config_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ftp.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let err = load_or_create_config(path.to_str().unwrap()).await.unwrap_err();
        assert_eq!(err.kind, crate::ftp::error::FtpErrorKind::InvalidConfig);
    }
}
