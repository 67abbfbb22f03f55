//! Connection pool — a bounded set of authenticated `FtpClient` sessions shared by
//! the scheduler's workers.
//!
//! `acquire()` hands out an idle, live session (creating one on demand while under
//! capacity, waiting when exhausted); `release()` returns it to the idle set or
//! closes it if it went unhealthy. A background validator periodically NOOP-probes
//! idle sessions and evicts stale ones, matching the teacher crate's maintenance
//! task shape (`reap_idle` + `keepalive_all`) but folded into the acquire/release
//! contract instead of a plain keyed map.

use crate::ftp::client::FtpClient;
use crate::ftp::error::{FtpError, FtpResult};
pub use crate::ftp::types::PoolStats;
use crate::ftp::types::{FtpConnectionConfig, FtpSessionInfo};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio::time::{self, Duration};

struct Inner {
    idle: VecDeque<FtpClient>,
    busy: usize,
    closed: bool,
}

/// Bounded pool of sessions built from a shared connection template.
pub struct FtpPool {
    template: FtpConnectionConfig,
    max_sessions: usize,
    idle_timeout_sec: u64,
    inner: Mutex<Inner>,
    notify: Notify,
    creation_failures: AtomicU64,
}

impl FtpPool {
    pub fn new(template: FtpConnectionConfig) -> Arc<Self> {
        let max_sessions = template.max_concurrent_transfers.max(1);
        let idle_timeout_sec = template.idle_timeout_sec;
        Arc::new(Self {
            template,
            max_sessions,
            idle_timeout_sec,
            inner: Mutex::new(Inner {
                idle: VecDeque::new(),
                busy: 0,
                closed: false,
            }),
            notify: Notify::new(),
            creation_failures: AtomicU64::new(0),
        })
    }

    /// Borrow a live, authenticated session. Prefers a previously idle session
    /// (probed with NOOP first); creates one on demand while under capacity;
    /// otherwise waits for a release, bounded by `deadline` if given.
    pub async fn acquire(self: &Arc<Self>, deadline: Option<Duration>) -> FtpResult<FtpClient> {
        let start = std::time::Instant::now();
        loop {
            {
                let mut guard = self.inner.lock().await;
                if guard.closed {
                    return Err(FtpError::disconnected("pool is closed"));
                }
                while let Some(mut candidate) = guard.idle.pop_front() {
                    guard.busy += 1;
                    drop(guard);
                    if candidate.noop().await.is_ok() {
                        return Ok(candidate);
                    }
                    let _ = candidate.quit().await;
                    guard = self.inner.lock().await;
                    guard.busy -= 1;
                }
                if guard.busy < self.max_sessions {
                    guard.busy += 1;
                    drop(guard);
                    return match FtpClient::connect(self.template.clone()).await {
                        Ok(client) => Ok(client),
                        Err(e) => {
                            self.creation_failures.fetch_add(1, Ordering::Relaxed);
                            let mut guard = self.inner.lock().await;
                            guard.busy -= 1;
                            self.notify.notify_waiters();
                            Err(e)
                        }
                    };
                }
            }

            let remaining = match deadline {
                Some(d) => {
                    let elapsed = start.elapsed();
                    if elapsed >= d {
                        return Err(FtpError::pool_exhausted(
                            "timed out waiting for a free session",
                        ));
                    }
                    Some(d - elapsed)
                }
                None => None,
            };

            match remaining {
                Some(d) => {
                    if time::timeout(d, self.notify.notified()).await.is_err() {
                        return Err(FtpError::pool_exhausted(
                            "timed out waiting for a free session",
                        ));
                    }
                }
                None => self.notify.notified().await,
            }
        }
    }

    /// Return a session. Healthy sessions go back to idle; unhealthy ones are
    /// closed, freeing their capacity slot.
    pub async fn release(&self, mut client: FtpClient) {
        let mut guard = self.inner.lock().await;
        guard.busy = guard.busy.saturating_sub(1);
        if guard.closed || !client.healthy || !client.is_connected() {
            drop(guard);
            let _ = client.quit().await;
        } else {
            guard.idle.push_back(client);
            drop(guard);
        }
        self.notify.notify_waiters();
    }

    /// Close every session, idle or busy-tracked, and refuse further acquires.
    pub async fn close_all(&self) {
        let mut guard = self.inner.lock().await;
        guard.closed = true;
        let idle = std::mem::take(&mut guard.idle);
        drop(guard);
        for mut client in idle {
            let _ = client.quit().await;
        }
        self.notify.notify_waiters();
    }

    pub async fn list_sessions(&self) -> Vec<FtpSessionInfo> {
        self.inner
            .lock()
            .await
            .idle
            .iter()
            .map(|c| c.info.clone())
            .collect()
    }

    pub async fn stats(&self) -> PoolStats {
        let guard = self.inner.lock().await;
        PoolStats {
            total_sessions: (guard.idle.len() + guard.busy) as u32,
            active_sessions: guard.busy as u32,
            idle_sessions: guard.idle.len() as u32,
            max_sessions: self.max_sessions as u32,
            creation_failures: self.creation_failures.load(Ordering::Relaxed),
        }
    }

    /// Walk the idle set, evicting sessions past `idle_timeout_sec` or failing NOOP.
    async fn validate_idle(&self) {
        let cutoff = Utc::now() - chrono::Duration::seconds(self.idle_timeout_sec as i64);
        let mut guard = self.inner.lock().await;
        let candidates: Vec<FtpClient> = guard.idle.drain(..).collect();
        drop(guard);

        let mut survivors = Vec::new();
        let mut reaped = 0usize;
        for mut client in candidates {
            if client.info.last_activity < cutoff {
                let _ = client.quit().await;
                reaped += 1;
                continue;
            }
            if client.noop().await.is_ok() {
                survivors.push(client);
            } else {
                let _ = client.quit().await;
                reaped += 1;
            }
        }

        let mut guard = self.inner.lock().await;
        guard.idle.extend(survivors);
        drop(guard);

        if reaped > 0 {
            log::info!("FTP pool: reaped {} idle session(s)", reaped);
        }
    }
}

/// Spawn the background validator: runs every `idle_timeout_sec / 2`.
pub fn spawn_pool_validator(pool: Arc<FtpPool>) -> tokio::task::JoinHandle<()> {
    let period = Duration::from_secs((pool.idle_timeout_sec / 2).max(1));
    tokio::spawn(async move {
        let mut ticker = time::interval(period);
        loop {
            ticker.tick().await;
            pool.validate_idle().await;
        }
    })
}
