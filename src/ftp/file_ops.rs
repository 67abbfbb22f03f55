//! File-level operations — upload, download, append, resume, delete, etc.
//!
//! Progress is reported through an explicit callback supplied by the caller (the
//! scheduler wires this to the owning `Task`), not a global map — see the crate's
//! design notes on removing ambient singletons.

use crate::ftp::client::FtpClient;
use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::transfer::{self, DataStream};
use crate::ftp::types::*;
use crate::ftp::utils::{checksum_file, is_binary_file, TokenBucket};
use std::path::Path;
use std::time::Instant;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Chunk size for streaming reads/writes.
const DEFAULT_CHUNK: usize = 65_536;

/// Per-call transfer behavior: resume, optional rate shaping, optional progress
/// reporting, optional post-transfer integrity verification.
pub struct TransferOptions<'a> {
    pub resume: bool,
    pub verify: bool,
    /// `None` auto-selects BINARY/ASCII from the transferred file's extension;
    /// `Some(_)` overrides both the auto-select heuristic and the session default.
    pub transfer_type: Option<TransferType>,
    pub rate_limiter: Option<&'a mut TokenBucket>,
    pub on_progress: Option<&'a mut (dyn FnMut(TransferDetail) + Send)>,
}

impl<'a> Default for TransferOptions<'a> {
    fn default() -> Self {
        Self {
            resume: false,
            verify: false,
            transfer_type: None,
            rate_limiter: None,
            on_progress: None,
        }
    }
}

/// Resolve the TYPE to send for one transfer: an explicit per-call override wins,
/// then the session's configured default, then the extension heuristic on `path`.
fn resolve_transfer_type(
    explicit: Option<TransferType>,
    config_default: Option<TransferType>,
    path: &str,
) -> TransferType {
    explicit.or(config_default).unwrap_or_else(|| {
        if is_binary_file(path) {
            TransferType::Binary
        } else {
            TransferType::Ascii
        }
    })
}

/// Outcome of a completed (or skipped) transfer.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub bytes_transferred: u64,
    pub skipped: bool,
    pub md5: Option<String>,
    pub crc32: Option<u32>,
}

impl FtpClient {
    // ─── DOWNLOAD (RETR) ─────────────────────────────────────────

    pub async fn download(
        &mut self,
        remote_path: &str,
        local_path: &str,
        opts: TransferOptions<'_>,
    ) -> FtpResult<TransferOutcome> {
        let tt = resolve_transfer_type(opts.transfer_type, self.config.transfer_type, remote_path);
        self.set_type(tt).await?;

        let total_bytes = if self.features.size {
            self.size(remote_path).await.ok()
        } else {
            None
        };

        let local_size = if Path::new(local_path).exists() {
            fs::metadata(local_path).await?.len()
        } else {
            0
        };

        // Resume idempotence: local copy already covers the remote file.
        if opts.resume {
            if let Some(remote_size) = total_bytes {
                if local_size >= remote_size {
                    return Ok(TransferOutcome {
                        bytes_transferred: local_size,
                        skipped: true,
                        md5: None,
                        crc32: None,
                    });
                }
            }
        }

        let resume_offset = if opts.resume { local_size } else { 0 };

        if resume_offset > 0 {
            if !self.features.rest_stream {
                return Err(FtpError::unsupported(
                    "Server does not support REST STREAM for resume",
                ));
            }
            self.codec
                .expect_ok(&format!("REST {}", resume_offset))
                .await?;
        }

        let channel = self.open_data_channel().await?;
        let ds = transfer::finalize(channel, &mut self.codec, &format!("RETR {}", remote_path))
            .await?;

        let mut file = if resume_offset > 0 {
            fs::OpenOptions::new()
                .write(true)
                .append(true)
                .open(local_path)
                .await?
        } else {
            if let Some(parent) = Path::new(local_path).parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::File::create(local_path).await?
        };

        let mut opts = opts;
        let started = Instant::now();
        let mut transferred = resume_offset;
        let mut buf = vec![0u8; DEFAULT_CHUNK];

        macro_rules! stream_loop {
            ($reader:expr) => {{
                loop {
                    let n = $reader.read(&mut buf).await?;
                    if n == 0 {
                        break;
                    }
                    file.write_all(&buf[..n]).await?;
                    transferred += n as u64;
                    if let Some(bucket) = opts.rate_limiter.as_deref_mut() {
                        let wait = bucket.consume(n as u64);
                        if !wait.is_zero() {
                            tokio::time::sleep(wait).await;
                        }
                    }
                    report_progress(&mut opts.on_progress, total_bytes, transferred, &started);
                }
            }};
        }

        match ds {
            DataStream::Plain(mut tcp) => stream_loop!(tcp),
            DataStream::Tls(mut tls) => stream_loop!(tls),
        };

        file.flush().await?;
        drop(file);

        let done = self.codec.read_response().await?;
        if !done.is_success() {
            return Err(FtpError::from_reply(done.code, &done.text()));
        }

        self.info.bytes_downloaded += transferred - resume_offset;
        self.touch();

        let (md5, crc32) = if opts.verify {
            let (m, c) = checksum_file(local_path).await?;
            (Some(m), Some(c))
        } else {
            (None, None)
        };

        Ok(TransferOutcome {
            bytes_transferred: transferred,
            skipped: false,
            md5,
            crc32,
        })
    }

    // ─── UPLOAD (STOR / APPE) ────────────────────────────────────

    pub async fn upload(
        &mut self,
        local_path: &str,
        remote_path: &str,
        opts: TransferOptions<'_>,
    ) -> FtpResult<TransferOutcome> {
        self.upload_inner(local_path, remote_path, opts, "STOR").await
    }

    pub async fn append(
        &mut self,
        local_path: &str,
        remote_path: &str,
        opts: TransferOptions<'_>,
    ) -> FtpResult<TransferOutcome> {
        self.upload_inner(local_path, remote_path, opts, "APPE").await
    }

    async fn upload_inner(
        &mut self,
        local_path: &str,
        remote_path: &str,
        opts: TransferOptions<'_>,
        command: &str,
    ) -> FtpResult<TransferOutcome> {
        let tt = resolve_transfer_type(opts.transfer_type, self.config.transfer_type, local_path);
        self.set_type(tt).await?;

        let meta = fs::metadata(local_path).await?;
        let local_total = meta.len();

        let remote_size = if self.features.size {
            self.size(remote_path).await.ok()
        } else {
            None
        };

        // Resume idempotence: remote copy already covers the local file.
        if opts.resume {
            if let Some(remote_size) = remote_size {
                if remote_size >= local_total {
                    return Ok(TransferOutcome {
                        bytes_transferred: remote_size,
                        skipped: true,
                        md5: None,
                        crc32: None,
                    });
                }
            }
        }

        let resume_offset = if opts.resume {
            remote_size.unwrap_or(0)
        } else {
            0
        };

        if resume_offset > 0 {
            if !self.features.rest_stream {
                return Err(FtpError::unsupported(
                    "Server does not support REST STREAM for resume",
                ));
            }
            self.codec
                .expect_ok(&format!("REST {}", resume_offset))
                .await?;
        }

        let channel = self.open_data_channel().await?;
        let verb = format!("{} {}", command, remote_path);
        let ds = transfer::finalize(channel, &mut self.codec, &verb).await?;

        let mut file = fs::File::open(local_path).await?;
        if resume_offset > 0 {
            use tokio::io::AsyncSeekExt;
            file.seek(std::io::SeekFrom::Start(resume_offset)).await?;
        }

        let mut opts = opts;
        let started = Instant::now();
        let mut transferred = resume_offset;
        let mut buf = vec![0u8; DEFAULT_CHUNK];

        macro_rules! stream_loop {
            ($writer:expr) => {{
                loop {
                    let n = file.read(&mut buf).await?;
                    if n == 0 {
                        break;
                    }
                    $writer.write_all(&buf[..n]).await?;
                    transferred += n as u64;
                    if let Some(bucket) = opts.rate_limiter.as_deref_mut() {
                        let wait = bucket.consume(n as u64);
                        if !wait.is_zero() {
                            tokio::time::sleep(wait).await;
                        }
                    }
                    report_progress(
                        &mut opts.on_progress,
                        Some(local_total),
                        transferred,
                        &started,
                    );
                }
                $writer.flush().await?;
                $writer.shutdown().await?;
            }};
        }

        match ds {
            DataStream::Plain(mut tcp) => stream_loop!(tcp),
            DataStream::Tls(mut tls) => stream_loop!(tls),
        };

        let done = self.codec.read_response().await?;
        if !done.is_success() {
            return Err(FtpError::from_reply(done.code, &done.text()));
        }

        self.info.bytes_uploaded += transferred - resume_offset;
        self.touch();

        let (md5, crc32) = if opts.verify {
            let (m, c) = checksum_file(local_path).await?;
            (Some(m), Some(c))
        } else {
            (None, None)
        };

        Ok(TransferOutcome {
            bytes_transferred: transferred,
            skipped: false,
            md5,
            crc32,
        })
    }
}

fn report_progress(
    on_progress: &mut Option<&mut (dyn FnMut(TransferDetail) + Send)>,
    total_bytes: Option<u64>,
    transferred: u64,
    started: &Instant,
) {
    let Some(cb) = on_progress.as_mut() else {
        return;
    };
    let elapsed = started.elapsed();
    let speed_bps = crate::ftp::utils::calculate_transfer_speed(transferred, elapsed);
    let eta_seconds = match (total_bytes, speed_bps) {
        (Some(total), speed) if speed > 0 && total > transferred => {
            Some(((total - transferred) / speed) as u32)
        }
        (Some(total), _) if total <= transferred => Some(0),
        _ => None,
    };
    cb(TransferDetail {
        transferred_bytes: transferred,
        total_bytes,
        speed_bps,
        eta_seconds,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_override_wins_over_everything() {
        let tt = resolve_transfer_type(Some(TransferType::Ascii), Some(TransferType::Binary), "data.bin");
        assert_eq!(tt, TransferType::Ascii);
    }

    #[test]
    fn config_default_wins_over_heuristic() {
        let tt = resolve_transfer_type(None, Some(TransferType::Ascii), "archive.zip");
        assert_eq!(tt, TransferType::Ascii);
    }

    #[test]
    fn falls_back_to_extension_heuristic() {
        assert_eq!(resolve_transfer_type(None, None, "notes.txt"), TransferType::Ascii);
        assert_eq!(resolve_transfer_type(None, None, "archive.zip"), TransferType::Binary);
    }
}
