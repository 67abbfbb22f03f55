//! Small standalone helpers shared across the crate: a token-bucket rate limiter,
//! streaming file checksums, size/speed formatting, and the binary/text heuristic
//! used to auto-select TYPE A vs TYPE I when the caller doesn't pin one.

use md5::{Digest, Md5};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Text-file extensions (without the leading dot) that select ASCII mode when the
/// caller leaves the transfer type unspecified. Closed set — anything else is binary.
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "html", "htm", "css", "js", "json", "xml", "csv", "log", "ini", "conf",
    "cfg", "py", "java", "c", "cpp", "h", "sh", "bat", "yaml", "yml", "toml",
];

/// Whether `path` should be treated as binary for transfer-mode auto-selection.
/// Files with no extension, or an extension outside the closed text set, are binary.
pub fn is_binary_file(path: &str) -> bool {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext {
        Some(ext) => !TEXT_EXTENSIONS.contains(&ext.as_str()),
        None => true,
    }
}

/// Render a byte count as a human string (`1536` → `"1.50 KB"`).
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

/// Average throughput in bytes/sec given bytes moved and elapsed time.
pub fn calculate_transfer_speed(bytes: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64().max(0.001);
    (bytes as f64 / secs) as u64
}

/// A token-bucket rate limiter: capacity and refill rate are both `bytes_per_sec`, so
/// the bucket can absorb one second of traffic before shaping kicks in.
pub struct TokenBucket {
    capacity: f64,
    fill_rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(bytes_per_sec: u64) -> Self {
        let capacity = bytes_per_sec as f64;
        Self {
            capacity,
            fill_rate: capacity,
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.fill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Consume `amount` tokens (bytes). Returns how long the caller should wait
    /// before sending that much data, `Duration::ZERO` if the bucket covered it.
    pub fn consume(&mut self, amount: u64) -> Duration {
        self.refill();
        let amount = amount as f64;
        if self.tokens >= amount {
            self.tokens -= amount;
            return Duration::ZERO;
        }
        let deficit = amount - self.tokens;
        self.tokens = 0.0;
        Duration::from_secs_f64(deficit / self.fill_rate)
    }
}

/// Stream a local file through MD5 and CRC-32 in one pass, returning both digests.
pub async fn checksum_file(path: &str) -> std::io::Result<(String, u32)> {
    let mut file = File::open(path).await?;
    let mut md5 = Md5::new();
    let mut crc = crc32fast::Hasher::new();
    let mut buf = vec![0u8; 65_536];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        md5.update(&buf[..n]);
        crc.update(&buf[..n]);
    }
    Ok((format!("{:x}", md5.finalize()), crc.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_heuristic_matches_closed_extension_set() {
        assert!(!is_binary_file("report.csv"));
        assert!(!is_binary_file("README.MD"));
        assert!(is_binary_file("archive.zip"));
        assert!(is_binary_file("no_extension"));
    }

    #[test]
    fn format_size_picks_the_right_unit() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn token_bucket_allows_a_full_capacity_burst() {
        let mut bucket = TokenBucket::new(1024);
        assert_eq!(bucket.consume(1024), Duration::ZERO);
    }

    #[test]
    fn token_bucket_makes_overdraft_wait() {
        let mut bucket = TokenBucket::new(1024);
        bucket.consume(1024);
        let wait = bucket.consume(1024);
        assert!(wait > Duration::ZERO);
    }

    #[tokio::test]
    async fn checksum_file_is_stable_for_known_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.bin");
        tokio::fs::write(&path, b"hello world").await.unwrap();
        let (md5, crc) = checksum_file(path.to_str().unwrap()).await.unwrap();
        assert_eq!(md5, "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(crc, 0x0d4a1185);
    }
}
