//! Shared types for the FTP crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ftp::error::FtpError;

// ─── Connection / Session ────────────────────────────────────────────

/// Security mode for the control channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum FtpSecurityMode {
    /// Plain-text FTP (port 21).
    None,
    /// Explicit FTPS — starts plain then upgrades via AUTH TLS (port 21).
    Explicit,
    /// Implicit FTPS — TLS from the first byte (port 990).
    Implicit,
}

impl Default for FtpSecurityMode {
    fn default() -> Self {
        Self::None
    }
}

/// How strictly the TLS layer validates the server's certificate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum TlsVerifyPolicy {
    /// Full chain + hostname validation. Default.
    VerifyFull,
    /// Chain is validated but the hostname is not checked against the cert's SAN —
    /// useful when connecting to a bare IP with a self-signed certificate.
    VerifyPeerOnly,
    /// No validation at all. Logged at `warn` once per session.
    NoVerify,
}

impl Default for TlsVerifyPolicy {
    fn default() -> Self {
        Self::VerifyFull
    }
}

/// Transfer type (RFC 959 TYPE command).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum TransferType {
    Ascii,
    Binary,
}

impl Default for TransferType {
    fn default() -> Self {
        Self::Binary
    }
}

/// Transfer mode selected for the data channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum DataChannelMode {
    Passive,
    ExtendedPassive,
    Active,
    ExtendedActive,
}

impl Default for DataChannelMode {
    fn default() -> Self {
        Self::Passive
    }
}

/// Configuration for a single FTP connection, and the template the pool uses to
/// create new sessions on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub security: FtpSecurityMode,
    #[serde(default)]
    pub tls_verify: TlsVerifyPolicy,
    /// `None` auto-selects BINARY/ASCII per transfer from the filename extension;
    /// `Some(_)` pins every transfer on this session to that type.
    #[serde(default)]
    pub transfer_type: Option<TransferType>,
    #[serde(default)]
    pub data_channel_mode: DataChannelMode,
    /// Initial remote directory to CWD into after login.
    #[serde(default)]
    pub initial_directory: Option<String>,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_sec: u64,
    /// Data-channel timeout in seconds.
    #[serde(default = "default_data_timeout")]
    pub data_timeout_sec: u64,
    /// Keepalive NOOP interval in seconds (0 = disabled).
    #[serde(default = "default_keepalive")]
    pub keepalive_interval_sec: u64,
    /// UTF-8 encoding (OPTS UTF8 ON).
    #[serde(default = "default_true")]
    pub utf8: bool,
    /// Local address to bind for active-mode data connections.
    #[serde(default)]
    pub active_bind_address: Option<String>,
    /// Friendly label for logging.
    #[serde(default)]
    pub label: Option<String>,
    /// Maximum sessions the pool built from this template will hold.
    #[serde(default = "default_concurrent")]
    pub max_concurrent_transfers: usize,
    /// Idle eviction window for pooled sessions, in seconds.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_sec: u64,
    /// Whether the retry monitor is active.
    #[serde(default = "default_true")]
    pub auto_retry: bool,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff")]
    pub retry_delay_sec: u64,
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff: f64,
    /// Bandwidth cap in bytes/sec across each session's transfers; 0 = unlimited.
    #[serde(default)]
    pub bandwidth_limit_bps: u64,
}

fn default_connect_timeout() -> u64 {
    15
}
fn default_data_timeout() -> u64 {
    30
}
fn default_keepalive() -> u64 {
    60
}
fn default_true() -> bool {
    true
}
fn default_concurrent() -> usize {
    3
}
fn default_idle_timeout() -> u64 {
    300
}
fn default_retries() -> u32 {
    3
}
fn default_backoff() -> u64 {
    5
}
fn default_retry_backoff() -> f64 {
    2.0
}

impl Default for FtpConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 21,
            username: "anonymous".into(),
            password: "anonymous@".into(),
            security: FtpSecurityMode::None,
            tls_verify: TlsVerifyPolicy::VerifyFull,
            transfer_type: None,
            data_channel_mode: DataChannelMode::Passive,
            initial_directory: None,
            connect_timeout_sec: default_connect_timeout(),
            data_timeout_sec: default_data_timeout(),
            keepalive_interval_sec: default_keepalive(),
            utf8: true,
            active_bind_address: None,
            label: None,
            max_concurrent_transfers: default_concurrent(),
            idle_timeout_sec: default_idle_timeout(),
            auto_retry: true,
            max_retries: default_retries(),
            retry_delay_sec: default_backoff(),
            retry_backoff: default_retry_backoff(),
            bandwidth_limit_bps: 0,
        }
    }
}

/// Information about an active FTP session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpSessionInfo {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub security: FtpSecurityMode,
    pub connected: bool,
    pub current_directory: String,
    pub server_banner: Option<String>,
    pub system_type: Option<String>,
    pub features: Vec<String>,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub transfer_type: TransferType,
    pub label: Option<String>,
    pub bytes_uploaded: u64,
    pub bytes_downloaded: u64,
}

// ─── Directory Listing ───────────────────────────────────────────────

/// Type of a remote filesystem entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum FtpEntryKind {
    File,
    Directory,
    Symlink,
    Unknown,
}

/// One entry from a directory listing (parsed from LIST or MLSD output).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpEntry {
    pub name: String,
    pub kind: FtpEntryKind,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub permissions: Option<String>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub link_target: Option<String>,
    /// Raw line from the server (for debugging).
    pub raw: Option<String>,
    /// MLSD fact map (e.g. "type" → "file", "size" → "1234").
    #[serde(default)]
    pub facts: HashMap<String, String>,
}

/// Sorting field for directory listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum FtpSortField {
    Name,
    Size,
    Modified,
    Kind,
}

/// Sort order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum FtpSortOrder {
    Asc,
    Desc,
}

/// Options for listing a directory.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    /// Filter by glob pattern (e.g. "*.txt").
    pub filter: Option<String>,
    pub sort_by: Option<FtpSortField>,
    pub sort_order: Option<FtpSortOrder>,
    /// Show hidden ("dot") files.
    #[serde(default = "default_true")]
    pub show_hidden: bool,
    /// Prefer MLSD over LIST when the server supports it.
    #[serde(default = "default_true")]
    pub prefer_mlsd: bool,
}

// ─── FTP Response ────────────────────────────────────────────────────

/// A single FTP response (may be multi-line).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpResponse {
    pub code: u16,
    pub lines: Vec<String>,
}

impl FtpResponse {
    /// Full response text (all lines joined).
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Whether the response code indicates success (1xx–3xx).
    pub fn is_success(&self) -> bool {
        self.code < 400
    }

    /// Whether this is a positive-preliminary reply (1xx).
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// Whether this is a positive-completion reply (2xx).
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Whether this is a positive-intermediate reply (3xx).
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }
}

// ─── Connection Pool ─────────────────────────────────────────────────

/// Statistics about the connection pool.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub total_sessions: u32,
    pub active_sessions: u32,
    pub idle_sessions: u32,
    pub max_sessions: u32,
    pub creation_failures: u64,
}

// ─── Server Capabilities ─────────────────────────────────────────────

/// Parsed FEAT response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerFeatures {
    pub mlsd: bool,
    pub mlst: bool,
    pub size: bool,
    pub mdtm: bool,
    pub rest_stream: bool,
    pub utf8: bool,
    pub epsv: bool,
    pub eprt: bool,
    pub auth_tls: bool,
    pub pbsz: bool,
    pub prot: bool,
    pub tvfs: bool,
    pub clnt: bool,
    pub mfmt: bool,
    pub raw_features: Vec<String>,
}

/// Diagnostics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpDiagnostics {
    pub session_id: String,
    pub host: String,
    pub security: FtpSecurityMode,
    pub features: ServerFeatures,
    pub current_directory: String,
    pub system_type: Option<String>,
    pub latency_ms: Option<u64>,
    pub last_response_code: Option<u16>,
}

// ─── Task model ──────────────────────────────────────────────────────

/// The kind of operation a task performs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    Upload,
    Download,
    Delete,
    Rename,
    Mkdir,
    Rmdir,
    List,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Scheduling priority. Ordinal value drives heap ordering: higher is dispatched first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TaskPriority {
    Low = 0,
    Normal = 1,
    High = 2,
    Urgent = 3,
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Canceled,
    Paused,
    Retrying,
}

/// Per-kind arguments for a submitted task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TaskArgs {
    Upload {
        local_path: String,
        remote_path: String,
        resume: bool,
        verify: bool,
        /// `None` auto-selects BINARY/ASCII from `local_path`'s extension.
        #[serde(default)]
        transfer_type: Option<TransferType>,
    },
    Download {
        remote_path: String,
        local_path: String,
        resume: bool,
        verify: bool,
        /// `None` auto-selects BINARY/ASCII from `remote_path`'s extension.
        #[serde(default)]
        transfer_type: Option<TransferType>,
    },
    Delete {
        remote_path: String,
    },
    Rename {
        from: String,
        to: String,
    },
    Mkdir {
        remote_path: String,
        recursive: bool,
    },
    Rmdir {
        remote_path: String,
        recursive: bool,
    },
    List {
        remote_path: String,
        options: ListOptions,
    },
}

impl TaskArgs {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskArgs::Upload { .. } => TaskKind::Upload,
            TaskArgs::Download { .. } => TaskKind::Download,
            TaskArgs::Delete { .. } => TaskKind::Delete,
            TaskArgs::Rename { .. } => TaskKind::Rename,
            TaskArgs::Mkdir { .. } => TaskKind::Mkdir,
            TaskArgs::Rmdir { .. } => TaskKind::Rmdir,
            TaskArgs::List { .. } => TaskKind::List,
        }
    }
}

/// Per-kind result payload of a completed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TaskResult {
    Transfer {
        bytes: u64,
        md5: Option<String>,
        crc32: Option<u32>,
    },
    Listing {
        entries: Vec<FtpEntry>,
    },
    Path {
        path: String,
    },
    Unit,
}

/// Live transfer detail, present on UPLOAD/DOWNLOAD tasks while RUNNING or after completion.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransferDetail {
    pub transferred_bytes: u64,
    pub total_bytes: Option<u64>,
    pub speed_bps: u64,
    pub eta_seconds: Option<u32>,
}

/// Optional callbacks invoked by the worker that owns a task. Each is a plain capability:
/// absent means no-op, present means "call this, from the owning worker only".
#[derive(Clone, Default)]
pub struct TaskCallbacks {
    pub on_progress: Option<Arc<dyn Fn(&Task) + Send + Sync>>,
    pub on_complete: Option<Arc<dyn Fn(&Task) + Send + Sync>>,
    pub on_error: Option<Arc<dyn Fn(&Task) + Send + Sync>>,
}

impl fmt::Debug for TaskCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskCallbacks")
            .field("on_progress", &self.on_progress.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// A unit of work submitted to the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub args: TaskArgs,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub progress: u8,
    pub detail: Option<TransferDetail>,
    pub result: Option<TaskResult>,
    pub error: Option<FtpError>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub retry_delay_sec: u64,
    pub retry_backoff: f64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Monotonic sequence number used as the FIFO tie-break within a priority tier.
    pub sequence: u64,
    #[serde(skip)]
    pub callbacks: TaskCallbacks,
}

impl Task {
    pub fn new(
        args: TaskArgs,
        priority: TaskPriority,
        sequence: u64,
        max_retries: u32,
        retry_delay_sec: u64,
        retry_backoff: f64,
        callbacks: TaskCallbacks,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            args,
            priority,
            status: TaskStatus::Pending,
            progress: 0,
            detail: None,
            result: None,
            error: None,
            retry_count: 0,
            max_retries,
            retry_delay_sec,
            retry_backoff,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            sequence,
            callbacks,
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.args.kind()
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Seconds to wait before the next retry attempt, per the exponential backoff policy.
    pub fn next_retry_delay(&self) -> f64 {
        self.retry_delay_sec as f64 * self.retry_backoff.powi(self.retry_count as i32)
    }
}

// ─── Scheduler configuration ─────────────────────────────────────────

/// Construction-time configuration for the task scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub workers: usize,
    pub auto_retry: bool,
    pub default_max_retries: u32,
    pub default_retry_delay_sec: u64,
    pub default_retry_backoff: f64,
}

impl From<&FtpConnectionConfig> for SchedulerConfig {
    fn from(c: &FtpConnectionConfig) -> Self {
        Self {
            workers: c.max_concurrent_transfers.max(1),
            auto_retry: c.auto_retry,
            default_max_retries: c.max_retries,
            default_retry_delay_sec: c.retry_delay_sec,
            default_retry_backoff: c.retry_backoff,
        }
    }
}
