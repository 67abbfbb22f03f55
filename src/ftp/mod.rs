//! # ftp — Comprehensive FTP/FTPS Client
//!
//! Full implementation of the FTP protocol (RFC 959) with extensions:
//! - **RFC 2228 / 4217** — AUTH TLS / FTPS (Explicit & Implicit)
//! - **RFC 3659** — Extensions: MLSD/MLST, SIZE, MDTM, REST STREAM
//! - **RFC 2389** — FEAT negotiation
//! - **RFC 2428** — EPSV / EPRT (IPv6-ready)
//!
//! Architecture, leaves first:
//! - `types` — all data structures, enums, config
//! - `error` — FTP-specific error type
//! - `utils` — rate limiting, checksums, size formatting, binary/text heuristic
//! - `protocol` — low-level command/response codec
//! - `connection` — TCP + TLS transport
//! - `parser` — Unix/Windows/MLSD LIST response parsing
//! - `tls` — TLS upgrade and FTPS configuration
//! - `transfer` — data channel management (PASV/EPSV/PORT/EPRT)
//! - `client` — stateful FTP client (login, CWD, TYPE, etc.)
//! - `directory` — directory listing, mkdir, rmdir, rename
//! - `file_ops` — upload, download, append, delete, resume
//! - `pool` — connection pool with idle reaping
//! - `queue` — priority task scheduler with concurrency, retry, progress
//! - `service` — the `Ftp` façade (owns the pool and scheduler)

pub mod types;
pub mod error;
pub mod utils;
pub mod protocol;
pub mod connection;
pub mod parser;
pub mod tls;
pub mod transfer;
pub mod client;
pub mod directory;
pub mod file_ops;
pub mod pool;
pub mod queue;
pub mod service;

pub use client::FtpClient;
pub use error::{FtpError, FtpErrorKind, FtpResult};
pub use pool::{spawn_pool_validator, FtpPool};
pub use queue::{Scheduler, Task, TaskCallbacks, TaskKind, TaskPriority, TaskStatus};
pub use service::Ftp;
pub use types::*;
