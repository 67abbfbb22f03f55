//! # ftpq — concurrent FTP/FTPS client
//!
//! A protocol engine (RFC 959 plus RFC 2228/4217 TLS, RFC 2389 FEAT, RFC 3659
//! MLSD/MLST/SIZE/MDTM, RFC 2428 EPSV/EPRT) wrapped in a bounded session pool and a
//! priority task queue so callers submit uploads, downloads, and directory operations
//! without managing control connections themselves.
//!
//! ```ignore
//! use ftpq::{Ftp, FtpConnectionConfig, TaskPriority};
//!
//! let ftp = Ftp::connect(FtpConnectionConfig::default()).await?;
//! let id = ftp.download("/remote/report.csv", "report.csv", TaskPriority::Normal, None).await?;
//! ftp.wait_for_task(&id, None).await;
//! ```

pub mod ftp;

pub use ftp::client::FtpClient;
pub use ftp::error::{FtpError, FtpErrorKind, FtpResult};
pub use ftp::pool::{FtpPool, PoolStats};
pub use ftp::queue::{Scheduler, Task, TaskCallbacks, TaskKind, TaskPriority, TaskStatus};
pub use ftp::service::Ftp;
pub use ftp::types::*;
