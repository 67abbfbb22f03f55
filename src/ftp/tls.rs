//! TLS helpers for Explicit and Implicit FTPS (RFC 4217).
//!
//! - Builds a `tokio_native_tls::TlsConnector` per the configured verification policy.
//! - Provides `upgrade_to_tls` for wrapping an existing plain codec.

use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::protocol::{FtpCodec, ReadHalf, WriteHalf};
use crate::ftp::types::TlsVerifyPolicy;
use tokio::net::TcpStream;
use tokio_native_tls::TlsConnector;

/// Build a `TlsConnector` for the given verification policy.
pub fn build_tls_connector(policy: TlsVerifyPolicy) -> FtpResult<TlsConnector> {
    let mut builder = native_tls::TlsConnector::builder();
    match policy {
        TlsVerifyPolicy::VerifyFull => {}
        TlsVerifyPolicy::VerifyPeerOnly => {
            builder.danger_accept_invalid_hostnames(true);
        }
        TlsVerifyPolicy::NoVerify => {
            log::warn!("TLS certificate verification disabled for this session");
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
    }
    let connector = builder.build()?;
    Ok(TlsConnector::from(connector))
}

/// Upgrade an existing **plain** control connection to TLS.
///
/// Called after successful `AUTH TLS` + 234 reply.
/// Consumes the plain codec, performs the TLS handshake, returns a new codec.
pub async fn upgrade_to_tls(
    codec: FtpCodec,
    host: &str,
    policy: TlsVerifyPolicy,
) -> FtpResult<FtpCodec> {
    // Re-assemble the owned TcpStream from the split halves.
    let tcp = reunite_plain(codec)?;

    let connector = build_tls_connector(policy)?;
    let tls = connector
        .connect(host, tcp)
        .await
        .map_err(|e| FtpError::tls_failed(format!("Explicit TLS handshake: {}", e)))?;

    Ok(FtpCodec::from_tls(tls))
}

/// Reunite the read + write halves back into a `TcpStream`.
/// Only works when both halves are `Plain`.
fn reunite_plain(codec: FtpCodec) -> FtpResult<TcpStream> {
    let rd = match codec.reader {
        ReadHalf::Plain(br) => br.into_inner(),
        ReadHalf::Tls(_) => {
            return Err(FtpError::protocol_error(
                "Cannot upgrade: connection is already TLS",
            ))
        }
    };
    let wr = match codec.writer {
        WriteHalf::Plain(w) => w,
        WriteHalf::Tls(_) => {
            return Err(FtpError::protocol_error(
                "Cannot upgrade: connection is already TLS",
            ))
        }
    };
    rd.reunite(wr)
        .map_err(|e| FtpError::protocol_error(format!("Reunite failed: {}", e)))
}

/// Create a TLS-wrapped data channel for FTPS.
pub async fn wrap_data_stream(
    tcp: TcpStream,
    host: &str,
    policy: TlsVerifyPolicy,
) -> FtpResult<tokio_native_tls::TlsStream<TcpStream>> {
    let connector = build_tls_connector(policy)?;
    connector
        .connect(host, tcp)
        .await
        .map_err(|e| FtpError::tls_failed(format!("Data channel TLS: {}", e)))
}
