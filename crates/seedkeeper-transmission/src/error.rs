//! # Design
//!
//! - Failures detected by the adapter itself, carried as sources of `ClientError`.
//! - Keep error messages constant; store operational context in fields.

use thiserror::Error;

/// Adapter-side failure talking to the RPC endpoint.
#[derive(Debug, Error)]
pub enum RpcFailure {
    /// The daemon answered with an HTTP status other than success or handshake.
    #[error("unexpected rpc http status")]
    HttpStatus {
        /// RPC method being called.
        method: &'static str,
        /// Status code returned.
        status: u16,
    },
    /// The daemon kept demanding a new session id.
    #[error("rpc session handshake failed")]
    SessionHandshake {
        /// RPC method being called.
        method: &'static str,
    },
    /// A response omitted data the method must return.
    #[error("rpc response missing field")]
    MissingField {
        /// RPC method being called.
        method: &'static str,
        /// Field that was absent.
        field: &'static str,
    },
    /// A torrent reported a status code outside the documented range.
    #[error("unknown torrent status")]
    UnknownStatus {
        /// Raw status value.
        status: i64,
    },
}
