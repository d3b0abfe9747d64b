#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Backend-agnostic torrent interfaces and DTOs.
//!
//! Layout: `model` (snapshots, requests, endpoints, deadlines), `error`
//! (client and bridge error taxonomy), `client` (blocking adapter surface
//! implemented per backend kind), `service` (async capability trait callers
//! depend on).

pub mod client;
pub mod error;
pub mod model;
pub mod service;

pub use client::{BackendClient, Connector};
pub use error::{BoxError, BridgeError, BridgeResult, ClientError, ClientResult, DispatchFailure};
pub use model::{
    AddTorrent, AddedTorrent, BackendEndpoint, Deadline, ListenEndpoint, SessionStats, TorrentId,
    TorrentSnapshot, TorrentState, TransferTotals,
};
pub use service::TorrentBackend;
