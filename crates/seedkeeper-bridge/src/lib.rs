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

//! Execution bridge between async callers and blocking torrent backend clients.
//!
//! A [`BackendBridge`] owns one backend connection. Every call is shipped to a small
//! dedicated thread pool and runs with exclusive access to the connection handle, so
//! callers on the tokio runtime await results instead of blocking.

/// Async dispatcher implementing the backend capability trait.
pub mod bridge;
/// Bridge tunables.
pub mod config;
/// Lazily-established, mutually-exclusive connection handle.
pub mod guard;
/// In-process engine used for offline runs and as a reference backend.
pub mod memory;
mod metainfo;
/// Dedicated worker threads for blocking backend calls.
pub mod worker;

pub use bridge::BackendBridge;
pub use config::{BridgeConfig, ReconnectPolicy};
pub use guard::ConnectionGuard;
pub use memory::{MemoryClient, MemoryConnector};
pub use worker::{Pending, WorkerPool};
