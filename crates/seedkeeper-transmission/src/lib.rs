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

//! Transmission JSON-RPC adapter for the execution bridge.

/// Blocking RPC session and connector.
pub mod client;
/// Adapter tunables.
pub mod config;
/// Adapter-level failure details.
pub mod error;
mod rpc;

pub use client::{TransmissionClient, TransmissionConnector};
pub use config::TransmissionConfig;
pub use error::RpcFailure;
