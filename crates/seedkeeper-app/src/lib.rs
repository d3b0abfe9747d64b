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

//! Seedkeeper application wiring.
//!
//! Layout: `config.rs` (settings model), `registry.rs` (named backends),
//! `bootstrap.rs` (startup sequence).

/// Startup sequence.
pub mod bootstrap;
/// Configuration model and validation.
pub mod config;
/// Application error types.
pub mod error;
/// Named backend registry.
pub mod registry;

pub use bootstrap::{init_logging, start};
pub use config::{AppConfig, BackendConfig, BackendKind};
pub use error::{AppError, AppResult, BackendFailure};
pub use registry::BackendRegistry;
