//! Stock Signals - Windowed Signal Detection Pipeline
//!
//! Detects trailing-window buy/sell events over daily equity bars, keeps the
//! derived signal table idempotently synchronized with the source bars, and
//! aggregates per-security return rates into ranked reports.
//!
//! The crate exposes plain payload structs; HTTP routing, serialization and
//! hosting are left to the embedding application.

pub mod config;
pub mod db;
pub mod error;
pub mod services;
pub mod signal;
pub mod state;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging for hosting binaries.
///
/// Honors `RUST_LOG`; defaults to debug output for this crate.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stock_signals=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
