//! # Hash Signer
//!
//! Signs a batch of integers into one deterministic digest using a
//! bounded, multi-stage concurrent pipeline.
//!
//! ## Guarantees
//! - **Deterministic** - the digest depends only on the items, never on
//!   thread scheduling or queue capacity
//! - **Exclusive slow hash** - at most one slow-hash call is in flight per
//!   pipeline, however many items run at once
//! - **Nothing vanishes** - a failed item fails the run with the reason,
//!   it is never silently dropped
//!
//! ## Architecture
//! - `core` - The pipeline engine (GUI-agnostic)
//! - `events` - Event-driven progress reporting
//! - `error` - Error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Result, SignerError};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. Filtering follows
/// `RUST_LOG`.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
