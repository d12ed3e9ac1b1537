//! # hash-signer CLI
//!
//! Command-line interface for the hash signer.
//!
//! ## Usage
//! ```bash
//! hash-signer sign 0 1 1 2 3 5 8
//! hash-signer sign --range 0..100 --capacity 1 --output json
//! ```

mod cli;

use hash_signer::Result;

fn main() -> Result<()> {
    hash_signer::init_tracing();
    cli::run()
}
