//! # Hasher Module
//!
//! The two hash primitives the signer is built from.
//!
//! ## Roles
//! - **Fast hash** - freely concurrent, called many times per item
//! - **Slow hash** - a scarce resource; reached only through an
//!   [`ExclusiveHasher`] so at most one call is ever in flight
//!
//! ## Example
//! ```rust,ignore
//! use hash_signer::core::hasher::{HasherConfig, HashPrimitiveKind};
//!
//! let hashers = HasherConfig::new()
//!     .fast(HashPrimitiveKind::Crc32)
//!     .slow_latency(Duration::from_millis(10))
//!     .build();
//!
//! let signature = hashers.fast.hash("0")?;
//! ```

mod exclusive;
mod primitives;
mod traits;

pub use exclusive::{ExclusiveHasher, ExclusiveStats};
pub use primitives::{Crc32Hasher, Md5Hasher, Xxh3Hasher};
pub use traits::{call_checked, call_guarded, HashPrimitive, HashPrimitiveKind};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Configuration builder for the hash primitives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasherConfig {
    /// Primitive used as the fast hash
    fast: HashPrimitiveKind,
    /// Primitive used as the slow, exclusive hash
    slow: HashPrimitiveKind,
    /// Simulated latency per fast call
    fast_latency: Duration,
    /// Simulated latency per slow call
    slow_latency: Duration,
}

impl HasherConfig {
    /// CRC-32 fast hash, MD5 slow hash, no simulated latency
    pub fn new() -> Self {
        Self {
            fast: HashPrimitiveKind::Crc32,
            slow: HashPrimitiveKind::Md5,
            fast_latency: Duration::ZERO,
            slow_latency: Duration::ZERO,
        }
    }

    /// Set the fast primitive
    pub fn fast(mut self, kind: HashPrimitiveKind) -> Self {
        self.fast = kind;
        self
    }

    /// Set the slow primitive
    pub fn slow(mut self, kind: HashPrimitiveKind) -> Self {
        self.slow = kind;
        self
    }

    /// Add a delay to every fast call
    pub fn fast_latency(mut self, latency: Duration) -> Self {
        self.fast_latency = latency;
        self
    }

    /// Add a delay to every slow call
    pub fn slow_latency(mut self, latency: Duration) -> Self {
        self.slow_latency = latency;
        self
    }

    /// The fast primitive
    pub fn fast_kind(&self) -> HashPrimitiveKind {
        self.fast
    }

    /// The slow primitive
    pub fn slow_kind(&self) -> HashPrimitiveKind {
        self.slow
    }

    /// Build the primitives. The slow one is wrapped in a fresh token.
    pub fn build(&self) -> Hashers {
        Hashers::new(
            primitive(self.fast, self.fast_latency),
            primitive(self.slow, self.slow_latency),
        )
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn primitive(kind: HashPrimitiveKind, latency: Duration) -> Arc<dyn HashPrimitive> {
    match kind {
        HashPrimitiveKind::Crc32 => Arc::new(Crc32Hasher::with_latency(latency)),
        HashPrimitiveKind::Xxh3 => Arc::new(Xxh3Hasher::with_latency(latency)),
        HashPrimitiveKind::Md5 => Arc::new(Md5Hasher::with_latency(latency)),
    }
}

/// The primitive pair one pipeline instance signs with
#[derive(Clone)]
pub struct Hashers {
    /// Freely concurrent hash
    pub fast: Arc<dyn HashPrimitive>,
    /// Exclusive-access token for the slow hash
    pub slow: Arc<ExclusiveHasher>,
}

impl Hashers {
    /// Pair arbitrary primitives; `slow` gets its own exclusivity token
    pub fn new(fast: Arc<dyn HashPrimitive>, slow: Arc<dyn HashPrimitive>) -> Self {
        Self {
            fast,
            slow: Arc::new(ExclusiveHasher::new(slow)),
        }
    }
}

impl Default for Hashers {
    fn default() -> Self {
        HasherConfig::new().build()
    }
}

impl std::fmt::Debug for Hashers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hashers")
            .field("fast", &self.fast.name())
            .field("slow", &self.slow)
            .finish()
    }
}
