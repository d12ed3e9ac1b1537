//! Trait definitions for hash primitives.

use crate::core::pipeline::CancellationToken;
use crate::error::HashError;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};

/// A pure, deterministic string-to-string hash function.
///
/// Implementations must be safe to call from many threads at once; any
/// exclusivity policy is layered on top by [`super::ExclusiveHasher`].
pub trait HashPrimitive: Send + Sync {
    /// Short name used in errors and logs
    fn name(&self) -> &'static str;

    /// Hash `data` into its string form
    fn hash(&self, data: &str) -> Result<String, HashError>;
}

/// Available primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashPrimitiveKind {
    /// IEEE CRC-32, rendered as unsigned decimal
    Crc32,
    /// xxh3-64, rendered as unsigned decimal
    Xxh3,
    /// MD5, rendered as lowercase hex
    Md5,
}

impl HashPrimitiveKind {
    /// Get a human-readable description of the primitive
    pub fn description(&self) -> &'static str {
        match self {
            HashPrimitiveKind::Crc32 => "CRC-32 (IEEE) - decimal checksum of the input bytes",
            HashPrimitiveKind::Xxh3 => "xxh3-64 - decimal non-cryptographic hash, very fast",
            HashPrimitiveKind::Md5 => "MD5 - 128-bit digest in lowercase hex",
        }
    }
}

impl std::fmt::Display for HashPrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashPrimitiveKind::Crc32 => write!(f, "crc32"),
            HashPrimitiveKind::Xxh3 => write!(f, "xxh3"),
            HashPrimitiveKind::Md5 => write!(f, "md5"),
        }
    }
}

/// Call a primitive, turning a panic into [`HashError::Panicked`].
pub fn call_guarded(primitive: &dyn HashPrimitive, data: &str) -> Result<String, HashError> {
    match panic::catch_unwind(AssertUnwindSafe(|| primitive.hash(data))) {
        Ok(result) => result,
        Err(_) => Err(HashError::Panicked {
            primitive: primitive.name(),
            input: data.to_string(),
        }),
    }
}

/// [`call_guarded`], unless `token` is already cancelled.
pub fn call_checked(
    primitive: &dyn HashPrimitive,
    data: &str,
    token: &CancellationToken,
) -> Result<String, HashError> {
    if token.is_cancelled() {
        return Err(HashError::Cancelled {
            primitive: primitive.name(),
            input: data.to_string(),
        });
    }
    call_guarded(primitive, data)
}
