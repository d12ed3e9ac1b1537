//! Concrete hash primitives.
//!
//! Each primitive can carry a simulated latency so the pipeline can be
//! exercised against a slow external service without one.

use super::traits::HashPrimitive;
use crate::error::HashError;
use md5::{Digest, Md5};
use std::thread;
use std::time::Duration;
use xxhash_rust::xxh3::xxh3_64;

fn pause(latency: Duration) {
    if !latency.is_zero() {
        thread::sleep(latency);
    }
}

/// IEEE CRC-32 as unsigned decimal
#[derive(Debug, Clone, Default)]
pub struct Crc32Hasher {
    latency: Duration,
}

impl Crc32Hasher {
    /// Create a CRC-32 hasher with no added latency
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `latency` on every call
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

impl HashPrimitive for Crc32Hasher {
    fn name(&self) -> &'static str {
        "crc32"
    }

    fn hash(&self, data: &str) -> Result<String, HashError> {
        pause(self.latency);
        Ok(crc32fast::hash(data.as_bytes()).to_string())
    }
}

/// xxh3-64 as unsigned decimal
#[derive(Debug, Clone, Default)]
pub struct Xxh3Hasher {
    latency: Duration,
}

impl Xxh3Hasher {
    /// Create an xxh3 hasher with no added latency
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `latency` on every call
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

impl HashPrimitive for Xxh3Hasher {
    fn name(&self) -> &'static str {
        "xxh3"
    }

    fn hash(&self, data: &str) -> Result<String, HashError> {
        pause(self.latency);
        Ok(xxh3_64(data.as_bytes()).to_string())
    }
}

/// MD5 as lowercase hex
#[derive(Debug, Clone, Default)]
pub struct Md5Hasher {
    latency: Duration,
}

impl Md5Hasher {
    /// Create an MD5 hasher with no added latency
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `latency` on every call
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

impl HashPrimitive for Md5Hasher {
    fn name(&self) -> &'static str {
        "md5"
    }

    fn hash(&self, data: &str) -> Result<String, HashError> {
        pause(self.latency);
        Ok(format!("{:x}", Md5::digest(data.as_bytes())))
    }
}
