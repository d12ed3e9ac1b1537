//! Values that flow through the signer stages.

use serde::{Deserialize, Serialize};

/// An input value. It is hashed in its decimal form.
pub type Item = i64;

/// `fast(item) + "~" + fast(slow(item))`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DualHashResult(String);

/// Six indexed fast hashes of a [`DualHashResult`], concatenated by index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FanOutResult(String);

/// Every [`FanOutResult`] of a run, sorted and joined with `_`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinalDigest(String);

macro_rules! string_value {
    ($($name:ident),*) => {$(
        impl $name {
            /// Wrap an already computed value
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the string form
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Take the string form
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    )*};
}

string_value!(DualHashResult, FanOutResult, FinalDigest);

impl FinalDigest {
    /// Number of per-item signatures joined into this digest
    pub fn parts(&self) -> usize {
        if self.0.is_empty() {
            0
        } else {
            self.0.split('_').count()
        }
    }
}
