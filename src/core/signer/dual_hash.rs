//! The dual-hash stage: one free fast hash and one exclusive slow hash per item.

use super::types::{DualHashResult, Item};
use crate::core::hasher::{call_checked, Hashers};
use crate::core::pipeline::CancellationToken;
use crate::core::stage::Stage;
use crate::error::HashError;
use std::thread;

/// Signs each item as `fast(item) + "~" + fast(slow(item))`.
///
/// Both halves run concurrently. The slow half goes through the pipeline's
/// exclusive token, so across every item of the run only one slow call is
/// ever in flight.
pub struct DualHashStage {
    hashers: Hashers,
}

impl DualHashStage {
    pub fn new(hashers: Hashers) -> Self {
        Self { hashers }
    }
}

impl Stage for DualHashStage {
    type Input = Item;
    type Output = DualHashResult;

    fn name(&self) -> &'static str {
        "dual-hash"
    }

    fn process(
        &self,
        item: &Item,
        cancel: &CancellationToken,
    ) -> Result<DualHashResult, HashError> {
        let data = item.to_string();
        let fast = self.hashers.fast.as_ref();
        let slow = &self.hashers.slow;

        let (direct, chained) = thread::scope(|scope| {
            let chained = scope.spawn(|| {
                let digest = slow.hash(&data, cancel)?;
                call_checked(fast, &digest, cancel)
            });
            let direct = call_checked(fast, &data, cancel);
            let chained = chained.join().unwrap_or_else(|_| {
                Err(HashError::Panicked {
                    primitive: slow.name(),
                    input: data.clone(),
                })
            });
            (direct, chained)
        });

        Ok(DualHashResult::new(format!("{}~{}", direct?, chained?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::HashPrimitive;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Looks inputs up in a fixed table.
    struct TableHasher {
        name: &'static str,
        table: HashMap<String, String>,
    }

    impl TableHasher {
        fn new(name: &'static str, pairs: &[(&str, &str)]) -> Self {
            Self {
                name,
                table: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    impl HashPrimitive for TableHasher {
        fn name(&self) -> &'static str {
            self.name
        }

        fn hash(&self, data: &str) -> Result<String, HashError> {
            self.table.get(data).cloned().ok_or_else(|| HashError::Failed {
                primitive: self.name,
                input: data.to_string(),
                reason: "not in table".to_string(),
            })
        }
    }

    #[test]
    fn combines_direct_and_chained_hashes() {
        let fast = TableHasher::new("fast", &[("0", "A0"), ("M0", "B0")]);
        let slow = TableHasher::new("slow", &[("0", "M0")]);
        let stage = DualHashStage::new(Hashers::new(Arc::new(fast), Arc::new(slow)));

        let result = stage.process(&0, &CancellationToken::new()).unwrap();
        assert_eq!(result.as_str(), "A0~B0");
    }

    #[test]
    fn uses_the_reference_primitives() {
        let stage = DualHashStage::new(Hashers::default());
        let result = stage.process(&0, &CancellationToken::new()).unwrap();
        assert_eq!(result.as_str(), "4108050209~502633748");
    }

    #[test]
    fn negative_items_use_their_decimal_form() {
        let fast = TableHasher::new("fast", &[("-5", "n"), ("m", "k")]);
        let slow = TableHasher::new("slow", &[("-5", "m")]);
        let stage = DualHashStage::new(Hashers::new(Arc::new(fast), Arc::new(slow)));

        let result = stage.process(&-5, &CancellationToken::new()).unwrap();
        assert_eq!(result.as_str(), "n~k");
    }

    #[test]
    fn slow_failure_fails_the_item() {
        let fast = TableHasher::new("fast", &[("1", "A1")]);
        let slow = TableHasher::new("slow", &[]);
        let stage = DualHashStage::new(Hashers::new(Arc::new(fast), Arc::new(slow)));

        let error = stage.process(&1, &CancellationToken::new()).unwrap_err();
        assert!(matches!(error, HashError::Failed { primitive: "slow", .. }));
    }

    #[test]
    fn cancelled_item_skips_the_slow_hash() {
        let hashers = Hashers::default();
        let stage = DualHashStage::new(hashers.clone());
        let token = CancellationToken::new();
        token.cancel();

        let error = stage.process(&3, &token).unwrap_err();

        assert!(matches!(error, HashError::Cancelled { .. }));
        assert_eq!(hashers.slow.stats().calls, 0);
    }
}
