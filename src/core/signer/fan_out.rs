//! The fan-out stage: six indexed fast hashes per value, reassembled by index.

use super::types::{DualHashResult, FanOutResult};
use crate::core::hasher::{call_checked, HashPrimitive};
use crate::core::pipeline::CancellationToken;
use crate::core::stage::Stage;
use crate::error::HashError;
use std::sync::Arc;
use std::thread;

/// Number of indexed sub-hashes per value
pub const FAN_OUT_WIDTH: usize = 6;

/// Signs each value `v` as `fast("0" + v) + fast("1" + v) + ... + fast("5" + v)`.
///
/// The sub-hashes run concurrently and may finish in any order; they are
/// joined strictly by index.
pub struct FanOutStage {
    fast: Arc<dyn HashPrimitive>,
}

impl FanOutStage {
    pub fn new(fast: Arc<dyn HashPrimitive>) -> Self {
        Self { fast }
    }
}

impl Stage for FanOutStage {
    type Input = DualHashResult;
    type Output = FanOutResult;

    fn name(&self) -> &'static str {
        "fan-out"
    }

    fn process(
        &self,
        input: &DualHashResult,
        cancel: &CancellationToken,
    ) -> Result<FanOutResult, HashError> {
        let fast = self.fast.as_ref();
        let value = input.as_str();

        let parts: Vec<Result<String, HashError>> = thread::scope(|scope| {
            let branches: Vec<_> = (0..FAN_OUT_WIDTH)
                .map(|index| {
                    scope.spawn(move || call_checked(fast, &format!("{index}{value}"), cancel))
                })
                .collect();

            branches
                .into_iter()
                .map(|branch| {
                    branch.join().unwrap_or_else(|_| {
                        Err(HashError::Panicked {
                            primitive: fast.name(),
                            input: value.to_string(),
                        })
                    })
                })
                .collect()
        });

        parts
            .into_iter()
            .collect::<Result<String, HashError>>()
            .map(FanOutResult::new)
    }
}
