//! Proptest strategies.

use gauntlet_core::constants::ExecutionStatus;
use proptest::prelude::*;

pub fn execution_status_strategy() -> impl Strategy<Value = ExecutionStatus> {
    prop_oneof![
        Just(ExecutionStatus::Passed),
        Just(ExecutionStatus::Failed),
        Just(ExecutionStatus::Skipped),
        Just(ExecutionStatus::Error),
    ]
}

/// Batches of 0..40 unit outcomes
pub fn status_batch_strategy() -> impl Strategy<Value = Vec<ExecutionStatus>> {
    prop::collection::vec(execution_status_strategy(), 0..40)
}

/// Cleanup priorities, duplicates included
pub fn priorities_strategy() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(-5i32..15, 0..30)
}

pub fn concurrency_strategy() -> impl Strategy<Value = usize> {
    1usize..8
}
