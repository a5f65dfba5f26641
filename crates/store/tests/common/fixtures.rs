//! Test data builders.

use chaincache_core::{StateValue, U256};

/// Protocol identifier used across tests.
#[allow(dead_code)]
pub const FORK_A: &str = "fork-a";

/// A second protocol for isolation tests.
#[allow(dead_code)]
pub const FORK_B: &str = "fork-b";

/// A historical event record carrying wide integers.
#[allow(dead_code)]
pub fn event(seq: u64) -> StateValue {
    StateValue::from_iter([
        ("seq", StateValue::from(seq)),
        ("block", StateValue::from(18_000_000 + seq)),
        (
            "amount",
            StateValue::Wide(U256::from(seq) * U256::from(10u64).pow(U256::from(24u64))),
        ),
    ])
}

/// `count` consecutive events starting at sequence `first`.
#[allow(dead_code)]
pub fn events(first: u64, count: u64) -> Vec<StateValue> {
    (first..first + count).map(event).collect()
}

/// Plain numbers as cached values.
#[allow(dead_code)]
pub fn numbers(values: &[u64]) -> Vec<StateValue> {
    values.iter().copied().map(StateValue::from).collect()
}
