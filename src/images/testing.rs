//! Deterministic stand-ins for the random source, for tests that need to
//! script which page or picture gets drawn.

use super::random::RandomSource;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Replays a fixed list of values, each reduced modulo the requested bound.
/// Once exhausted it keeps returning `0`.
#[derive(Debug, Default)]
pub struct FixedSequence {
    values: Mutex<VecDeque<usize>>,
    draws: Mutex<Vec<usize>>,
}

impl FixedSequence {
    pub fn new(values: impl IntoIterator<Item = usize>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
            draws: Mutex::new(Vec::new()),
        }
    }

    /// Bounds requested so far, in call order.
    pub fn draws(&self) -> Vec<usize> {
        self.draws.lock().clone()
    }
}

impl RandomSource for FixedSequence {
    fn below(&self, upper: usize) -> usize {
        self.draws.lock().push(upper);
        let next = self.values.lock().pop_front().unwrap_or(0);
        if upper == 0 {
            0
        } else {
            next % upper
        }
    }
}
