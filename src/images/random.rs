/// Source of uniform random indices used for page and picture sampling.
///
/// Passed to every component that samples so tests can substitute a
/// deterministic sequence.
pub trait RandomSource: Send + Sync {
    /// Return a value in `0..upper`. Callers never pass `upper == 0`.
    fn below(&self, upper: usize) -> usize;

    /// Return a value in `0..=max`.
    fn up_to(&self, max: usize) -> usize {
        self.below(max.saturating_add(1))
    }
}

/// Process-wide thread-local generator, seeded from the OS.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn below(&self, upper: usize) -> usize {
        if upper <= 1 {
            return 0;
        }
        rand::random_range(0..upper)
    }
}

/// Pick one element uniformly at random, `None` for an empty slice.
pub fn choose<'a, T>(rng: &dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.below(items.len()))
}
