//! The monotone pass counter identifying "which stabilization was this."
//!
//! Every node field that tracks `recomputed_at`/`changed_at`/`set_at` or a
//! "none" sentinel is this type. `Option<NonZeroU64>`'s niche keeps
//! `StabilizationNum` the same size as a bare `u64` while still making
//! "none" a real, unrepresentable-as-a-pass value rather than a magic
//! constant like `0` or `u64::MAX` that callers could accidentally compare
//! against.

use std::num::NonZeroU64;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct StabilizationNum(Option<NonZeroU64>);

impl StabilizationNum {
    pub const NONE: StabilizationNum = StabilizationNum(None);

    /// The stabilization number of the first-ever pass. The engine calls
    /// this once, at startup, to seed its own counter.
    pub fn first() -> StabilizationNum {
        StabilizationNum(NonZeroU64::new(1))
    }

    pub fn is_none(self) -> bool {
        self.0.is_none()
    }

    /// The stabilization number of the pass after this one. The engine
    /// calls this at the start of each `stabilize`.
    pub fn next(self) -> StabilizationNum {
        let n = match self.0 {
            None => 1,
            Some(n) => u64::from(n).wrapping_add(1),
        };
        StabilizationNum(NonZeroU64::new(n))
    }
}

impl Default for StabilizationNum {
    fn default() -> Self {
        StabilizationNum::NONE
    }
}

impl std::fmt::Display for StabilizationNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(n) => write!(f, "{n}"),
            None => write!(f, "none"),
        }
    }
}
