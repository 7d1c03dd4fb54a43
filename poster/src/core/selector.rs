//! Non-repeating random candidate selection

use std::collections::{BTreeSet, HashSet};

use rand::Rng;
use shared::ImageId;

/// Outcome of a selection over a candidate pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Picked(ImageId),
    /// Every candidate is in the exclusion set (or the pool is empty)
    Exhausted,
}

impl Selection {
    pub fn picked(self) -> Option<ImageId> {
        match self {
            Selection::Picked(id) => Some(id),
            Selection::Exhausted => None,
        }
    }
}

/// Candidates not in the exclusion set, deduplicated and in a stable order
pub fn eligible(pool: &[ImageId], excluded: &HashSet<ImageId>) -> Vec<ImageId> {
    pool.iter()
        .filter(|id| !excluded.contains(*id))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Pick one eligible candidate uniformly at random
///
/// The stable ordering of `eligible` means a seeded `rng` gives reproducible picks.
pub fn select<R>(pool: &[ImageId], excluded: &HashSet<ImageId>, rng: &mut R) -> Selection
where
    R: Rng + ?Sized,
{
    let candidates = eligible(pool, excluded);
    if candidates.is_empty() {
        return Selection::Exhausted;
    }

    let index = rng.gen_range(0..candidates.len());
    Selection::Picked(candidates[index].clone())
}
