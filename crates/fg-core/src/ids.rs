use core::fmt;
use core::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{CoreError, CoreResult};

/// Compact, stable identifier for every entity in a graph tree.
///
/// - `u32` keeps memory small
/// - `NonZero` enables `Option<Id>` to be pointer-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    /// Create an Id from a 0-based index by storing index+1.
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index))
    }

    /// Recover the 0-based index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Id {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.index())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Id {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let index = <u32 as serde::Deserialize>::deserialize(deserializer)?;
        if index == u32::MAX {
            return Err(serde::de::Error::custom("id index out of range"));
        }
        Ok(Id::from_index(index))
    }
}

/// Id of a node, edge, controller or sub-graph (no runtime cost).
pub type ComponentId = Id;

/// Monotonically increasing id source, shared by every graph in a tree.
///
/// Allocation is lock-free and safe to call from several threads.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: AtomicU32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator whose first id has the given index.
    pub fn starting_at(next: u32) -> Self {
        Self {
            next: AtomicU32::new(next),
        }
    }

    pub fn allocate(&self) -> CoreResult<Id> {
        let index = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                n.checked_add(1).filter(|&next| next < u32::MAX)
            })
            .map_err(|_| CoreError::IdsExhausted)?;
        Ok(Id::from_index(index))
    }

    /// Index the next allocation will receive.
    pub fn peek(&self) -> u32 {
        self.next.load(Ordering::Relaxed)
    }

    /// Make sure later allocations never hand out `id` or anything below it.
    pub fn reserve_through(&self, id: Id) {
        self.next
            .fetch_max(id.index().saturating_add(1), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn id_round_trip_index() {
        for i in [0_u32, 1, 2, 42, 10_000] {
            let id = Id::from_index(i);
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn option_id_is_small() {
        assert_eq!(
            core::mem::size_of::<Id>(),
            core::mem::size_of::<Option<Id>>()
        );
    }

    #[test]
    fn allocator_is_monotonic() {
        let ids = IdAllocator::new();
        let a = ids.allocate().unwrap();
        let b = ids.allocate().unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert!(a < b);
        assert_eq!(ids.peek(), 2);
    }

    #[test]
    fn allocator_reserve_skips_restored_ids() {
        let ids = IdAllocator::new();
        ids.reserve_through(Id::from_index(9));
        assert_eq!(ids.allocate().unwrap().index(), 10);

        // Reserving below the counter is a no-op.
        ids.reserve_through(Id::from_index(3));
        assert_eq!(ids.allocate().unwrap().index(), 11);
    }

    #[test]
    fn allocator_reports_exhaustion() {
        let ids = IdAllocator::starting_at(u32::MAX - 2);
        assert!(ids.allocate().is_ok());
        assert!(matches!(ids.allocate(), Err(CoreError::IdsExhausted)));
    }

    #[test]
    fn allocator_is_unique_across_threads() {
        let ids = IdAllocator::new();
        let all: Vec<Id> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| (0..250).map(|_| ids.allocate().unwrap()).collect::<Vec<_>>())
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });
        let unique: BTreeSet<Id> = all.iter().copied().collect();
        assert_eq!(unique.len(), 1000);
    }
}
