//! Position allocation inside a tier band.
//!
//! The k-th signup into a tier (0-indexed `n` existing entries) lands at
//! `start + n`, clamped to the band's `max`. Once a band saturates, every
//! further entrant shares `max`.
//!
//! The count and the write must not interleave with another allocation in the
//! same tier, so the allocator never reads-then-writes itself: it hands its
//! formula to [`WaitlistStore::create_allocated`], which runs both steps in a
//! tier-scoped transaction.

use crate::entry::WaitlistEntry;
use crate::error::Result;
use crate::store::{CreateOutcome, WaitlistStore};
use crate::tier::{Tier, TierRangeTable};
use std::cell::Cell;

/// Computes positions from a [`TierRangeTable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionAllocator {
    table: TierRangeTable,
}

impl PositionAllocator {
    pub fn new(table: TierRangeTable) -> Self {
        Self { table }
    }

    /// Position for an entrant that finds `existing` entries already in `tier`.
    pub fn position_for(&self, tier: Tier, existing: u64) -> u32 {
        let band = self.table.band(tier);
        let candidate = u64::from(band.start).saturating_add(existing);
        candidate.min(u64::from(band.max)) as u32
    }

    /// Assign a position to `entry` and persist it atomically.
    pub fn allocate(
        &self,
        store: &dyn WaitlistStore,
        entry: WaitlistEntry,
    ) -> Result<CreateOutcome> {
        let tier = entry.tier;
        let seen = Cell::new(0);
        let outcome = store.create_allocated(entry, &|existing: u64| {
            seen.set(existing);
            self.position_for(tier, existing)
        })?;
        if let CreateOutcome::Created(ref created) = outcome {
            let band = self.table.band(tier);
            if band.is_saturated(seen.get()) {
                tracing::debug!(
                    %tier,
                    position = created.position,
                    in_tier = seen.get(),
                    "tier band saturated, clamped to max"
                );
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::tier::TierBand;

    fn entry(id: &str, tier: Tier) -> WaitlistEntry {
        WaitlistEntry::new(
            id.into(),
            id.into(),
            format!("{id}@example.com"),
            tier,
            format!("C{id:0>5}"),
        )
    }

    fn created(outcome: CreateOutcome) -> WaitlistEntry {
        match outcome {
            CreateOutcome::Created(e) => e,
            other => panic!("expected Created, got {other:?}"),
        }
    }

    #[test]
    fn position_formula() {
        let allocator = PositionAllocator::default();
        assert_eq!(allocator.position_for(Tier::Pro, 0), 501);
        assert_eq!(allocator.position_for(Tier::Pro, 1), 502);
        assert_eq!(allocator.position_for(Tier::Pro, 1499), 2000);
        assert_eq!(allocator.position_for(Tier::Pro, 1500), 2000);
        assert_eq!(allocator.position_for(Tier::Platinum, u64::MAX), 100);
    }

    #[test]
    fn sequential_signups_fill_band_in_order() {
        let store = MemoryStore::new();
        let allocator = PositionAllocator::default();
        let first = created(allocator.allocate(&store, entry("1", Tier::Pro)).unwrap());
        let second = created(allocator.allocate(&store, entry("2", Tier::Pro)).unwrap());
        assert_eq!(first.position, 501);
        assert_eq!(second.position, 502);
    }

    #[test]
    fn tiers_allocate_independently() {
        let store = MemoryStore::new();
        let allocator = PositionAllocator::default();
        created(allocator.allocate(&store, entry("1", Tier::Pro)).unwrap());
        let platinum = created(allocator.allocate(&store, entry("2", Tier::Platinum)).unwrap());
        let elite = created(allocator.allocate(&store, entry("3", Tier::Elite)).unwrap());
        assert_eq!(platinum.position, 1);
        assert_eq!(elite.position, 101);
    }

    #[test]
    fn saturated_band_clamps_to_max() {
        let tiny = TierRangeTable::new(
            TierBand::new(1, 3),
            TierBand::new(4, 10),
            TierBand::new(11, 20),
            TierBand::new(21, 100),
        );
        let store = MemoryStore::new();
        let allocator = PositionAllocator::new(tiny);
        let positions: Vec<u32> = (0..6)
            .map(|i| {
                created(allocator.allocate(&store, entry(&i.to_string(), Tier::Platinum)).unwrap())
                    .position
            })
            .collect();
        assert_eq!(positions, vec![1, 2, 3, 3, 3, 3]);
        assert!(positions.iter().all(|p| tiny.band(Tier::Platinum).contains(*p)));
    }
}
