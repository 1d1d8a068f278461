//! In-memory implementation of [`WaitlistStore`].
//!
//! All state sits behind one `Mutex`, so every trait method runs as a single
//! critical section: the tier count and the write in `create_allocated` are
//! never interleaved with another allocation, and `atomic_adjust_many` is a
//! true read-modify-write under the lock.
//!
//! Not durable, and not shared between processes. Used by tests and by
//! deployments that do not need persistence.

use super::{sort_entries, Adjustment, CreateOutcome, Field, OrderBy, WaitlistStore};
use crate::entry::WaitlistEntry;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    /// Entries keyed by external id.
    entries: HashMap<String, WaitlistEntry>,
    /// Referral code -> external id.
    codes: HashMap<String, String>,
}

impl MemoryState {
    fn insert(&mut self, entry: WaitlistEntry) -> CreateOutcome {
        if let Some(existing) = self.entries.get(&entry.external_id) {
            return CreateOutcome::AlreadyExists(existing.clone());
        }
        if self.codes.contains_key(&entry.referral_code) {
            return CreateOutcome::CodeTaken;
        }
        self.codes
            .insert(entry.referral_code.clone(), entry.external_id.clone());
        self.entries.insert(entry.external_id.clone(), entry.clone());
        CreateOutcome::Created(entry)
    }
}

/// Mutex-guarded in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::StoreUnavailable("memory store lock poisoned".into()))
    }
}

impl WaitlistStore for MemoryStore {
    fn get_by_field(&self, field: Field, value: &str) -> Result<Option<WaitlistEntry>> {
        let state = self.lock()?;
        let found = match field {
            Field::ExternalId => state.entries.get(value).cloned(),
            Field::ReferralCode => state
                .codes
                .get(value)
                .and_then(|id| state.entries.get(id))
                .cloned(),
            Field::Tier => state
                .entries
                .values()
                .find(|e| field.matches(e, value))
                .cloned(),
        };
        Ok(found)
    }

    fn count_by_field(&self, field: Field, value: &str) -> Result<u64> {
        let state = self.lock()?;
        Ok(state.entries.values().filter(|e| field.matches(e, value)).count() as u64)
    }

    fn create_if_absent(&self, entry: WaitlistEntry) -> Result<CreateOutcome> {
        Ok(self.lock()?.insert(entry))
    }

    fn create_allocated(
        &self,
        mut entry: WaitlistEntry,
        allocate: &dyn Fn(u64) -> u32,
    ) -> Result<CreateOutcome> {
        let mut state = self.lock()?;
        let in_tier = state
            .entries
            .values()
            .filter(|e| e.tier == entry.tier)
            .count() as u64;
        entry.position = allocate(in_tier);
        Ok(state.insert(entry))
    }

    fn atomic_adjust_many(
        &self,
        external_id: &str,
        adjustments: &[Adjustment],
    ) -> Result<Vec<i64>> {
        let mut state = self.lock()?;
        let entry = state
            .entries
            .get_mut(external_id)
            .ok_or_else(|| Error::NotFound(format!("entry {}", external_id)))?;
        Ok(adjustments.iter().map(|a| a.apply(entry)).collect())
    }

    fn list_ordered_by(&self, order: OrderBy, ascending: bool) -> Result<Vec<WaitlistEntry>> {
        let mut entries: Vec<WaitlistEntry> = self.lock()?.entries.values().cloned().collect();
        sort_entries(&mut entries, order, ascending);
        Ok(entries)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Counter;
    use crate::tier::Tier;

    fn entry(id: &str, code: &str, tier: Tier) -> WaitlistEntry {
        WaitlistEntry::new(id.into(), id.into(), format!("{id}@example.com"), tier, code.into())
    }

    #[test]
    fn create_if_absent_is_idempotent_on_external_id() {
        let store = MemoryStore::new();
        let first = store.create_if_absent(entry("u1", "AAAAAA", Tier::Pro)).unwrap();
        assert!(matches!(first, CreateOutcome::Created(_)));

        let second = store.create_if_absent(entry("u1", "BBBBBB", Tier::Elite)).unwrap();
        match second {
            CreateOutcome::AlreadyExists(existing) => assert_eq!(existing.referral_code, "AAAAAA"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(store.count_by_field(Field::Tier, "pro").unwrap(), 1);
        assert_eq!(store.count_by_field(Field::Tier, "elite").unwrap(), 0);
    }

    #[test]
    fn duplicate_code_is_rejected() {
        let store = MemoryStore::new();
        store.create_if_absent(entry("u1", "AAAAAA", Tier::Pro)).unwrap();
        let outcome = store.create_if_absent(entry("u2", "AAAAAA", Tier::Pro)).unwrap();
        assert_eq!(outcome, CreateOutcome::CodeTaken);
        assert!(store.get_by_field(Field::ExternalId, "u2").unwrap().is_none());
    }

    #[test]
    fn lookup_by_code() {
        let store = MemoryStore::new();
        store.create_if_absent(entry("u1", "CODE01", Tier::Pro)).unwrap();
        let found = store.get_by_field(Field::ReferralCode, "CODE01").unwrap().unwrap();
        assert_eq!(found.external_id, "u1");
        assert!(store.get_by_field(Field::ReferralCode, "NOPE00").unwrap().is_none());
    }

    #[test]
    fn create_allocated_counts_only_same_tier() {
        let store = MemoryStore::new();
        store.create_if_absent(entry("e1", "E00001", Tier::Elite)).unwrap();
        let outcome = store
            .create_allocated(entry("p1", "P00001", Tier::Pro), &|n: u64| 501 + n as u32)
            .unwrap();
        match outcome {
            CreateOutcome::Created(e) => assert_eq!(e.position, 501),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn adjust_missing_entry_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .atomic_adjust("ghost", Counter::ReferralCount, 1, None)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn adjust_clamps_to_floor() {
        let store = MemoryStore::new();
        let mut e = entry("u1", "AAAAAA", Tier::Platinum);
        e.position = 4;
        store.create_if_absent(e).unwrap();
        assert_eq!(store.atomic_adjust("u1", Counter::Position, -10, Some(1)).unwrap(), 1);
        assert_eq!(store.atomic_adjust("u1", Counter::ReferralCount, 1, None).unwrap(), 1);
    }

    #[test]
    fn adjust_many_updates_both_counters_together() {
        let store = MemoryStore::new();
        let mut e = entry("u1", "AAAAAA", Tier::Pro);
        e.position = 512;
        store.create_if_absent(e).unwrap();
        let values = store
            .atomic_adjust_many(
                "u1",
                &[
                    Adjustment::new(Counter::ReferralCount, 1, None),
                    Adjustment::new(Counter::Position, -10, Some(1)),
                ],
            )
            .unwrap();
        assert_eq!(values, vec![1, 502]);
        let stored = store.get_by_field(Field::ExternalId, "u1").unwrap().unwrap();
        assert_eq!((stored.referral_count, stored.position), (1, 502));
    }
}
