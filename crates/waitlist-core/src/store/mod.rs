//! Persistence contract for the waitlist.
//!
//! Every method is a single store-level operation. Implementations must make
//! each one atomic with respect to concurrent callers, including callers in
//! other processes when the backend is shared. The service holds no counters
//! of its own; all sequencing lives behind this trait.

use crate::entry::WaitlistEntry;
use crate::error::{Error, Result};
use crate::tier::Tier;

pub mod memory;

pub use memory::MemoryStore;

/// Fields that can be used for equality lookups and counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ExternalId,
    ReferralCode,
    Tier,
}

impl Field {
    /// Whether `entry` has `value` in this field.
    pub fn matches(&self, entry: &WaitlistEntry, value: &str) -> bool {
        match self {
            Field::ExternalId => entry.external_id == value,
            Field::ReferralCode => entry.referral_code == value,
            Field::Tier => entry.tier == Tier::parse(value),
        }
    }
}

/// Numeric fields that support atomic adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Position,
    ReferralCount,
}

impl Counter {
    pub fn get(&self, entry: &WaitlistEntry) -> i64 {
        match self {
            Counter::Position => i64::from(entry.position),
            Counter::ReferralCount => i64::from(entry.referral_count),
        }
    }

    pub fn set(&self, entry: &mut WaitlistEntry, value: i64) {
        let value = value.clamp(0, i64::from(u32::MAX)) as u32;
        match self {
            Counter::Position => entry.position = value,
            Counter::ReferralCount => entry.referral_count = value,
        }
    }
}

/// One counter change applied by [`WaitlistStore::atomic_adjust_many`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustment {
    pub counter: Counter,
    pub delta: i64,
    /// Lowest allowed result; zero when absent
    pub floor: Option<i64>,
}

impl Adjustment {
    pub const fn new(counter: Counter, delta: i64, floor: Option<i64>) -> Self {
        Self {
            counter,
            delta,
            floor,
        }
    }

    /// Apply to `entry` and return the counter's new value.
    pub fn apply(&self, entry: &mut WaitlistEntry) -> i64 {
        let value = adjusted_value(self.counter.get(entry), self.delta, self.floor);
        self.counter.set(entry, value);
        self.counter.get(entry)
    }
}

/// Orderings supported by [`WaitlistStore::list_ordered_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    Position,
    ReferralCount,
    SignupTimestamp,
}

/// Result of a create attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// The entry was written; carries the stored entry (with its position).
    Created(WaitlistEntry),
    /// An entry with the same external id already exists; nothing was written.
    AlreadyExists(WaitlistEntry),
    /// Another entry already owns the referral code; nothing was written.
    CodeTaken,
}

/// Backend-agnostic waitlist persistence.
pub trait WaitlistStore: Send + Sync {
    /// Point lookup on an equality field. `Field::Tier` is not unique and
    /// returns an arbitrary member.
    fn get_by_field(&self, field: Field, value: &str) -> Result<Option<WaitlistEntry>>;

    fn count_by_field(&self, field: Field, value: &str) -> Result<u64>;

    /// Write `entry` as-is unless its external id or referral code is taken.
    fn create_if_absent(&self, entry: WaitlistEntry) -> Result<CreateOutcome>;

    /// Count the entries already in `entry.tier`, set `entry.position` to
    /// `allocate(count)` and write it, all in one tier-scoped transaction.
    ///
    /// Two concurrent calls for the same tier never observe the same count.
    fn create_allocated(
        &self,
        entry: WaitlistEntry,
        allocate: &dyn Fn(u64) -> u32,
    ) -> Result<CreateOutcome>;

    /// Apply every adjustment to one entry as a single atomic update: either
    /// all of them land or none do. Returns the new values in order.
    fn atomic_adjust_many(
        &self,
        external_id: &str,
        adjustments: &[Adjustment],
    ) -> Result<Vec<i64>>;

    /// Atomically add `delta` to a counter, never going below `floor`
    /// (or zero when no floor is given). Returns the new value.
    fn atomic_adjust(
        &self,
        external_id: &str,
        counter: Counter,
        delta: i64,
        floor: Option<i64>,
    ) -> Result<i64> {
        self.atomic_adjust_many(external_id, &[Adjustment::new(counter, delta, floor)])?
            .first()
            .copied()
            .ok_or_else(|| Error::StoreUnavailable("adjustment returned no value".into()))
    }

    fn list_ordered_by(&self, order: OrderBy, ascending: bool) -> Result<Vec<WaitlistEntry>>;

    fn backend_name(&self) -> &'static str;
}

/// Clamped adjustment shared by store implementations.
pub fn adjusted_value(current: i64, delta: i64, floor: Option<i64>) -> i64 {
    current.saturating_add(delta).max(floor.unwrap_or(0))
}

/// Sort entries in place. Ties fall back to signup time, then external id.
pub fn sort_entries(entries: &mut [WaitlistEntry], order: OrderBy, ascending: bool) {
    entries.sort_by(|a, b| {
        let primary = match order {
            OrderBy::Position => a.position.cmp(&b.position),
            OrderBy::ReferralCount => a.referral_count.cmp(&b.referral_count),
            OrderBy::SignupTimestamp => a.signup_timestamp.cmp(&b.signup_timestamp),
        };
        let primary = if ascending { primary } else { primary.reverse() };
        primary
            .then_with(|| a.signup_timestamp.cmp(&b.signup_timestamp))
            .then_with(|| a.external_id.cmp(&b.external_id))
    });
}
