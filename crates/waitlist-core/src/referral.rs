//! Referral resolution and referrer promotion.
//!
//! Attribution is best-effort: a code that matches nobody, or a store error
//! while resolving or promoting, is recorded and logged but never fails the
//! signup that carried it.
//!
//! Promotion is one atomic update on the referrer that applies
//! `referral_count += 1` and `position = max(1, position - boost)` together.
//! The update commutes with itself, so N concurrent referrals to one referrer
//! always yield exactly N applications, and a failed promotion credits nothing.

use crate::entry::WaitlistEntry;
use crate::error::{Error, Result};
use crate::store::{Adjustment, Counter, Field, WaitlistStore};
use serde::{Deserialize, Serialize};

/// Positions gained per successful referral.
pub const DEFAULT_REFERRAL_BOOST: u32 = 10;

/// Lowest position a promotion can reach.
pub const POSITION_FLOOR: u32 = 1;

/// What happened to the referral code supplied with a signup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReferralOutcome {
    /// No code was supplied
    NotSupplied,
    /// The code matched no entry; kept on the new entry for audit only
    NotFound { code: String },
    /// The referrer was credited and promoted
    Applied {
        referrer_id: String,
        position: u32,
        referral_count: u32,
    },
    /// Resolution or promotion hit a store error
    Failed { code: String, reason: String },
}

impl ReferralOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ReferralOutcome::Applied { .. })
    }
}

/// Result of looking up a referral code before the new entry is written.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(WaitlistEntry),
    NotFound,
    Failed(String),
}

/// Resolves referral codes and promotes referrers.
#[derive(Debug, Clone, Copy)]
pub struct ReferralProcessor {
    boost: u32,
}

impl Default for ReferralProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_REFERRAL_BOOST)
    }
}

impl ReferralProcessor {
    pub fn new(boost: u32) -> Self {
        Self { boost }
    }

    /// Find the owner of `code`.
    pub fn resolve(&self, store: &dyn WaitlistStore, code: &str) -> Resolution {
        match store.get_by_field(Field::ReferralCode, code) {
            Ok(Some(referrer)) => Resolution::Resolved(referrer),
            Ok(None) => {
                tracing::info!(code, "referral code not found, signup continues unattributed");
                Resolution::NotFound
            }
            Err(e) => {
                tracing::warn!(code, error = %e, "referral lookup failed");
                Resolution::Failed(e.to_string())
            }
        }
    }

    /// Credit `referrer_id` with one referral and move it up by the boost.
    ///
    /// Returns the referrer's new `(position, referral_count)`.
    pub fn promote(&self, store: &dyn WaitlistStore, referrer_id: &str) -> Result<(u32, u32)> {
        let values = store.atomic_adjust_many(
            referrer_id,
            &[
                Adjustment::new(Counter::ReferralCount, 1, None),
                Adjustment::new(
                    Counter::Position,
                    -i64::from(self.boost),
                    Some(i64::from(POSITION_FLOOR)),
                ),
            ],
        )?;
        match values.as_slice() {
            [referral_count, position] => Ok((*position as u32, *referral_count as u32)),
            _ => Err(Error::StoreUnavailable(format!(
                "promotion returned {} values",
                values.len()
            ))),
        }
    }

    /// Promote the referrer behind `resolution` and report the outcome.
    pub fn apply(
        &self,
        store: &dyn WaitlistStore,
        code: &str,
        resolution: &Resolution,
    ) -> ReferralOutcome {
        match resolution {
            Resolution::NotFound => ReferralOutcome::NotFound { code: code.to_string() },
            Resolution::Failed(reason) => ReferralOutcome::Failed {
                code: code.to_string(),
                reason: reason.clone(),
            },
            Resolution::Resolved(referrer) => {
                match self.promote(store, &referrer.external_id) {
                    Ok((position, referral_count)) => {
                        tracing::info!(
                            referrer = %referrer.external_id,
                            position,
                            referral_count,
                            "referral applied"
                        );
                        ReferralOutcome::Applied {
                            referrer_id: referrer.external_id.clone(),
                            position,
                            referral_count,
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            referrer = %referrer.external_id,
                            error = %e,
                            "referral promotion failed"
                        );
                        ReferralOutcome::Failed {
                            code: code.to_string(),
                            reason: e.to_string(),
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CreateOutcome, MemoryStore, OrderBy};
    use crate::tier::Tier;

    fn seed(store: &MemoryStore, id: &str, code: &str, position: u32, referrals: u32) {
        let mut e = WaitlistEntry::new(
            id.into(),
            id.into(),
            format!("{id}@example.com"),
            Tier::Pro,
            code.into(),
        );
        e.position = position;
        e.referral_count = referrals;
        store.create_if_absent(e).unwrap();
    }

    #[test]
    fn promotion_moves_up_by_boost() {
        let store = MemoryStore::new();
        seed(&store, "ref", "REF001", 612, 2);
        let processor = ReferralProcessor::default();
        let resolution = processor.resolve(&store, "REF001");
        let outcome = processor.apply(&store, "REF001", &resolution);
        assert_eq!(
            outcome,
            ReferralOutcome::Applied {
                referrer_id: "ref".into(),
                position: 602,
                referral_count: 3,
            }
        );
    }

    #[test]
    fn promotion_floors_at_one() {
        let store = MemoryStore::new();
        seed(&store, "ref", "REF001", 7, 0);
        let processor = ReferralProcessor::default();
        assert_eq!(processor.promote(&store, "ref").unwrap(), (1, 1));
        assert_eq!(processor.promote(&store, "ref").unwrap(), (1, 2));
    }

    #[test]
    fn unknown_code_is_not_found() {
        let store = MemoryStore::new();
        let processor = ReferralProcessor::default();
        let resolution = processor.resolve(&store, "NOPE00");
        assert_eq!(resolution, Resolution::NotFound);
        assert_eq!(
            processor.apply(&store, "NOPE00", &resolution),
            ReferralOutcome::NotFound { code: "NOPE00".into() }
        );
    }

    #[test]
    fn vanished_referrer_fails_soft() {
        let store = MemoryStore::new();
        let processor = ReferralProcessor::default();
        let ghost = WaitlistEntry::new(
            "ghost".into(),
            "Ghost".into(),
            "ghost@example.com".into(),
            Tier::Pro,
            "GHOST1".into(),
        );
        let outcome = processor.apply(&store, "GHOST1", &Resolution::Resolved(ghost));
        assert!(matches!(outcome, ReferralOutcome::Failed { .. }));
    }

    /// Delegates to a [`MemoryStore`] but rejects any update touching a position.
    struct PositionWritesFail(MemoryStore);

    impl WaitlistStore for PositionWritesFail {
        fn get_by_field(&self, field: Field, value: &str) -> Result<Option<WaitlistEntry>> {
            self.0.get_by_field(field, value)
        }

        fn count_by_field(&self, field: Field, value: &str) -> Result<u64> {
            self.0.count_by_field(field, value)
        }

        fn create_if_absent(&self, entry: WaitlistEntry) -> Result<CreateOutcome> {
            self.0.create_if_absent(entry)
        }

        fn create_allocated(
            &self,
            entry: WaitlistEntry,
            allocate: &dyn Fn(u64) -> u32,
        ) -> Result<CreateOutcome> {
            self.0.create_allocated(entry, allocate)
        }

        fn atomic_adjust_many(
            &self,
            external_id: &str,
            adjustments: &[Adjustment],
        ) -> Result<Vec<i64>> {
            if adjustments.iter().any(|a| a.counter == Counter::Position) {
                return Err(Error::StoreUnavailable("down".into()));
            }
            self.0.atomic_adjust_many(external_id, adjustments)
        }

        fn list_ordered_by(&self, order: OrderBy, ascending: bool) -> Result<Vec<WaitlistEntry>> {
            self.0.list_ordered_by(order, ascending)
        }

        fn backend_name(&self) -> &'static str {
            "position-writes-fail"
        }
    }

    #[test]
    fn failed_promotion_credits_nothing() {
        let store = PositionWritesFail(MemoryStore::new());
        seed(&store.0, "ref", "REF001", 501, 0);
        let processor = ReferralProcessor::default();
        let resolution = processor.resolve(&store, "REF001");
        let outcome = processor.apply(&store, "REF001", &resolution);
        assert!(matches!(outcome, ReferralOutcome::Failed { ref reason, .. } if reason.contains("down")));

        let stored = store.0.get_by_field(Field::ExternalId, "ref").unwrap().unwrap();
        assert_eq!(stored.referral_count, 0);
        assert_eq!(stored.position, 501);
    }

    #[test]
    fn custom_boost() {
        let store = MemoryStore::new();
        seed(&store, "ref", "REF001", 100, 0);
        assert_eq!(ReferralProcessor::new(25).promote(&store, "ref").unwrap(), (75, 1));
    }
}
