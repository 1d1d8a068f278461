//! Signup orchestration and the ranked listing.

use crate::allocator::PositionAllocator;
use crate::code::{CodeGenerator, RandomCodeGenerator, DEFAULT_CODE_LENGTH};
use crate::entry::WaitlistEntry;
use crate::error::{Error, Result};
use crate::notify::{SignupNotice, SignupNotifier};
use crate::referral::{ReferralOutcome, ReferralProcessor, Resolution, DEFAULT_REFERRAL_BOOST};
use crate::store::{CreateOutcome, Field, OrderBy, WaitlistStore};
use crate::tier::{Tier, TierRangeTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tunables for [`WaitlistService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Position bands per tier
    pub tiers: TierRangeTable,
    /// Positions gained per successful referral
    pub referral_boost: u32,
    /// Length of generated referral codes
    pub code_length: usize,
    /// Code generations tried before giving up on a collision streak
    pub max_code_attempts: u32,
    /// Tier used when a signup names none
    pub default_tier: Tier,
    /// Size of the top-referrer board in the listing
    pub top_referrers: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            tiers: TierRangeTable::STANDARD,
            referral_boost: DEFAULT_REFERRAL_BOOST,
            code_length: DEFAULT_CODE_LENGTH,
            max_code_attempts: 5,
            default_tier: Tier::Pro,
            top_referrers: 10,
        }
    }
}

/// A signup request as received from the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignupRequest {
    pub external_id: String,
    pub display_name: String,
    pub contact_email: String,
    pub photo_url: Option<String>,
    /// Raw tier name; unknown names land in the starter band
    pub tier: Option<String>,
    pub referred_by: Option<String>,
}

impl SignupRequest {
    pub fn new(
        external_id: impl Into<String>,
        display_name: impl Into<String>,
        contact_email: impl Into<String>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            display_name: display_name.into(),
            contact_email: contact_email.into(),
            ..Default::default()
        }
    }

    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = Some(tier.into());
        self
    }

    pub fn with_referral(mut self, code: impl Into<String>) -> Self {
        self.referred_by = Some(code.into());
        self
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("externalId", &self.external_id),
            ("displayName", &self.display_name),
            ("contactEmail", &self.contact_email),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Position and code handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub position: u32,
    pub referral_code: String,
}

impl From<&WaitlistEntry> for Placement {
    fn from(entry: &WaitlistEntry) -> Self {
        Self {
            position: entry.position,
            referral_code: entry.referral_code.clone(),
        }
    }
}

/// Result of [`WaitlistService::signup`].
#[derive(Debug, Clone, PartialEq)]
pub enum SignupOutcome {
    /// A new entry was created
    Joined {
        entry: WaitlistEntry,
        referral: ReferralOutcome,
    },
    /// The external id was already on the waitlist; nothing changed
    AlreadyOnWaitlist(Placement),
}

impl SignupOutcome {
    pub fn placement(&self) -> Placement {
        match self {
            SignupOutcome::Joined { entry, .. } => Placement::from(entry),
            SignupOutcome::AlreadyOnWaitlist(placement) => placement.clone(),
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, SignupOutcome::Joined { .. })
    }
}

/// Leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopReferrer {
    pub external_id: String,
    pub display_name: String,
    pub contact_email: String,
    pub referral_count: u32,
    pub position: u32,
}

/// Read-only summaries over the whole waitlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistAnalytics {
    pub total_users: u64,
    pub tier_breakdown: BTreeMap<Tier, u64>,
    pub total_referrals: u64,
    /// Rounded to one decimal place
    pub avg_referrals_per_user: f64,
    pub top_referrers: Vec<TopReferrer>,
}

impl WaitlistAnalytics {
    /// Summarise `entries`. Only entries with at least one referral make the
    /// top board; ties go to the earlier signup.
    pub fn from_entries(entries: &[WaitlistEntry], top_n: usize) -> Self {
        let mut tier_breakdown: BTreeMap<Tier, u64> =
            Tier::ALL.iter().map(|tier| (*tier, 0)).collect();
        for entry in entries {
            *tier_breakdown.entry(entry.tier).or_default() += 1;
        }

        let total_users = entries.len() as u64;
        let total_referrals: u64 = entries.iter().map(|e| u64::from(e.referral_count)).sum();
        let avg_referrals_per_user = if total_users > 0 {
            (total_referrals as f64 / total_users as f64 * 10.0).round() / 10.0
        } else {
            0.0
        };

        let mut referrers: Vec<&WaitlistEntry> =
            entries.iter().filter(|e| e.referral_count > 0).collect();
        referrers.sort_by(|a, b| {
            b.referral_count
                .cmp(&a.referral_count)
                .then_with(|| a.signup_timestamp.cmp(&b.signup_timestamp))
                .then_with(|| a.external_id.cmp(&b.external_id))
        });
        let top_referrers = referrers
            .into_iter()
            .take(top_n)
            .map(|e| TopReferrer {
                external_id: e.external_id.clone(),
                display_name: e.display_name.clone(),
                contact_email: e.contact_email.clone(),
                referral_count: e.referral_count,
                position: e.position,
            })
            .collect();

        Self {
            total_users,
            tier_breakdown,
            total_referrals,
            avg_referrals_per_user,
            top_referrers,
        }
    }
}

/// Entries ascending by position, plus analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitlistListing {
    pub entries: Vec<WaitlistEntry>,
    pub analytics: WaitlistAnalytics,
}

/// Stateless signup orchestrator. Cheap to clone; safe to share across
/// threads and to run in several processes against one store.
#[derive(Clone)]
pub struct WaitlistService {
    store: Arc<dyn WaitlistStore>,
    codes: Arc<dyn CodeGenerator>,
    notifier: Option<Arc<dyn SignupNotifier>>,
    allocator: PositionAllocator,
    referrals: ReferralProcessor,
    config: ServiceConfig,
}

impl WaitlistService {
    pub fn new(store: Arc<dyn WaitlistStore>, config: ServiceConfig) -> Self {
        Self {
            store,
            codes: Arc::new(RandomCodeGenerator::new(config.code_length)),
            notifier: None,
            allocator: PositionAllocator::new(config.tiers),
            referrals: ReferralProcessor::new(config.referral_boost),
            config,
        }
    }

    pub fn with_code_generator(mut self, codes: Arc<dyn CodeGenerator>) -> Self {
        self.codes = codes;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn SignupNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn store(&self) -> &Arc<dyn WaitlistStore> {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Put `request` on the waitlist.
    ///
    /// Validation failures return `Err` before anything is written. A repeat
    /// signup returns the original placement. Referral problems never fail the
    /// signup; they are reported in the returned [`ReferralOutcome`].
    pub fn signup(&self, request: SignupRequest) -> Result<SignupOutcome> {
        request.validate()?;
        let store = self.store.as_ref();
        let external_id = request.external_id.trim().to_string();

        if let Some(existing) = store.get_by_field(Field::ExternalId, &external_id)? {
            tracing::debug!(external_id = %external_id, "already on waitlist");
            return Ok(SignupOutcome::AlreadyOnWaitlist(Placement::from(&existing)));
        }

        let tier = request
            .tier
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(Tier::parse)
            .unwrap_or(self.config.default_tier);

        let referred_by = request
            .referred_by
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string);

        // Resolve before writing so the referrer id lands on the new entry, but
        // only promote once the write has actually happened.
        let resolution = referred_by
            .as_deref()
            .map(|code| self.referrals.resolve(store, code));
        let referrer_id = match &resolution {
            Some(Resolution::Resolved(referrer)) => Some(referrer.external_id.clone()),
            _ => None,
        };

        let attempts = self.config.max_code_attempts.max(1);
        for attempt in 1..=attempts {
            let mut entry = WaitlistEntry::new(
                external_id.clone(),
                request.display_name.trim().to_string(),
                request.contact_email.trim().to_string(),
                tier,
                self.codes.generate(),
            );
            entry.photo_url = request.photo_url.clone().unwrap_or_default();
            entry.referred_by_code = referred_by.clone();
            entry.referrer_id = referrer_id.clone();

            match self.allocator.allocate(store, entry)? {
                CreateOutcome::Created(entry) => {
                    let referral = match (&referred_by, &resolution) {
                        (Some(code), Some(resolution)) => {
                            self.referrals.apply(store, code, resolution)
                        }
                        _ => ReferralOutcome::NotSupplied,
                    };
                    tracing::info!(
                        external_id = %entry.external_id,
                        %tier,
                        position = entry.position,
                        referral = referral.is_applied(),
                        "joined waitlist"
                    );
                    self.notify(&entry);
                    return Ok(SignupOutcome::Joined { entry, referral });
                }
                CreateOutcome::AlreadyExists(existing) => {
                    // Lost a race with a concurrent signup for the same identity.
                    return Ok(SignupOutcome::AlreadyOnWaitlist(Placement::from(&existing)));
                }
                CreateOutcome::CodeTaken => {
                    tracing::warn!(attempt, attempts, "referral code collision, regenerating");
                }
            }
        }

        Err(Error::CodeExhausted(attempts))
    }

    fn notify(&self, entry: &WaitlistEntry) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let notice = SignupNotice {
            display_name: entry.display_name.clone(),
            contact_email: entry.contact_email.clone(),
            position: entry.position,
            referral_code: entry.referral_code.clone(),
        };
        if let Err(e) = notifier.notify(&notice) {
            tracing::warn!(external_id = %entry.external_id, error = %e, "signup notification failed");
        }
    }

    /// All entries ascending by position, with analytics.
    pub fn list_ranked(&self) -> Result<WaitlistListing> {
        let entries = self.store.list_ordered_by(OrderBy::Position, true)?;
        let analytics = WaitlistAnalytics::from_entries(&entries, self.config.top_referrers);
        Ok(WaitlistListing { entries, analytics })
    }

    pub fn lookup(&self, external_id: &str) -> Result<Option<WaitlistEntry>> {
        self.store.get_by_field(Field::ExternalId, external_id)
    }

    pub fn lookup_code(&self, code: &str) -> Result<Option<WaitlistEntry>> {
        self.store.get_by_field(Field::ReferralCode, code)
    }
}
