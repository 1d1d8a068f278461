//! Waitlist entry model.

use crate::tier::Tier;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One signup on the waitlist, keyed by external identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    /// Authenticated user id; immutable and unique
    pub external_id: String,

    pub display_name: String,

    pub contact_email: String,

    /// Avatar URL from the identity provider (empty when unknown)
    #[serde(default)]
    pub photo_url: String,

    pub tier: Tier,

    /// Rank on the waitlist; smaller is better
    pub position: u32,

    /// This entry's own shareable code
    pub referral_code: String,

    /// Code supplied at signup, kept for audit even if it resolved to nobody
    #[serde(default)]
    pub referred_by_code: Option<String>,

    /// External id of the resolved referrer
    #[serde(default)]
    pub referrer_id: Option<String>,

    /// Successful referrals credited to this entry
    #[serde(default)]
    pub referral_count: u32,

    /// Milliseconds since the Unix epoch
    pub signup_timestamp: u64,

    /// Set by the external notifier once the entry has been contacted
    #[serde(default)]
    pub notified: bool,
}

impl WaitlistEntry {
    /// Create an entry with required fields. Position is assigned by the store.
    pub fn new(
        external_id: String,
        display_name: String,
        contact_email: String,
        tier: Tier,
        referral_code: String,
    ) -> Self {
        Self {
            external_id,
            display_name,
            contact_email,
            photo_url: String::new(),
            tier,
            position: 0,
            referral_code,
            referred_by_code: None,
            referrer_id: None,
            referral_count: 0,
            signup_timestamp: now_millis(),
            notified: false,
        }
    }
}

/// Current wall-clock time in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_defaults() {
        let entry = WaitlistEntry::new(
            "uid-1".into(),
            "Ada".into(),
            "ada@example.com".into(),
            Tier::Pro,
            "ABC123".into(),
        );
        assert_eq!(entry.referral_count, 0);
        assert!(entry.referrer_id.is_none());
        assert!(!entry.notified);
        assert!(entry.signup_timestamp > 0);
    }

    #[test]
    fn json_uses_camel_case() {
        let entry = WaitlistEntry::new(
            "uid-1".into(),
            "Ada".into(),
            "ada@example.com".into(),
            Tier::Elite,
            "ABC123".into(),
        );
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["externalId"], "uid-1");
        assert_eq!(value["referralCode"], "ABC123");
        assert_eq!(value["tier"], "elite");
        assert!(value["referrerId"].is_null());
    }
}
