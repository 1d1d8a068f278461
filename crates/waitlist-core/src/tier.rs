//! Pricing tiers and their position bands.
//!
//! Each tier owns a closed band `[start, max]` of positions. Bands are
//! ordered and non-overlapping: platinum holds the most favourable ranks,
//! starter the largest and least favourable range.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pricing tier selected at signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Platinum,
    Elite,
    Pro,
    Starter,
}

impl Tier {
    /// All tiers, most favourable band first.
    pub const ALL: [Tier; 4] = [Tier::Platinum, Tier::Elite, Tier::Pro, Tier::Starter];

    /// Parse a tier name, case-insensitively.
    ///
    /// Unknown names fall back to [`Tier::Starter`], the lowest-priority band,
    /// so a bad tier never fails a signup.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "platinum" => Tier::Platinum,
            "elite" => Tier::Elite,
            "pro" => Tier::Pro,
            "starter" => Tier::Starter,
            other => {
                tracing::debug!(tier = other, "unknown tier, using starter band");
                Tier::Starter
            }
        }
    }

    /// Lowercase name used in storage keys and JSON.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Tier::Platinum => "platinum",
            Tier::Elite => "elite",
            Tier::Pro => "pro",
            Tier::Starter => "starter",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed band of positions `[start, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBand {
    pub start: u32,
    pub max: u32,
}

impl TierBand {
    pub const fn new(start: u32, max: u32) -> Self {
        Self { start, max }
    }

    /// Number of distinct positions in the band. An inverted band
    /// (`max < start`) holds only `max`.
    pub const fn width(&self) -> u64 {
        self.max.saturating_sub(self.start) as u64 + 1
    }

    pub const fn contains(&self, position: u32) -> bool {
        position >= self.start && position <= self.max
    }

    /// Whether `signups` entries have used up every distinct position.
    pub const fn is_saturated(&self, signups: u64) -> bool {
        signups >= self.width()
    }
}

/// Static lookup from tier to position band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierRangeTable {
    platinum: TierBand,
    elite: TierBand,
    pro: TierBand,
    starter: TierBand,
}

impl TierRangeTable {
    /// The production bands.
    pub const STANDARD: TierRangeTable = TierRangeTable {
        platinum: TierBand::new(1, 100),
        elite: TierBand::new(101, 500),
        pro: TierBand::new(501, 2000),
        starter: TierBand::new(2001, 999_999),
    };

    /// Build a table from explicit bands, e.g. tiny bands for saturation tests.
    pub const fn new(platinum: TierBand, elite: TierBand, pro: TierBand, starter: TierBand) -> Self {
        Self {
            platinum,
            elite,
            pro,
            starter,
        }
    }

    pub const fn band(&self, tier: Tier) -> TierBand {
        match tier {
            Tier::Platinum => self.platinum,
            Tier::Elite => self.elite,
            Tier::Pro => self.pro,
            Tier::Starter => self.starter,
        }
    }

    /// Band for a raw tier name; unknown names map to the starter band.
    pub fn band_for_name(&self, name: &str) -> TierBand {
        self.band(Tier::parse(name))
    }
}

impl Default for TierRangeTable {
    fn default() -> Self {
        Self::STANDARD
    }
}
