//! Waitlist Core
//!
//! Position allocation and referral promotion for a pre-launch signup waitlist.
//!
//! # Design
//!
//! Every entrant picks a pricing tier. Each tier owns a closed band of
//! positions; the k-th signup into a tier lands at `start + k - 1`, clamped to
//! the band's maximum once the band saturates. Entrants move up by recruiting:
//! each signup that carries their referral code improves their position by a
//! fixed boost, floored at 1.
//!
//! # Concurrency
//!
//! The service keeps no mutable state of its own and may run in several
//! processes at once. Both read-modify-write hazards, the per-tier count and
//! the referrer promotion, are pushed into [`WaitlistStore`] as single atomic
//! operations.

mod allocator;
mod code;
mod entry;
mod error;
mod notify;
mod referral;
mod service;
mod tier;
pub mod store;

pub use allocator::PositionAllocator;
pub use code::{
    referral_link, CodeGenerator, RandomCodeGenerator, CODE_ALPHABET, DEFAULT_CODE_LENGTH,
};
pub use entry::{now_millis, WaitlistEntry};
pub use error::{Error, Result};
pub use notify::{SignupNotice, SignupNotifier};
pub use referral::{
    ReferralOutcome, ReferralProcessor, Resolution, DEFAULT_REFERRAL_BOOST, POSITION_FLOOR,
};
pub use service::{
    Placement, ServiceConfig, SignupOutcome, SignupRequest, TopReferrer, WaitlistAnalytics,
    WaitlistListing, WaitlistService,
};
pub use store::{Adjustment, Counter, CreateOutcome, Field, MemoryStore, OrderBy, WaitlistStore};
pub use tier::{Tier, TierBand, TierRangeTable};
