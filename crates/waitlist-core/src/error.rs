//! Error types for the waitlist core.

use thiserror::Error;

/// Result type for waitlist operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in waitlist operations.
///
/// Repeat signups and unresolvable referral codes are not errors; they are
/// reported through [`SignupOutcome`](crate::SignupOutcome) and
/// [`ReferralOutcome`](crate::ReferralOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// A required signup field is missing or blank
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backing store could not complete the operation
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// An entry addressed by an atomic update does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Every generated referral code collided with an existing one
    #[error("Could not generate a unique referral code after {0} attempts")]
    CodeExhausted(u32),

    /// The signup notifier could not deliver
    #[error("Notification error: {0}")]
    Notification(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
