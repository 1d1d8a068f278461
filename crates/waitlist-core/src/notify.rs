//! Hand-off to the signup notifier (welcome email and the like).

use crate::error::Result;
use serde::Serialize;

/// What the notifier receives after a successful signup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupNotice {
    pub display_name: String,
    pub contact_email: String,
    pub position: u32,
    pub referral_code: String,
}

/// Delivers signup notices. Failures are logged by the caller and never
/// fail the signup.
pub trait SignupNotifier: Send + Sync {
    fn notify(&self, notice: &SignupNotice) -> Result<()>;
}
