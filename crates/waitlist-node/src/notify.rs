//! Signup notifier that records the welcome notice in the log.
//!
//! Mail delivery itself belongs to an external service; this notifier is
//! the hand-off point and logs everything that service would need.

use waitlist_core::{referral_link, Result, SignupNotice, SignupNotifier};

/// Logs each signup notice with its shareable link.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    site_url: String,
}

impl LogNotifier {
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
        }
    }
}

impl SignupNotifier for LogNotifier {
    fn notify(&self, notice: &SignupNotice) -> Result<()> {
        tracing::info!(
            to = %notice.contact_email,
            name = %notice.display_name,
            position = notice.position,
            link = %referral_link(&self.site_url, &notice.referral_code),
            "welcome notice ready"
        );
        Ok(())
    }
}
