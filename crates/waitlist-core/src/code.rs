//! Referral code generation.

use rand::Rng;

/// Characters a referral code is drawn from.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default referral code length.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Source of fresh referral codes.
///
/// Implementations return a code of constant length and never consult the
/// store; collision handling is the caller's job.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Uniformly random alphanumeric codes.
#[derive(Debug, Clone, Copy)]
pub struct RandomCodeGenerator {
    length: usize,
}

impl RandomCodeGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomCodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH)
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }
}

/// Shareable signup link for a referral code.
pub fn referral_link(site_url: &str, code: &str) -> String {
    format!("{}/waitlist?ref={}", site_url.trim_end_matches('/'), code)
}
