use serde::{Deserialize, Serialize};

use crate::consts::consts::{MAX_PHONE_DIGITS, MIN_MATCH_DIGITS, PHONE_SUFFIX_DIGITS};

/// Tunable knobs of the phone heuristic
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchPolicy {
    /// Trailing digits compared when looking for an existing lead
    pub phone_suffix_digits: usize,
    /// Normalized phones keep at most this many trailing digits
    pub max_phone_digits: usize,
    /// Shorter normalized phones are not used for matching. A one digit phone would
    /// otherwise merge into any lead whose phone ends with that digit.
    pub min_match_digits: usize,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            phone_suffix_digits: PHONE_SUFFIX_DIGITS,
            max_phone_digits: MAX_PHONE_DIGITS,
            min_match_digits: MIN_MATCH_DIGITS,
        }
    }
}

// Implements: https://rust-unofficial.github.io/patterns/patterns/creational/builder.html
impl MatchPolicy {
    pub fn set_phone_suffix_digits(mut self, digits: usize) -> Self {
        self.phone_suffix_digits = digits.max(1);
        self
    }

    pub fn set_max_phone_digits(mut self, digits: usize) -> Self {
        self.max_phone_digits = digits.max(1);
        self
    }

    pub fn set_min_match_digits(mut self, digits: usize) -> Self {
        self.min_match_digits = digits;
        self
    }
}

/// Digits only, truncated to the trailing `max_phone_digits`. Leading digits are
/// assumed to be country code / prefix noise.
pub fn normalize_phone(phone: &str, policy: &MatchPolicy) -> Option<String> {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return None;
    }

    let start = digits.len().saturating_sub(policy.max_phone_digits);

    Some(digits[start..].iter().collect())
}

pub fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        None
    } else {
        Some(email)
    }
}

/// Key handed to the store for the suffix lookup. A key shorter than the suffix
/// length matches every stored phone ending in it, see `min_match_digits`.
pub fn phone_match_key(normalized_phone: &str, policy: &MatchPolicy) -> String {
    // Normalized phones are ascii digits, byte slicing is safe
    let start = normalized_phone
        .len()
        .saturating_sub(policy.phone_suffix_digits);

    normalized_phone[start..].to_string()
}
