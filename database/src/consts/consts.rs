use serde::{Deserialize, Serialize};
use uuid::Uuid;

// New Type Pattern -- https://doc.rust-lang.org/rust-by-example/generics/new_types.html
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct LeadId(pub String);

impl LeadId {
    pub fn new() -> LeadId {
        LeadId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Uses the caller supplied identifier when it is not blank, otherwise generates one
    pub fn from_supplied(supplied: Option<&str>) -> LeadId {
        match supplied.map(str::trim) {
            Some(id) if !id.is_empty() => LeadId(id.to_string()),
            _ => LeadId::new(),
        }
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Values
pub const DEFAULT_STAGE: &str = "New Lead";
pub const DEFAULT_PRIORITY: &str = "Warm";
pub const DEFAULT_CALLER_ROLE: &str = "caller";
pub const ACTIVE_CALLER_STATUS: &str = "active";

/// Stage that turns a lead into a customer
pub const WON_STAGE: &str = "Won";

/// Label used by the reports when a grouping field is missing
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Trailing digits compared when matching phones, absorbs inconsistent country codes
pub const PHONE_SUFFIX_DIGITS: usize = 10;

/// Any phone with digits takes part in matching unless configured otherwise
pub const MIN_MATCH_DIGITS: usize = 0;

/// Normalized phones longer than this keep only their trailing digits
pub const MAX_PHONE_DIGITS: usize = 12;
