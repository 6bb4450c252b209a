use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::consts::consts::{DEFAULT_PRIORITY, DEFAULT_STAGE};

use super::lead::LeadFields;

/// Incoming lead record as submitted by a client or an import file.
///
/// Every field is optional. Text fields accept strings or numbers (spreadsheets love
/// numeric phone columns), `value` and `createdAt` accept anything and coerce.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadPayload {
    #[serde(deserialize_with = "loose_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub company: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub contact: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub job_title: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub email: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub phone: Option<String>,
    /// Spreadsheet exports often call the phone column `number`
    #[serde(deserialize_with = "loose_string", skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub website: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub linkedin: Option<String>,
    pub value: Option<Value>,
    #[serde(deserialize_with = "loose_string")]
    pub stage: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub source: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub priority: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub industry: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub notes: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub city: Option<String>,
    pub created_at: Option<Value>,
}

impl LeadPayload {
    /// Builds the full field set, anything missing falls back to its default.
    /// This is also what a merge writes, so a merge resets omitted fields.
    pub fn to_fields(&self, now: DateTime<Utc>) -> LeadFields {
        let created_at = self
            .created_at
            .as_ref()
            .map(|raw| parse_created_at(raw, now))
            .unwrap_or(now);

        let mut fields = LeadFields::new(created_at);

        fields.name = self.name.clone();
        fields.company = self.company.clone();
        fields.contact = self.contact.clone();
        fields.job_title = self.job_title.clone();
        fields.phone = self.phone_or_number().map(str::to_string);
        fields.website = self.website.clone();
        fields.linkedin = self.linkedin.clone();
        fields.source = self.source.clone();
        fields.industry = self.industry.clone();
        fields.notes = self.notes.clone();
        fields.city = self.city.clone();
        fields.set_email(self.email.as_deref());
        fields.value = self.value.as_ref().map(coerce_value).unwrap_or(0.0);
        fields.stage = label_or(&self.stage, DEFAULT_STAGE);
        fields.priority = label_or(&self.priority, DEFAULT_PRIORITY);

        fields
    }

    /// `phone` when it has text, otherwise the `number` column
    pub fn phone_or_number(&self) -> Option<&str> {
        match LeadPayload::has_text(&self.phone) {
            true => self.phone.as_deref(),
            false => self.number.as_deref(),
        }
    }

    pub fn has_text(field: &Option<String>) -> bool {
        field.as_deref().map(str::trim).is_some_and(|s| !s.is_empty())
    }
}

fn label_or(label: &Option<String>, default: &str) -> String {
    match label.as_deref().map(str::trim) {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => default.to_string(),
    }
}

/// Non-negative estimate, anything unusable is 0
pub fn coerce_value(raw: &Value) -> f64 {
    let value = match raw {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };

    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Accepts RFC 3339 and the common naive layouts (read as UTC), otherwise `now`
pub fn parse_created_at(raw: &Value, now: DateTime<Utc>) -> DateTime<Utc> {
    let raw = match raw {
        Value::String(s) => s.trim(),
        _ => return now,
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return parsed.and_utc();
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|parsed| parsed.and_utc())
        .unwrap_or(now)
}

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;

    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}
