use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    consts::consts::{LeadId, DEFAULT_PRIORITY, DEFAULT_STAGE},
    identity::normalize::{normalize_email, normalize_phone, MatchPolicy},
};

use super::payload::coerce_value;

/// Everything about a lead except its identifier. Updates replace the whole value.
///
/// The normalized phone is not a field, it is derived from `phone` whenever a store
/// needs it, so it can never drift from the phone it was computed from.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeadFields {
    pub name: Option<String>,
    pub company: Option<String>,
    pub contact: Option<String>,
    pub job_title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub value: f64,
    pub stage: String,
    pub source: Option<String>,
    pub priority: String,
    pub industry: Option<String>,
    pub notes: Option<String>,
    pub city: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LeadFields {
    /// Blank lead carrying only the documented defaults
    pub fn new(created_at: DateTime<Utc>) -> Self {
        LeadFields {
            name: None,
            company: None,
            contact: None,
            job_title: None,
            email: None,
            phone: None,
            website: None,
            linkedin: None,
            value: 0.0,
            stage: DEFAULT_STAGE.to_string(),
            source: None,
            priority: DEFAULT_PRIORITY.to_string(),
            industry: None,
            notes: None,
            city: None,
            created_at,
        }
    }

    pub fn phone_normalized(&self, policy: &MatchPolicy) -> Option<String> {
        self.phone
            .as_deref()
            .and_then(|phone| normalize_phone(phone, policy))
    }

    pub fn set_email(&mut self, email: Option<&str>) {
        self.email = email.and_then(normalize_email);
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Lead {
    pub id: LeadId,
    #[serde(flatten)]
    pub fields: LeadFields,
}

impl Lead {
    pub fn new(id: LeadId, fields: LeadFields) -> Self {
        Lead { id, fields }
    }

    pub fn phone_normalized(&self, policy: &MatchPolicy) -> Option<String> {
        self.fields.phone_normalized(policy)
    }

    #[cfg(test)]
    pub fn new_test(id: &str, phone: Option<&str>, email: Option<&str>) -> Self {
        let mut fields = LeadFields::new(Utc::now());
        fields.name = Some(format!("Lead {}", id));
        fields.phone = phone.map(str::to_string);
        fields.set_email(email);

        Lead::new(LeadId(id.to_string()), fields)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
}

/// Partial update, only the fields that are present get applied
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadPatch {
    pub name: Option<String>,
    pub company: Option<String>,
    pub contact: Option<String>,
    pub job_title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub value: Option<serde_json::Value>,
    pub stage: Option<String>,
    pub source: Option<String>,
    pub priority: Option<String>,
    pub industry: Option<String>,
    pub notes: Option<String>,
    pub city: Option<String>,
}

impl LeadPatch {
    pub fn stage(stage: String) -> Self {
        LeadPatch {
            stage: Some(stage),
            ..Default::default()
        }
    }

    pub fn priority(priority: String) -> Self {
        LeadPatch {
            priority: Some(priority),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &LeadPatch::default()
    }

    pub fn apply(self, fields: &mut LeadFields) {
        fn set(target: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *target = value;
            }
        }

        set(&mut fields.name, self.name);
        set(&mut fields.company, self.company);
        set(&mut fields.contact, self.contact);
        set(&mut fields.job_title, self.job_title);
        set(&mut fields.phone, self.phone);
        set(&mut fields.website, self.website);
        set(&mut fields.linkedin, self.linkedin);
        set(&mut fields.source, self.source);
        set(&mut fields.industry, self.industry);
        set(&mut fields.notes, self.notes);
        set(&mut fields.city, self.city);

        if let Some(email) = &self.email {
            fields.set_email(Some(email));
        }

        if let Some(value) = &self.value {
            fields.value = coerce_value(value);
        }

        if let Some(stage) = self.stage {
            fields.stage = stage;
        }

        if let Some(priority) = self.priority {
            fields.priority = priority;
        }
    }
}
