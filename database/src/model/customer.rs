use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::consts::consts::LeadId;

use super::lead::Lead;

/// Snapshot of a won lead, one per lead. Later edits to the lead are not copied over.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub lead_id: LeadId,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub city: Option<String>,
    pub value: f64,
    pub lifetime_value: f64,
    pub source: Option<String>,
    pub priority: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Lead notes stay with the lead, a customer starts without any
    pub fn from_lead(lead: &Lead) -> Self {
        let f = &lead.fields;

        Customer {
            lead_id: lead.id.clone(),
            name: f.name.clone(),
            phone: f.phone.clone(),
            email: f.email.clone(),
            company: f.company.clone(),
            city: f.city.clone(),
            value: f.value,
            lifetime_value: f.value,
            source: f.source.clone(),
            priority: f.priority.clone(),
            notes: None,
            created_at: f.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_copies_the_lead_and_starts_its_lifetime_value() {
        let mut lead = Lead::new_test("1", Some("5551234567"), Some("jane@acme.io"));
        lead.fields.value = 1200.0;
        lead.fields.notes = Some("call back friday".to_string());

        let customer = Customer::from_lead(&lead);

        assert_eq!(customer.lead_id, lead.id);
        assert_eq!(customer.email.as_deref(), Some("jane@acme.io"));
        assert_eq!(customer.lifetime_value, 1200.0);
        assert_eq!(customer.created_at, lead.fields.created_at);
        assert_eq!(customer.notes, None);
    }
}
