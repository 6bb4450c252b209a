use serde::{Deserialize, Serialize};

use crate::model::lead::Lead;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum QueryMatch {
    Value(String),
    Any,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LeadQuery {
    pub stage: QueryMatch,
}

impl LeadQuery {
    pub fn all() -> Self {
        LeadQuery {
            stage: QueryMatch::Any,
        }
    }

    pub fn stage(stage: &str) -> Self {
        LeadQuery {
            stage: QueryMatch::Value(stage.to_string()),
        }
    }

    /// Blank stage filters mean no filter
    pub fn from_stage_filter(stage: Option<&str>) -> Self {
        match stage.map(str::trim) {
            Some(stage) if !stage.is_empty() => LeadQuery::stage(stage),
            _ => LeadQuery::all(),
        }
    }

    pub fn matches(&self, lead: &Lead) -> bool {
        match &self.stage {
            QueryMatch::Value(stage) => &lead.fields.stage == stage,
            QueryMatch::Any => true,
        }
    }
}

/// Applies the query and orders newest first (ties by id, keeps output stable)
pub fn filter(leads: Vec<Lead>, query: &LeadQuery) -> Vec<Lead> {
    let mut filtered: Vec<Lead> = leads
        .into_iter()
        .filter(|lead| query.matches(lead))
        .collect();

    filtered.sort_by(|a, b| {
        b.fields
            .created_at
            .cmp(&a.fields.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    filtered
}

/// Earliest created wins when several stored leads qualify for a match
pub fn earliest(leads: impl IntoIterator<Item = Lead>) -> Option<Lead> {
    leads.into_iter().min_by(|a, b| {
        a.fields
            .created_at
            .cmp(&b.fields.created_at)
            .then_with(|| a.id.cmp(&b.id))
    })
}
