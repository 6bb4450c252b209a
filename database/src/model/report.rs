use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SourceSummary {
    pub source: String,
    pub count: u64,
    pub value: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PrioritySummary {
    pub priority: String,
    pub count: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StageSummary {
    pub stage: String,
    pub count: u64,
    pub value: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MonthlyCount {
    /// `YYYY-MM`
    pub month: String,
    pub count: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LeadReportRow {
    pub id: String,
    pub name: Option<String>,
    pub source: Option<String>,
    pub stage: String,
    pub value: f64,
    pub priority: String,
    /// `YYYY-MM-DD`
    pub created_at: String,
}
