use chrono::{DateTime, Utc};
use database::{
    identity::resolver::{ImportFailure, ImportSummary, Resolution, ResolutionKind},
    model::{
        caller::Caller,
        lead::Lead,
        payload::LeadPayload,
        report::{LeadReportRow, StageSummary},
    },
};
use serde::{Deserialize, Serialize};

use crate::session::Role;

// -- Requests

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub role: Option<String>,
}

impl LoginForm {
    pub fn is_admin_login(&self) -> bool {
        self.role.as_deref().map(str::trim) == Some("admin")
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct BulkDeleteRequest {
    pub ids: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct StageRequest {
    pub stage: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct PriorityRequest {
    pub priority: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct ImportRequest {
    pub leads: Vec<LeadPayload>,
}

#[derive(Deserialize, Debug)]
pub struct LeadListQuery {
    pub stage: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct CreateCallerRequest {
    pub username: String,
    pub password: String,
    pub role: Option<String>,
    pub status: Option<String>,
}

// -- Responses

#[derive(Serialize, Debug)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        SuccessResponse { success: true }
    }
}

#[derive(Serialize, Debug)]
pub struct LoginResponse {
    pub success: bool,
    pub user: String,
    pub role: Role,
    /// Same value as the cookie, for clients using `Authorization: Bearer`
    pub token: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub user: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize, Debug)]
pub struct LeadResponse {
    pub success: bool,
    pub lead: Lead,
}

#[derive(Serialize, Debug)]
pub struct LeadsResponse {
    pub success: bool,
    pub leads: Vec<Lead>,
}

#[derive(Serialize, Debug)]
pub struct CustomersResponse {
    pub success: bool,
    pub customers: Vec<Lead>,
}

#[derive(Serialize, Debug)]
pub struct SyncCustomersResponse {
    pub success: bool,
    pub inserted: usize,
}

/// Just enough of a lead to show the store answers
#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoreCheckLead {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Lead> for StoreCheckLead {
    fn from(lead: Lead) -> Self {
        StoreCheckLead {
            id: lead.id.0,
            name: lead.fields.name,
            email: lead.fields.email,
            created_at: lead.fields.created_at,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StoreCheckResponse {
    Success { data: Vec<StoreCheckLead> },
    Error { message: String },
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadResponse {
    pub success: bool,
    pub id: String,
    pub merged: bool,
    pub operation_kind: ResolutionKind,
}

impl From<Resolution> for CreateLeadResponse {
    fn from(resolution: Resolution) -> Self {
        CreateLeadResponse {
            success: true,
            id: resolution.id.to_string(),
            merged: resolution.kind == ResolutionKind::Merge,
            operation_kind: resolution.kind,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct BulkDeleteResponse {
    pub success: bool,
    pub deleted: usize,
}

#[derive(Serialize, Debug)]
pub struct ImportErrorView {
    pub index: usize,
    pub lead: LeadPayload,
    pub error: String,
}

impl From<ImportFailure> for ImportErrorView {
    fn from(failure: ImportFailure) -> Self {
        ImportErrorView {
            index: failure.index,
            lead: failure.input,
            error: failure.error.to_string(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ImportResponse {
    pub success: bool,
    pub imported: usize,
    pub updated: usize,
    pub errors: Vec<ImportErrorView>,
}

impl From<ImportSummary> for ImportResponse {
    fn from(summary: ImportSummary) -> Self {
        ImportResponse {
            success: true,
            imported: summary.inserted,
            updated: summary.updated,
            errors: summary.failures.into_iter().map(ImportErrorView::from).collect(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct DataResponse<T: Serialize> {
    pub success: bool,
    pub data: Vec<T>,
}

#[derive(Serialize, Debug)]
pub struct PipelineResponse {
    pub success: bool,
    pub summary: Vec<StageSummary>,
}

#[derive(Serialize, Debug)]
pub struct ReportResponse {
    pub success: bool,
    pub leads: Vec<LeadReportRow>,
}

/// Caller without its password hash
#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallerView {
    pub username: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Caller> for CallerView {
    fn from(caller: Caller) -> Self {
        CallerView {
            username: caller.username,
            role: caller.role,
            status: caller.status,
            created_at: caller.created_at,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct CallerResponse {
    pub success: bool,
    pub caller: CallerView,
}

#[derive(Serialize, Debug)]
pub struct CallersResponse {
    pub success: bool,
    pub callers: Vec<CallerView>,
}
