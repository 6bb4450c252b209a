use actix_web::{
    delete, get, patch, post, put,
    web::{self, Data},
    HttpResponse,
};
use chrono::Utc;
use database::{
    consts::consts::LeadId,
    identity::resolver::ResolutionKind,
    model::{
        lead::{LeadPatch, UpdateOutcome},
        payload::LeadPayload,
    },
    store::table::filter::LeadQuery,
};

use crate::{
    auth::CurrentUser,
    errors::{blocking, ApiError},
    models::{
        BulkDeleteRequest, BulkDeleteResponse, CreateLeadResponse, ImportRequest, ImportResponse,
        LeadListQuery, LeadResponse, LeadsResponse, PriorityRequest, StageRequest,
        SuccessResponse,
    },
    state::AppState,
};

fn lead_not_found() -> ApiError {
    ApiError::NotFound("Lead not found".to_string())
}

fn updated_or_not_found(outcome: UpdateOutcome) -> Result<HttpResponse, ApiError> {
    match outcome {
        UpdateOutcome::Updated => Ok(HttpResponse::Ok().json(SuccessResponse::ok())),
        UpdateOutcome::NotFound => Err(lead_not_found()),
    }
}

/// Blank values count as missing
fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(ApiError::BadRequest(message.to_string())),
    }
}

async fn apply_patch(
    state: &AppState,
    id: String,
    patch: LeadPatch,
) -> Result<HttpResponse, ApiError> {
    let store = state.store.clone();

    let outcome = blocking(move || store.patch(&LeadId(id), patch)).await?;

    updated_or_not_found(outcome)
}

#[get("/api/leads")]
pub async fn list_leads(
    state: Data<AppState>,
    query: web::Query<LeadListQuery>,
) -> Result<HttpResponse, ApiError> {
    let store = state.store.clone();
    let query = LeadQuery::from_stage_filter(query.stage.as_deref());

    let leads = blocking(move || store.list(query)).await?;

    Ok(HttpResponse::Ok().json(LeadsResponse {
        success: true,
        leads,
    }))
}

#[get("/api/leads/{id}")]
pub async fn get_lead(
    state: Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let store = state.store.clone();
    let id = LeadId(path.into_inner());

    let lead = blocking(move || store.get(&id))
        .await?
        .ok_or_else(lead_not_found)?;

    Ok(HttpResponse::Ok().json(LeadResponse {
        success: true,
        lead,
    }))
}

/// Creates a lead or merges it into the one with the same phone / email
#[post("/api/leads")]
pub async fn create_lead(
    state: Data<AppState>,
    payload: web::Json<LeadPayload>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();

    if !LeadPayload::has_text(&payload.name) {
        return Err(ApiError::BadRequest("Missing required field: name".to_string()));
    }

    let resolver = state.resolver.clone();

    let resolution = blocking(move || resolver.resolve(&payload)).await?;

    let mut response = match resolution.kind {
        ResolutionKind::Insert => HttpResponse::Created(),
        ResolutionKind::Merge => HttpResponse::Ok(),
    };

    Ok(response.json(CreateLeadResponse::from(resolution)))
}

/// Replaces every field, omitted ones go back to their defaults
#[put("/api/leads/{id}")]
pub async fn update_lead(
    state: Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<LeadPayload>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();

    let complete = [&payload.name, &payload.phone, &payload.city]
        .into_iter()
        .all(LeadPayload::has_text);

    if !complete {
        return Err(ApiError::BadRequest(
            "Missing required fields: name, phone, city".to_string(),
        ));
    }

    let store = state.store.clone();
    let id = LeadId(path.into_inner());
    let fields = payload.to_fields(Utc::now());

    let outcome = blocking(move || store.update(&id, fields)).await?;

    updated_or_not_found(outcome)
}

#[patch("/api/leads/{id}")]
pub async fn patch_lead(
    state: Data<AppState>,
    path: web::Path<String>,
    patch: web::Json<LeadPatch>,
) -> Result<HttpResponse, ApiError> {
    let patch = patch.into_inner();

    if patch.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    apply_patch(&state, path.into_inner(), patch).await
}

#[delete("/api/leads/{id}")]
pub async fn delete_lead(
    _user: CurrentUser,
    state: Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let store = state.store.clone();
    let id = LeadId(path.into_inner());

    match blocking(move || store.delete(&id)).await? {
        true => Ok(HttpResponse::Ok().json(SuccessResponse::ok())),
        false => Err(lead_not_found()),
    }
}

#[post("/api/leads/bulk-delete")]
pub async fn bulk_delete_leads(
    state: Data<AppState>,
    request: web::Json<BulkDeleteRequest>,
) -> Result<HttpResponse, ApiError> {
    let ids: Vec<LeadId> = request.into_inner().ids.into_iter().map(LeadId).collect();

    if ids.is_empty() {
        return Err(ApiError::BadRequest("No lead IDs provided".to_string()));
    }

    let store = state.store.clone();

    let deleted = blocking(move || store.delete_many(ids)).await?;

    Ok(HttpResponse::Ok().json(BulkDeleteResponse {
        success: true,
        deleted,
    }))
}

#[patch("/api/leads/{id}/stage")]
pub async fn patch_stage(
    state: Data<AppState>,
    path: web::Path<String>,
    request: web::Json<StageRequest>,
) -> Result<HttpResponse, ApiError> {
    let stage = required(request.into_inner().stage, "Missing 'stage'")?;

    apply_patch(&state, path.into_inner(), LeadPatch::stage(stage)).await
}

#[patch("/api/leads/{id}/priority")]
pub async fn patch_priority(
    state: Data<AppState>,
    path: web::Path<String>,
    request: web::Json<PriorityRequest>,
) -> Result<HttpResponse, ApiError> {
    let priority = required(request.into_inner().priority, "Missing 'priority'")?;

    apply_patch(&state, path.into_inner(), LeadPatch::priority(priority)).await
}

/// Every entry is resolved like a single create, failures are reported per entry
#[post("/api/leads/import")]
pub async fn import_leads(
    state: Data<AppState>,
    request: web::Json<ImportRequest>,
) -> Result<HttpResponse, ApiError> {
    let leads = request.into_inner().leads;

    if leads.is_empty() {
        return Err(ApiError::BadRequest("No leads provided".to_string()));
    }

    let resolver = state.resolver.clone();

    let summary = web::block(move || resolver.import(leads)).await?;

    Ok(HttpResponse::Ok().json(ImportResponse::from(summary)))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};
    use serde_json::json;

    use crate::{
        routes::{
            configure,
            test_utils::{bearer, json_body, test_state},
        },
        session::Role,
    };

    use super::*;

    mod create {
        use super::*;

        #[actix_web::test]
        async fn name_is_required() {
            let app = test::init_service(App::new().app_data(test_state(false)).configure(configure)).await;

            let req = test::TestRequest::post()
                .uri("/api/leads")
                .set_json(json!({"phone": "5551234567"}))
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                json_body(resp).await,
                json!({"success": false, "error": "Missing required field: name"})
            );
        }

        #[actix_web::test]
        async fn second_submission_of_the_same_phone_merges() {
            // Given a lead created through the API
            let state = test_state(false);
            let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

            let req = test::TestRequest::post()
                .uri("/api/leads")
                .set_json(json!({"name": "Jane", "phone": "5551234567", "stage": "Qualified"}))
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::CREATED);
            let created = json_body(resp).await;
            assert_eq!(created["operationKind"], "insert");
            assert_eq!(created["merged"], false);

            // When the same person comes in again with a formatted phone
            let req = test::TestRequest::post()
                .uri("/api/leads")
                .set_json(json!({"name": "Jane Doe", "phone": "+1 (555) 123-4567"}))
                .to_request();
            let resp = test::call_service(&app, req).await;

            // Then it is a merge into the first lead, omitted stage back to its default
            assert_eq!(resp.status(), StatusCode::OK);
            let merged = json_body(resp).await;
            assert_eq!(merged["operationKind"], "merge");
            assert_eq!(merged["merged"], true);
            assert_eq!(merged["id"], created["id"]);

            let leads = state.store.list(LeadQuery::all()).unwrap();
            assert_eq!(leads.len(), 1);
            assert_eq!(leads[0].fields.name.as_deref(), Some("Jane Doe"));
            assert_eq!(leads[0].fields.stage, "New Lead");
        }

        #[actix_web::test]
        async fn malformed_json_is_a_bad_request() {
            let app = test::init_service(App::new().app_data(test_state(false)).configure(configure)).await;

            let req = test::TestRequest::post()
                .uri("/api/leads")
                .insert_header(("Content-Type", "application/json"))
                .set_payload("{not json")
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(resp).await["success"], false);
        }
    }

    mod read {
        use super::*;

        #[actix_web::test]
        async fn missing_lead_is_not_found() {
            let app = test::init_service(App::new().app_data(test_state(false)).configure(configure)).await;

            let req = test::TestRequest::get().uri("/api/leads/nope").to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
            assert_eq!(json_body(resp).await["error"], "Lead not found");
        }

        #[actix_web::test]
        async fn list_filters_by_stage() {
            let state = test_state(false);
            let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

            for (name, stage) in [("A", "Won"), ("B", "New Lead"), ("C", "Won")] {
                let req = test::TestRequest::post()
                    .uri("/api/leads")
                    .set_json(json!({"name": name, "stage": stage}))
                    .to_request();
                test::call_service(&app, req).await;
            }

            let req = test::TestRequest::get().uri("/api/leads?stage=Won").to_request();
            let body = json_body(test::call_service(&app, req).await).await;

            assert_eq!(body["success"], true);
            assert_eq!(body["leads"].as_array().unwrap().len(), 2);

            let req = test::TestRequest::get().uri("/api/leads").to_request();
            let body = json_body(test::call_service(&app, req).await).await;

            assert_eq!(body["leads"].as_array().unwrap().len(), 3);
        }
    }

    fn seed(state: &AppState, id: &str) -> LeadId {
        let mut fields = database::model::lead::LeadFields::new(Utc::now());
        fields.name = Some("Jane".to_string());
        fields.phone = Some("5551234567".to_string());
        fields.city = Some("Pune".to_string());
        fields.priority = "Hot".to_string();
        fields.stage = "Qualified".to_string();

        state
            .store
            .insert(database::model::lead::Lead::new(LeadId(id.to_string()), fields))
            .unwrap()
    }

    mod update {
        use super::*;

        #[actix_web::test]
        async fn put_needs_name_phone_and_city() {
            let state = test_state(false);
            seed(&state, "1");
            let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

            let req = test::TestRequest::put()
                .uri("/api/leads/1")
                .set_json(json!({"name": "Jane", "phone": " "}))
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                json_body(resp).await["error"],
                "Missing required fields: name, phone, city"
            );
        }

        #[actix_web::test]
        async fn put_overwrites_everything() {
            let state = test_state(false);
            let id = seed(&state, "1");
            let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

            let req = test::TestRequest::put()
                .uri("/api/leads/1")
                .set_json(json!({"name": "Jo", "phone": "5550000000", "city": "Goa", "value": "12.5"}))
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::OK);

            let stored = state.store.get(&id).unwrap().unwrap();
            assert_eq!(stored.fields.city.as_deref(), Some("Goa"));
            assert_eq!(stored.fields.value, 12.5);
            assert_eq!(stored.fields.stage, "New Lead");
            assert_eq!(stored.fields.priority, "Warm");
        }

        #[actix_web::test]
        async fn put_on_a_missing_lead_is_not_found() {
            let app = test::init_service(App::new().app_data(test_state(false)).configure(configure)).await;

            let req = test::TestRequest::put()
                .uri("/api/leads/missing")
                .set_json(json!({"name": "Jo", "phone": "5550000000", "city": "Goa"}))
                .to_request();

            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
        }

        #[actix_web::test]
        async fn patch_keeps_untouched_fields() {
            let state = test_state(false);
            let id = seed(&state, "1");
            let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

            let req = test::TestRequest::patch()
                .uri("/api/leads/1")
                .set_json(json!({"notes": "call back monday"}))
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::OK);

            let stored = state.store.get(&id).unwrap().unwrap();
            assert_eq!(stored.fields.notes.as_deref(), Some("call back monday"));
            assert_eq!(stored.fields.stage, "Qualified");
            assert_eq!(stored.fields.priority, "Hot");
        }

        #[actix_web::test]
        async fn empty_patch_is_rejected() {
            let state = test_state(false);
            seed(&state, "1");
            let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

            let req = test::TestRequest::patch()
                .uri("/api/leads/1")
                .set_json(json!({}))
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(resp).await["error"], "No fields to update");
        }

        #[actix_web::test]
        async fn stage_and_priority_have_their_own_routes() {
            let state = test_state(false);
            let id = seed(&state, "1");
            let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

            let req = test::TestRequest::patch()
                .uri("/api/leads/1/stage")
                .set_json(json!({"stage": "Won"}))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

            let req = test::TestRequest::patch()
                .uri("/api/leads/1/priority")
                .set_json(json!({"priority": ""}))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(resp).await["error"], "Missing 'priority'");

            let req = test::TestRequest::patch()
                .uri("/api/leads/nope/stage")
                .set_json(json!({"stage": "Won"}))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

            let stored = state.store.get(&id).unwrap().unwrap();
            assert_eq!(stored.fields.stage, "Won");
            assert_eq!(stored.fields.priority, "Hot");
        }
    }

    mod delete {
        use super::*;

        #[actix_web::test]
        async fn delete_needs_a_login() {
            let state = test_state(false);
            seed(&state, "1");
            let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

            let req = test::TestRequest::delete().uri("/api/leads/1").to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            assert!(state.store.get(&LeadId("1".to_string())).unwrap().is_some());
        }

        #[actix_web::test]
        async fn logged_in_delete_removes_the_lead_once() {
            let state = test_state(false);
            seed(&state, "1");
            let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

            let req = test::TestRequest::delete()
                .uri("/api/leads/1")
                .insert_header(bearer(&state, Role::Caller))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

            let req = test::TestRequest::delete()
                .uri("/api/leads/1")
                .insert_header(bearer(&state, Role::Caller))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
        }

        #[actix_web::test]
        async fn bulk_delete_counts_what_existed() {
            let state = test_state(false);
            seed(&state, "1");
            seed(&state, "2");
            let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

            let req = test::TestRequest::post()
                .uri("/api/leads/bulk-delete")
                .set_json(json!({"ids": ["1", "2", "3"]}))
                .to_request();
            let body = json_body(test::call_service(&app, req).await).await;

            assert_eq!(body, json!({"success": true, "deleted": 2}));

            let req = test::TestRequest::post()
                .uri("/api/leads/bulk-delete")
                .set_json(json!({"ids": []}))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
        }
    }

    mod import {
        use super::*;

        #[actix_web::test]
        async fn import_reports_inserts_and_merges() {
            let state = test_state(false);
            let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

            let req = test::TestRequest::post()
                .uri("/api/leads/import")
                .set_json(json!({"leads": [
                    {"phone": "555-000-1111", "name": "A"},
                    {"phone": "5550001111", "name": "B"},
                    {"email": "c@x.com", "name": "C", "value": "oops"}
                ]}))
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(
                json_body(resp).await,
                json!({"success": true, "imported": 2, "updated": 1, "errors": []})
            );
            assert_eq!(state.store.list(LeadQuery::all()).unwrap().len(), 2);
        }

        #[actix_web::test]
        async fn failed_entries_are_listed_with_their_input() {
            // Given a stored lead whose id an import entry reuses
            let state = test_state(false);
            seed(&state, "lead-1");
            let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

            let req = test::TestRequest::post()
                .uri("/api/leads/import")
                .set_json(json!({"leads": [
                    {"name": "Fresh", "email": "fresh@x.com"},
                    {"id": "lead-1", "name": "Clash"}
                ]}))
                .to_request();
            let resp = test::call_service(&app, req).await;

            // Then the batch succeeds and the clashing entry is reported on its own
            assert_eq!(resp.status(), StatusCode::OK);
            let body = json_body(resp).await;
            assert_eq!(body["imported"], 1);
            assert_eq!(body["updated"], 0);

            let errors = body["errors"].as_array().unwrap();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0]["index"], 1);
            assert_eq!(errors[0]["lead"]["id"], "lead-1");
            assert_eq!(errors[0]["lead"]["name"], "Clash");
            assert_eq!(errors[0]["error"], "Cannot create, record already exists: lead-1");

            let stored = state.store.get(&LeadId("lead-1".to_string())).unwrap().unwrap();
            assert_eq!(stored.fields.name.as_deref(), Some("Jane"));
        }

        #[actix_web::test]
        async fn empty_import_is_rejected() {
            let app = test::init_service(App::new().app_data(test_state(false)).configure(configure)).await;

            let req = test::TestRequest::post()
                .uri("/api/leads/import")
                .set_json(json!({"leads": []}))
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(resp).await["error"], "No leads provided");
        }
    }
}
