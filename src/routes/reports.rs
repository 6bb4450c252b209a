use actix_web::{get, post, web::Data, HttpResponse};
use database::{
    consts::consts::WON_STAGE,
    customers::sync_won_leads,
    model::lead::Lead,
    reports,
    store::table::filter::LeadQuery,
};

use crate::{
    auth::CurrentUser,
    errors::{blocking, ApiError},
    models::{
        CustomersResponse, DataResponse, PipelineResponse, ReportResponse, SyncCustomersResponse,
    },
    state::AppState,
};

/// Aggregations run over the full lead list, newest first
async fn all_leads(state: &AppState) -> Result<Vec<Lead>, ApiError> {
    let store = state.store.clone();

    blocking(move || store.list(LeadQuery::all())).await
}

#[get("/api/customers")]
pub async fn customers(_user: CurrentUser, state: Data<AppState>) -> Result<HttpResponse, ApiError> {
    let store = state.store.clone();

    let customers = blocking(move || store.list(LeadQuery::stage(WON_STAGE))).await?;

    Ok(HttpResponse::Ok().json(CustomersResponse {
        success: true,
        customers,
    }))
}

/// Won leads without a customer record get one, returns how many were created
#[post("/api/leads/sync-to-customers")]
pub async fn sync_customers(
    _user: CurrentUser,
    state: Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let store = state.store.clone();

    let inserted = blocking(move || sync_won_leads(store.as_ref())).await?;

    Ok(HttpResponse::Ok().json(SyncCustomersResponse {
        success: true,
        inserted,
    }))
}

#[get("/api/reports/leads")]
pub async fn lead_report(state: Data<AppState>) -> Result<HttpResponse, ApiError> {
    let leads = all_leads(&state).await?;

    Ok(HttpResponse::Ok().json(ReportResponse {
        success: true,
        leads: reports::lead_report(&leads),
    }))
}

#[get("/api/analytics/leads-by-source")]
pub async fn leads_by_source(
    _user: CurrentUser,
    state: Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let leads = all_leads(&state).await?;

    Ok(HttpResponse::Ok().json(DataResponse {
        success: true,
        data: reports::leads_by_source(&leads),
    }))
}

#[get("/api/analytics/leads-by-priority")]
pub async fn leads_by_priority(
    _user: CurrentUser,
    state: Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let leads = all_leads(&state).await?;

    Ok(HttpResponse::Ok().json(DataResponse {
        success: true,
        data: reports::leads_by_priority(&leads),
    }))
}

#[get("/api/analytics/leads-trend")]
pub async fn leads_trend(_user: CurrentUser, state: Data<AppState>) -> Result<HttpResponse, ApiError> {
    let leads = all_leads(&state).await?;

    Ok(HttpResponse::Ok().json(DataResponse {
        success: true,
        data: reports::leads_trend(&leads),
    }))
}

#[get("/api/pipeline/summary")]
pub async fn pipeline_summary(
    _user: CurrentUser,
    state: Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let leads = all_leads(&state).await?;

    Ok(HttpResponse::Ok().json(PipelineResponse {
        success: true,
        summary: reports::pipeline_summary(&leads),
    }))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};
    use chrono::{TimeZone, Utc};
    use database::{
        consts::consts::LeadId,
        model::lead::{Lead, LeadFields},
    };
    use serde_json::json;

    use crate::{
        routes::{
            configure,
            test_utils::{bearer, json_body, test_state},
        },
        session::Role,
    };

    use crate::state::AppState;

    fn seed(state: &AppState, id: &str, source: Option<&str>, stage: &str, value: f64) {
        let mut fields = LeadFields::new(Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap());
        fields.name = Some(format!("Lead {}", id));
        fields.source = source.map(str::to_string);
        fields.stage = stage.to_string();
        fields.value = value;

        state
            .store
            .insert(Lead::new(LeadId(id.to_string()), fields))
            .unwrap();
    }

    #[actix_web::test]
    async fn analytics_need_a_login() {
        let app = test::init_service(App::new().app_data(test_state(false)).configure(configure)).await;

        for uri in [
            "/api/customers",
            "/api/analytics/leads-by-source",
            "/api/analytics/leads-by-priority",
            "/api/analytics/leads-trend",
            "/api/pipeline/summary",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();

            assert_eq!(
                test::call_service(&app, req).await.status(),
                StatusCode::UNAUTHORIZED,
                "{}",
                uri
            );
        }
    }

    #[actix_web::test]
    async fn customers_are_won_leads() {
        let state = test_state(false);
        seed(&state, "1", Some("Web"), "Won", 10.0);
        seed(&state, "2", Some("Web"), "New Lead", 5.0);
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/api/customers")
            .insert_header(bearer(&state, Role::Caller))
            .to_request();
        let body = json_body(test::call_service(&app, req).await).await;

        let customers = body["customers"].as_array().unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0]["id"], "1");
    }

    #[actix_web::test]
    async fn sync_copies_won_leads_once() {
        // Given one won lead and one still open
        let state = test_state(false);
        seed(&state, "1", Some("Web"), "Won", 10.0);
        seed(&state, "2", Some("Web"), "New Lead", 5.0);
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let sync = || {
            test::TestRequest::post()
                .uri("/api/leads/sync-to-customers")
                .insert_header(bearer(&state, Role::Caller))
                .to_request()
        };

        // When the sync runs twice
        let first = json_body(test::call_service(&app, sync()).await).await;
        let second = json_body(test::call_service(&app, sync()).await).await;

        // Then only the first run creates the customer
        assert_eq!(first, json!({"success": true, "inserted": 1}));
        assert_eq!(second, json!({"success": true, "inserted": 0}));

        let customers = state.store.list_customers().unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].lead_id, LeadId("1".to_string()));
        assert_eq!(customers[0].lifetime_value, 10.0);
    }

    #[actix_web::test]
    async fn sync_needs_a_login() {
        let app = test::init_service(App::new().app_data(test_state(false)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/leads/sync-to-customers")
            .to_request();

        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn source_breakdown_and_pipeline() {
        let state = test_state(false);
        seed(&state, "1", Some("Web"), "Won", 10.0);
        seed(&state, "2", Some("Web"), "New Lead", 5.0);
        seed(&state, "3", None, "Won", 1.0);
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/api/analytics/leads-by-source")
            .insert_header(bearer(&state, Role::Caller))
            .to_request();
        let body = json_body(test::call_service(&app, req).await).await;

        assert_eq!(
            body,
            json!({"success": true, "data": [
                {"source": "Web", "count": 2, "value": 15.0},
                {"source": "Unknown", "count": 1, "value": 1.0}
            ]})
        );

        let req = test::TestRequest::get()
            .uri("/api/pipeline/summary")
            .insert_header(bearer(&state, Role::Admin))
            .to_request();
        let body = json_body(test::call_service(&app, req).await).await;

        assert_eq!(body["summary"][0], json!({"stage": "Won", "count": 2, "value": 11.0}));

        let req = test::TestRequest::get()
            .uri("/api/analytics/leads-trend")
            .insert_header(bearer(&state, Role::Caller))
            .to_request();
        let body = json_body(test::call_service(&app, req).await).await;

        assert_eq!(body["data"], json!([{"month": "2024-03", "count": 3}]));
    }

    #[actix_web::test]
    async fn lead_report_is_public() {
        let state = test_state(false);
        seed(&state, "1", Some("Web"), "Won", 10.0);
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/reports/leads").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["leads"][0]["created_at"], "2024-03-10");
    }
}
