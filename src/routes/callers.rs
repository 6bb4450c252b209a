use actix_web::{
    get, post,
    web::{self, Data},
    HttpResponse,
};
use database::{model::caller::Caller, store::StoreError};

use crate::{
    auth::{hash_password, AdminUser},
    errors::{blocking, ApiError},
    models::{CallerResponse, CallerView, CallersResponse, CreateCallerRequest},
    state::AppState,
};

#[get("/api/callers")]
pub async fn list_callers(_admin: AdminUser, state: Data<AppState>) -> Result<HttpResponse, ApiError> {
    let store = state.store.clone();

    let callers = blocking(move || store.list_callers()).await?;

    Ok(HttpResponse::Ok().json(CallersResponse {
        success: true,
        callers: callers.into_iter().map(CallerView::from).collect(),
    }))
}

#[post("/api/callers")]
pub async fn create_caller(
    _admin: AdminUser,
    state: Data<AppState>,
    request: web::Json<CreateCallerRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    let username = request.username.trim().to_string();

    if username.is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Missing required fields: username, password".to_string(),
        ));
    }

    let store = state.store.clone();

    let caller = blocking(move || {
        let mut caller = Caller::new(username, hash_password(&request.password)?);

        if let Some(role) = request.role.filter(|r| !r.trim().is_empty()) {
            caller.role = role.trim().to_string();
        }

        if let Some(status) = request.status.filter(|s| !s.trim().is_empty()) {
            caller.status = status.trim().to_lowercase();
        }

        match store.insert_caller(caller.clone()) {
            Ok(()) => Ok(caller),
            Err(StoreError::Duplicate(_)) => Err(ApiError::Conflict(format!(
                "Caller {} already exists.",
                caller.username
            ))),
            Err(err) => Err(err.into()),
        }
    })
    .await?;

    log::info!("Created caller {}", caller.username);

    Ok(HttpResponse::Created().json(CallerResponse {
        success: true,
        caller: CallerView::from(caller),
    }))
}
