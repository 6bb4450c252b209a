use actix_web::{get, web::Data, HttpResponse};
use database::store::table::filter::LeadQuery;

use crate::{
    errors::blocking,
    models::{StoreCheckLead, StoreCheckResponse},
    state::AppState,
};

const STORE_CHECK_LEADS: usize = 5;

/// Reads the newest leads to show the store answers. Needs no login.
#[get("/test-db")]
pub async fn store_check(state: Data<AppState>) -> HttpResponse {
    let store = state.store.clone();

    match blocking(move || store.list(LeadQuery::all())).await {
        Ok(leads) => HttpResponse::Ok().json(StoreCheckResponse::Success {
            data: leads
                .into_iter()
                .take(STORE_CHECK_LEADS)
                .map(StoreCheckLead::from)
                .collect(),
        }),
        Err(e) => {
            log::error!("Store check failed: {}", e);

            HttpResponse::InternalServerError().json(StoreCheckResponse::Error {
                message: e.to_string(),
            })
        }
    }
}
