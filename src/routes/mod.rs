use actix_web::web;

use crate::errors::ApiError;

pub mod callers;
pub mod health;
pub mod leads;
pub mod login;
pub mod reports;

/// Registers every route. Fixed paths go before `{id}` ones.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::FormConfig::default()
            .error_handler(|err, _| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| ApiError::BadRequest(err.to_string()).into()),
    )
    // Session
    .service(login::login)
    .service(login::logout)
    .service(login::current_session)
    .service(health::store_check)
    // Leads
    .service(leads::bulk_delete_leads)
    .service(reports::sync_customers)
    .service(leads::import_leads)
    .service(leads::list_leads)
    .service(leads::create_lead)
    .service(leads::patch_stage)
    .service(leads::patch_priority)
    .service(leads::get_lead)
    .service(leads::update_lead)
    .service(leads::patch_lead)
    .service(leads::delete_lead)
    // Reports
    .service(reports::customers)
    .service(reports::lead_report)
    .service(reports::leads_by_source)
    .service(reports::leads_by_priority)
    .service(reports::leads_trend)
    .service(reports::pipeline_summary)
    // Callers
    .service(callers::list_callers)
    .service(callers::create_caller);
}
