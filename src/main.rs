use actix_cors::Cors;
use actix_web::{
    middleware::{self, Condition},
    web::{self, Data},
    App, HttpServer,
};
use anyhow::Context;
use chrono::Duration;
use clap::Parser;
use database::store::options::StoreEngine;
use leadline::{
    config::{mask, Cli},
    routes,
    state::{prepare_store, AppState},
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Cli::parse();

    let store_options = args.store_options()?;
    let store = StoreEngine::get_store(&store_options);

    // Network engines block on their own runtime, never call them from this one
    let init_store = store.clone();
    let seed_test_caller = args.seed_test_caller;

    web::block(move || prepare_store(init_store.as_ref(), seed_test_caller))
        .await
        .context("store set-up did not finish")?
        .context("unable to prepare the store")?;

    let state = Data::new(AppState::new(
        store,
        store_options.policy,
        args.admin(),
        Duration::seconds(args.session_ttl_secs),
    ));

    log::info!(
        "Admin login enabled: username={} password={}",
        args.admin_user,
        mask(&args.admin_pass)
    );

    if args.seed_test_caller {
        log::info!("Default test caller (caller1) created if not present");
    }

    log::info!("Starting HTTP server on {}:{}", args.address, args.port);

    let log_http = args.log_http;

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(routes::configure)
            .wrap(Cors::permissive())
            .wrap(Condition::new(log_http, middleware::Logger::default()))
    })
    .workers(args.http_workers)
    .bind((args.address.as_str(), args.port))?
    .run()
    .await?;

    Ok(())
}
