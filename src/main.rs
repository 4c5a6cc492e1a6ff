use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod engine;
mod model;
mod models;
mod routes;
mod store;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::engine::{
    Clock, SystemClock, attendance::AttendanceEngine, leave::LeaveService, report::ReportEngine,
    settings::Settings,
};
use crate::store::{LogNotificationSink, Repositories, mysql::MySqlStore};
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Field attendance service"
}

fn startup_error(e: anyhow::Error) -> std::io::Error {
    std::io::Error::other(format!("{e:#}"))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env().map_err(startup_error)?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "attendance.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let level = config
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::DEBUG);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await.map_err(startup_error)?;

    let repos = Repositories::from_backend(
        Arc::new(MySqlStore::new(pool)),
        Arc::new(LogNotificationSink),
    );
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let settings = Arc::new(Settings::new(repos.config.clone(), config.store_timeout));

    let attendance = Data::new(AttendanceEngine::new(
        repos.clone(),
        settings.clone(),
        clock.clone(),
        config.store_timeout,
    ));
    let reports = Data::new(ReportEngine::new(
        repos.clone(),
        settings.clone(),
        clock,
        config.absent_cutoff,
        config.store_timeout,
    ));
    let leaves = Data::new(LeaveService::new(
        repos.leaves.clone(),
        repos.directory.clone(),
        repos.notifications.clone(),
        config.store_timeout,
    ));
    let settings = Data::from(settings);
    let repos = Data::new(repos);

    let limiters = routes::Limiters::from_config(&config).map_err(startup_error)?;

    // Clone values for the closure (avoid move issues)
    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(repos.clone())
            .app_data(settings.clone())
            .app_data(attendance.clone())
            .app_data(reports.clone())
            .app_data(leaves.clone())
            .service(index)
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config_data, &limiters))
    })
    .bind(server_addr)?
    .run()
    .await
}
