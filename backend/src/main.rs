mod analysis;
mod config;
mod inference;
mod palette;
mod routes;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use config::AppConfig;
use inference::client::{OpenAiVisionClient, VisionClient};
use routes::configure_routes;
use std::env;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    // Built once and shared by every worker.
    let client: Arc<dyn VisionClient> = Arc::new(OpenAiVisionClient::new(&config).map_err(|e| {
        log::error!("Failed to create inference client: {}", e);
        std::io::Error::other(e.to_string())
    })?);
    let client = web::Data::from(client);
    let settings = web::Data::new(config.settings.clone());

    log::info!(
        "Using model {} via {} (max_tokens={}, timeout={}s)",
        config.settings.inference.model,
        config.base_url,
        config.settings.inference.max_tokens,
        config.settings.inference.timeout_secs
    );
    log::info!("Serving frontend from {}", config.frontend_dir);

    let bind_address = config.bind_address();
    let frontend_dir = config.frontend_dir.clone();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(client.clone())
            .app_data(settings.clone())
            .configure(|cfg| configure_routes(cfg, frontend_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
