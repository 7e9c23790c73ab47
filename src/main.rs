use actix_web::{middleware, web, App, HttpServer};
use log::{error, info, warn};

use gridvault::api;
use gridvault::app_state::AppState;
use gridvault::config::AppConfig;

fn init_logging(config_file: &str) {
    if let Err(e) = log4rs::init_file(config_file, Default::default()) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        warn!("Could not load log config {}: {}. Falling back to env_logger", config_file, e);
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config.logging.config_file);

    let app_state = match AppState::from_config(config) {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    let server = &app_state.config.server;
    let host = server.host.clone();
    let port = server.port;
    let workers = server.workers;
    let max_payload_size = server.max_payload_size;

    info!("Starting server on {}:{} with {} workers", host, port, workers);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(app_state.clone())
            .app_data(web::PayloadConfig::default().limit(max_payload_size))
            .configure(api::configure)
    })
    .workers(workers)
    .bind((host.as_str(), port))?
    .run()
    .await
}
