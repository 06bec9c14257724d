use actix::Actor;
use actix_web::{web, App, HttpServer};
use log::{error, info};
use std::io;

use chess_lobby::config::Config;
use chess_lobby::ledger::{self, CaptureLedger};
use chess_lobby::matchmaking::SharedQueue;
use chess_lobby::models::AppState;
use chess_lobby::routes::{configure_routes, static_files};
use chess_lobby::websocket::BroadcastHub;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::load().map_err(|e| {
        error!("Cannot start: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let bind_address = config.bind_address.clone();
    let static_dir = config.static_dir.clone();
    info!("Starting chess lobby at http://{}", bind_address);

    let (capture_ledger, records) = CaptureLedger::channel();
    actix_rt::spawn(ledger::run_ledger(records, config.ledger_path.clone()));

    let app_state = web::Data::new(AppState {
        hub: BroadcastHub::default().start(),
        queue: SharedQueue::new(config.queue_ttl()),
        ledger: capture_ledger,
        config,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(configure_routes)
            .service(static_files(&static_dir))
    })
    .bind(bind_address.as_str())?
    .run()
    .await
}
