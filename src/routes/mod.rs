use actix_files as fs;
use actix_web::{web, Either, HttpResponse, Responder};
use log::debug;

use crate::matchmaking::MatchQueue;
use crate::models::AppState;

/// HTTP handler for the index page; serves `index.html` from the static
/// directory when there is one.
pub async fn index(app_state: web::Data<AppState>) -> Either<fs::NamedFile, HttpResponse> {
    let page = app_state.config.static_dir.join("index.html");
    match fs::NamedFile::open_async(&page).await {
        Ok(file) => Either::Left(file),
        Err(e) => {
            debug!("No index page at {}: {}", page.display(), e);
            Either::Right(HttpResponse::Ok().body("Chess Lobby"))
        }
    }
}

/// Players currently waiting for a quick match
pub async fn list_queue(app_state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(app_state.queue.entries())
}

/// Configure the HTTP routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(crate::websocket::ws_index)))
        .service(web::resource("/api/queue").route(web::get().to(list_queue)))
        .service(web::resource("/").route(web::get().to(index)));
}

/// Static assets under `/static`
pub fn static_files(dir: &std::path::Path) -> fs::Files {
    fs::Files::new("/static", dir).show_files_listing()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ledger::CaptureLedger;
    use crate::matchmaking::{QueueEntry, SharedQueue};
    use crate::websocket::BroadcastHub;
    use actix::Actor;
    use actix_web::{test, App};

    fn state(queue: SharedQueue) -> web::Data<AppState> {
        let (ledger, _records) = CaptureLedger::channel();
        web::Data::new(AppState {
            hub: BroadcastHub::default().start(),
            queue,
            ledger,
            config: Config {
                static_dir: std::env::temp_dir().join("chess-lobby-missing-static"),
                ..Config::default()
            },
        })
    }

    #[actix_web::test]
    async fn queue_route_lists_live_entries() {
        let queue = SharedQueue::default();
        queue.enqueue(QueueEntry {
            id: "m1".to_string(),
            created_at: queue.now_millis(),
            label: "Alice".to_string(),
        });
        let app = test::init_service(App::new().app_data(state(queue)).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/api/queue").to_request();
        let entries: Vec<QueueEntry> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "Alice");
    }

    #[actix_web::test]
    async fn index_falls_back_to_text() {
        let app = test::init_service(
            App::new()
                .app_data(state(SharedQueue::default()))
                .configure(configure_routes),
        )
        .await;
        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body = test::read_body(resp).await;
        assert_eq!(body, "Chess Lobby");
    }
}
