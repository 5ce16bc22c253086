use std::io;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};

use crate::config::ServerConfig;
use crate::handlers;
use crate::state::AppState;

pub async fn run_server(config: ServerConfig) -> io::Result<()> {
    let port = config.port;
    let state = web::Data::new(AppState::new(&config));

    // Bring the MCP session up in the background; a failed first connect is
    // not fatal, call_tool connects lazily.
    {
        let session = state.session.clone();
        tokio::spawn(async move {
            if let Err(e) = session.initialize().await {
                log::warn!("Initial MCP connect failed: {}", e);
            }
        });
    }

    let shutdown_state = state.clone();

    log::info!("Listening on 0.0.0.0:{}", port);
    let result = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .service(
                web::scope("/api/v1")
                    .route("/query", web::post().to(handlers::query::handler))
                    .route("/query/stream", web::post().to(handlers::stream::handler))
                    .route("/health", web::get().to(handlers::health::handler)),
            )
    })
    .bind(format!("0.0.0.0:{}", port))?
    .run()
    .await;

    shutdown_state.shutdown().await;
    result
}
