use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{Method, header},
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use std::sync::Arc;

use crate::{deduct, ocr::OcrClient, receipts, types::health::Health};
use engine::Engine;

/// Largest accepted request body (receipt photos and PDFs).
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub ocr: OcrClient,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "healthy".to_string(),
        service: "hsa-receipt-api".to_string(),
    })
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/receipts", get(receipts::list))
        .route("/api/receipts/upload", post(receipts::upload))
        .route("/api/receipts/deduct", post(deduct::deduct))
        .route("/api/receipts/mark-used", post(receipts::mark_used))
        .route(
            "/api/receipts/{id}",
            get(receipts::get)
                .put(receipts::update)
                .delete(receipts::delete),
        )
        .route("/receipts/file/{id}", get(receipts::file))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors())
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    ocr: OcrClient,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        ocr,
    };

    axum::serve(listener, router(state)).await
}
