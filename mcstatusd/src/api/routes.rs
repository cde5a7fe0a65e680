use std::any::Any;
use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use shared::protocol::FAVICON_PROBE;
use shared::types::Edition;
use crate::api::access_log;
use crate::status::StatusService;

const LANDING_PAGE: &str = include_str!("landing.html");

#[derive(Clone)]
pub struct AppState {
    pub status: Arc<StatusService>,
    pub log_favicon_requests: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/bedrock/:address", get(get_bedrock))
        .route("/:address", get(get_java))
        .layer(CatchPanicLayer::custom(internal_error))
        .layer(middleware::from_fn_with_state(state.clone(), access_log::log_request))
        .with_state(state)
}

async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

async fn get_java(State(state): State<AppState>, Path(address): Path<String>) -> Response {
    lookup(&state, &address, Edition::Java).await
}

async fn get_bedrock(State(state): State<AppState>, Path(address): Path<String>) -> Response {
    lookup(&state, &address, Edition::Bedrock).await
}

async fn lookup(state: &AppState, address: &str, edition: Edition) -> Response {
    // Browsers ask for /favicon.ico on their own; that is not a server
    if address == FAVICON_PROBE {
        return StatusCode::NO_CONTENT.into_response();
    }

    Json(state.status.get_status(address, edition).await).into_response()
}

fn internal_error(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Request handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": "Internal Server Error" })),
    )
        .into_response()
}
