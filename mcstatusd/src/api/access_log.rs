use std::time::Instant;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shared::protocol::FAVICON_PROBE;
use crate::api::routes::AppState;

/// Log one line per request, skipping favicon probes unless configured.
pub async fn log_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    if should_log(&path, state.log_favicon_requests) {
        tracing::info!(
            "{} {} {} {:?}",
            method,
            path,
            response.status().as_u16(),
            started.elapsed()
        );
    }

    response
}

pub fn should_log(path: &str, log_favicon_requests: bool) -> bool {
    log_favicon_requests || !path.ends_with(&format!("/{}", FAVICON_PROBE))
}
