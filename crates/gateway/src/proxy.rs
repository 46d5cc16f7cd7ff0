use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Response};
use lumen_core::AppError;

use crate::app::AppState;

/// Reverse-proxies `/api/{service}/{*rest}` to the matching downstream
/// service, forwarding method, headers (including `Authorization`, which
/// the gateway never inspects — downstream services validate it
/// themselves), query string and body unchanged.
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    Path((service, rest)): Path<(String, String)>,
    req: axum::extract::Request,
) -> Result<Response<Body>, AppError> {
    let base = state
        .config
        .upstream(&service)
        .ok_or_else(|| AppError::not_found(format!("unknown service '{service}'")))?;

    if state.health.is_down(&service) {
        return Err(AppError::UpstreamUnavailable(format!("{service} is currently unavailable")));
    }

    let (parts, body) = req.into_parts();
    let query = parts.uri.query().map(|q| format!("?{q}")).unwrap_or_default();
    let url = format!("{base}/{rest}{query}");

    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| AppError::Internal(format!("failed reading request body: {e}")))?;

    let mut builder = state.http.request(parts.method.clone(), &url);
    for (name, value) in parts.headers.iter() {
        if name == header::HOST {
            continue;
        }
        builder = builder.header(name, value);
    }

    let start = Instant::now();
    let upstream_result = builder.body(body_bytes).send().await;

    match upstream_result {
        Ok(resp) => {
            state.health.record_success(&service, start.elapsed().as_millis() as u64);

            let status = resp.status();
            let headers = resp.headers().clone();
            let bytes = resp.bytes().await.map_err(AppError::from)?;

            let mut response = Response::builder().status(status);
            for (name, value) in headers.iter() {
                if name == header::TRANSFER_ENCODING {
                    continue;
                }
                response = response.header(name, value);
            }
            response
                .body(Body::from(bytes))
                .map_err(|e| AppError::Internal(format!("failed building proxied response: {e}")))
        }
        Err(e) => {
            state.health.record_error(&service);
            Err(AppError::from(e))
        }
    }
}
