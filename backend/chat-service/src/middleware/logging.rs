use axum::http::{Request, Response};
use axum::Router;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::Span;

/// One span per request carrying method, path, and protocol version;
/// status and latency are recorded when the response goes out.
pub fn add_tracing(router: Router) -> Router {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request<_>| {
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    version = ?req.version(),
                )
            })
            .on_response(|res: &Response<_>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = res.status().as_u16(),
                    latency_us = latency.as_micros() as u64,
                    "completed"
                );
            }),
    )
}
