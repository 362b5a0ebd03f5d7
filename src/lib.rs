//! jwtauth keeps users signed in with a self-contained, signed cookie.
//!
//! No session is stored server-side: [`session::SessionManager`] issues,
//! validates, refreshes and revokes a JSON web token held in the `token`
//! cookie.

#![forbid(unsafe_code)]
pub mod clock;
pub mod config;
pub mod cookie;
pub mod error;
mod router;
pub mod session;
pub mod telemetry;
pub mod token;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{StatusCode, header};
use axum::routing::{get, post};
use axum::{Router, middleware as AxumMiddleware};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::LatencyUnit;
use tower_http::sensitive_headers::{
    SetSensitiveRequestHeadersLayer, SetSensitiveResponseHeadersLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

pub use error::Error;

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: axum::http::Method,
    path: &str,
    token: Option<&str>,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request
            .header(header::COOKIE, format!("{}={token}", cookie::TOKEN_COOKIE));
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// Collect `tracing` output emitted on the current thread.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl LogBuffer {
    /// Record every event, down to `TRACE`, until the guard is dropped.
    pub fn capture() -> (Self, tracing::subscriber::DefaultGuard) {
        let logs = Self::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        (logs, tracing::subscriber::set_default(subscriber))
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[cfg(test)]
impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// State with a manually driven clock.
#[cfg(test)]
pub fn test_state(clock: Arc<clock::FixedClock>) -> AppState {
    let mut config = config::Configuration::default();
    config.token.secret = "YourSecretKey123".into();
    config.token.ttl = 3600;

    AppState {
        sessions: session::SessionManager::new(
            Arc::new(token::HmacSigner::default()),
            clock,
        ),
        config: Arc::new(config),
        metrics: None,
    }
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub sessions: session::SessionManager,
    pub metrics: Option<PrometheusHandle>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Remove sensitive request headers from trace.
        .layer(SetSensitiveRequestHeadersLayer::new([header::COOKIE]))
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Response headers are marked before reaching the trace layer.
        .layer(SetSensitiveResponseHeadersLayer::new([header::SET_COOKIE]))
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)));

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::handler))
        .route("/metrics", get(router::status::metrics))
        // `POST /auth` issues a session.
        .route("/auth", post(router::auth::handler))
        .route("/user", get(router::user::handler))
        .route("/refresh", post(router::refresh::handler))
        .route("/signout", post(router::signout::handler))
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(CookieManagerLayer::new())
        .layer(middleware)
}

/// Initialize the application state.
pub fn initialize_state(
    config: config::Configuration,
    metrics: Option<PrometheusHandle>,
) -> Result<AppState, Box<dyn std::error::Error>> {
    if config.token.secret.is_empty() {
        tracing::error!("missing `token.secret` entry on `config.yaml` file");
        return Err("token secret must not be empty".into());
    }

    if config.token.ttl <= 0 {
        tracing::error!(ttl = config.token.ttl, "`token.ttl` must be positive");
        return Err(error::Error::InvalidTtl(config.token.ttl).into());
    }

    let signer = token::HmacSigner::new(config.token.algorithm)?;
    let sessions =
        session::SessionManager::new(Arc::new(signer), Arc::new(clock::SystemClock))
            .with_cookie(config.cookie.clone());

    Ok(AppState {
        config: Arc::new(config),
        sessions,
        metrics,
    })
}
