//! Development Server
//!
//! Serves the built frontend and forwards API calls to a backend during
//! development.
//!
//! # Routes
//!
//! - `{proxy_prefix}/*path` - forwarded to `{proxy_target}/{path}` with the
//!   prefix removed; method, query, headers and body are passed through
//! - `{router base}/*` - static files from `static_dir`, falling back to
//!   `index.html` so history-mode URLs load the app

use axum::{
    body::{Body, Bytes},
    extract::{OriginalUri, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::config::DevServerConfig;

/// Headers that only make sense for a single connection
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "content-length",
    "host",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
];

/// Development server errors
#[derive(Debug, Error)]
pub enum DevServerError {
    #[error("No proxy target configured")]
    NoTarget,

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for DevServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            DevServerError::NoTarget => (StatusCode::SERVICE_UNAVAILABLE, "NO_PROXY_TARGET"),
            DevServerError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            DevServerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            DevServerError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        };
        tracing::warn!("Proxy error: {}", self);

        let body = ErrorBody {
            code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

struct ProxyState {
    client: reqwest::Client,
    target: Option<String>,
    prefix: String,
}

/// Build the dev server router
pub fn build_router(config: &DevServerConfig, router_base: &str) -> Result<Router, DevServerError> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| DevServerError::Upstream(e.to_string()))?;

    let prefix = format!("/{}", config.proxy_prefix.trim_matches('/'));
    let state = Arc::new(ProxyState {
        client,
        target: config
            .proxy_target
            .as_ref()
            .map(|t| t.trim_end_matches('/').to_string()),
        prefix: prefix.clone(),
    });

    let mut router = Router::new().route(&format!("{}/*path", prefix), any(proxy));

    if let Some(dir) = &config.static_dir {
        let index = std::path::Path::new(dir).join("index.html");
        let assets = ServeDir::new(dir).fallback(ServeFile::new(index));
        let base = router_base.trim_matches('/');
        router = if base.is_empty() {
            router.fallback_service(assets)
        } else {
            router.nest_service(&format!("/{}", base), assets)
        };
    }

    Ok(router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state))
}

/// Start the dev server
pub async fn serve(config: &DevServerConfig, router_base: &str) -> Result<(), DevServerError> {
    let router = build_router(config, router_base)?;

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("OpenIKT dev server listening on {}", addr);
    match &config.proxy_target {
        Some(target) => tracing::info!("Proxying {}/* to {}", config.proxy_prefix, target),
        None => tracing::warn!("No proxy target set, {}/* requests will fail", config.proxy_prefix),
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Dev server shut down");
    Ok(())
}

async fn proxy(
    State(state): State<Arc<ProxyState>>,
    OriginalUri(uri): OriginalUri,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, DevServerError> {
    let target = state.target.as_ref().ok_or(DevServerError::NoTarget)?;

    // Raw path, percent-encoding untouched
    let path = uri.path().strip_prefix(state.prefix.as_str()).unwrap_or(uri.path());
    let mut url = format!("{}{}", target, path);
    if let Some(query) = uri.query() {
        url.push('?');
        url.push_str(query);
    }

    let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
        .map_err(|e| DevServerError::InvalidRequest(e.to_string()))?;
    tracing::debug!("Proxying {} {}", method, url);

    let upstream = state
        .client
        .request(method, &url)
        .headers(forward_request_headers(&headers))
        .body(body)
        .send()
        .await
        .map_err(|e| DevServerError::Upstream(e.to_string()))?;

    let status = StatusCode::from_u16(upstream.status().as_u16())
        .map_err(|e| DevServerError::Upstream(e.to_string()))?;

    let mut response = Response::builder().status(status);
    for (name, value) in upstream.headers() {
        if !HOP_BY_HOP.contains(&name.as_str()) {
            response = response.header(name.as_str(), value.as_bytes());
        }
    }

    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| DevServerError::Upstream(e.to_string()))?;

    response
        .body(Body::from(bytes))
        .map_err(|e| DevServerError::Upstream(e.to_string()))
}

/// Copy end-to-end headers; the client sets `host` for the target
fn forward_request_headers(headers: &HeaderMap) -> reqwest::header::HeaderMap {
    let mut forwarded = reqwest::header::HeaderMap::new();
    for (name, value) in headers {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        let name = reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes());
        let value = reqwest::header::HeaderValue::from_bytes(value.as_bytes());
        if let (Ok(name), Ok(value)) = (name, value) {
            forwarded.append(name, value);
        }
    }
    forwarded
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
