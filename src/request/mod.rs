//! Request Wrapper
//!
//! [`IktRequest`] wraps a `reqwest` client and adds:
//!
//! - **Middleware**: instance-wide and per-call interceptor lists
//! - **CSRF**: [`CsrfInterceptor`] forwards the `csrftoken` cookie as a header
//! - **Error reporting**: every failed call is shown once through the
//!   injected [`Notifier`], and a 404 redirects through the [`Navigator`]
//!
//! Errors are always returned to the caller after global handling.
//!
//! ```rust,no_run
//! use openikt_web::request::{IktRequest, RequestConfig, RequestSettings};
//!
//! # async fn run() -> Result<(), openikt_web::request::RequestError> {
//! let request = IktRequest::new(RequestSettings::new("http://localhost:8000"))?;
//! let repos = request.get(RequestConfig::new("/openikt/app_diff/repos")).await?;
//! # Ok(())
//! # }
//! ```

mod capability;
mod config;
mod cookie;
mod error;
mod interceptor;
mod response;

pub use capability::{Navigator, NoopNavigator, Notifier, StderrNotifier, TracingNotifier};
pub use config::{RequestConfig, ResponseType};
pub use cookie::{find_cookie, CookieSource, JarCookies};
pub use error::RequestError;
pub use interceptor::{CsrfInterceptor, Interceptors, RequestInterceptor, ResponseInterceptor};
pub use response::{ExportFile, Response, ResponseData};

use reqwest::cookie::Jar;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Route the wrapper redirects to when the server answers 404
pub const NOT_FOUND_PATH: &str = "/not-found";

/// Construction parameters for [`IktRequest`]
#[derive(Debug, Clone)]
pub struct RequestSettings {
    /// Prefix for relative request URLs
    pub base_url: String,
    /// Applied uniformly to every request
    pub timeout: Duration,
    /// Instance-wide interceptors, run after the per-call ones
    pub interceptors: Interceptors,
    /// Cookie jar shared with the HTTP client
    pub cookie_jar: Option<Arc<Jar>>,
}

impl RequestSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_millis(60_000),
            interceptors: Interceptors::default(),
            cookie_jar: None,
        }
    }
}

/// HTTP request wrapper with shared middleware and error handling
pub struct IktRequest {
    client: Client,
    base_url: String,
    timeout: Duration,
    interceptors: Interceptors,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl IktRequest {
    /// Create a wrapper that logs errors and ignores redirects.
    ///
    /// Use [`with_notifier`](Self::with_notifier) and
    /// [`with_navigator`](Self::with_navigator) to plug in the UI.
    pub fn new(settings: RequestSettings) -> Result<Self, RequestError> {
        Url::parse(&settings.base_url).map_err(|e| RequestError::InvalidUrl {
            url: settings.base_url.clone(),
            reason: e.to_string(),
        })?;

        let mut builder = Client::builder().timeout(settings.timeout);
        if let Some(jar) = settings.cookie_jar {
            builder = builder.cookie_provider(jar);
        }
        let client = builder
            .build()
            .map_err(|e| RequestError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout: settings.timeout,
            interceptors: settings.interceptors,
            notifier: Arc::new(TracingNotifier),
            navigator: Arc::new(NoopNavigator),
        })
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Perform a request and return its body.
    ///
    /// Per-call request interceptors run before the instance ones; on
    /// success the instance response interceptors run before the per-call
    /// ones.
    pub async fn request(&self, mut config: RequestConfig) -> Result<ResponseData, RequestError> {
        let call_interceptors = std::mem::take(&mut config.interceptors);
        let config = call_interceptors.apply_request(config)?;
        let config = self.interceptors.apply_request(config)?;

        let response = match self.dispatch(&config).await {
            Ok(response) => response,
            Err(err) => {
                self.handle_error(&err).await;
                return Err(err);
            }
        };

        let response = self.interceptors.apply_response(response)?;
        let response = call_interceptors.apply_response(response)?;
        Ok(response.data)
    }

    /// Perform a request and deserialize its JSON body
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        config: RequestConfig,
    ) -> Result<T, RequestError> {
        self.request(config).await?.json()
    }

    pub async fn get(&self, config: RequestConfig) -> Result<ResponseData, RequestError> {
        self.request(config.method(Method::GET)).await
    }

    pub async fn post(&self, config: RequestConfig) -> Result<ResponseData, RequestError> {
        self.request(config.method(Method::POST)).await
    }

    pub async fn put(&self, config: RequestConfig) -> Result<ResponseData, RequestError> {
        self.request(config.method(Method::PUT)).await
    }

    pub async fn patch(&self, config: RequestConfig) -> Result<ResponseData, RequestError> {
        self.request(config.method(Method::PATCH)).await
    }

    pub async fn delete(&self, config: RequestConfig) -> Result<ResponseData, RequestError> {
        self.request(config.method(Method::DELETE)).await
    }

    /// Join a request URL onto the base URL; absolute URLs are kept as-is
    fn resolve_url(&self, url: &str) -> Result<Url, RequestError> {
        let full = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        };

        Url::parse(&full).map_err(|e| RequestError::InvalidUrl {
            url: full,
            reason: e.to_string(),
        })
    }

    async fn dispatch(&self, config: &RequestConfig) -> Result<Response, RequestError> {
        let url = self.resolve_url(&config.url)?;
        tracing::debug!(method = %config.method, url = %url, "Dispatching request");

        let mut builder = self
            .client
            .request(config.method.clone(), url)
            .headers(config.headers.clone());

        let query = config.query_pairs();
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(body) = &config.data {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let headers = response.headers().clone();

        if !status.is_success() {
            // An unreadable error body still leaves the status to report
            let body = match response.bytes().await {
                Ok(bytes) => serde_json::from_slice::<Value>(&bytes).ok(),
                Err(e) => {
                    tracing::debug!("Failed to read error body: {}", e);
                    None
                }
            };
            return Err(RequestError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data = read_body(response, config.response_type)
            .await
            .map_err(|e| self.transport_error(e))?;

        Ok(Response {
            status,
            headers,
            data,
        })
    }

    fn transport_error(&self, error: reqwest::Error) -> RequestError {
        if error.is_timeout() {
            RequestError::Timeout(self.timeout.as_millis() as u64)
        } else {
            RequestError::Transport(error)
        }
    }

    async fn handle_error(&self, error: &RequestError) {
        tracing::warn!(error = %error, status = ?error.status(), "Request failed");
        self.notifier.error(&error.user_message());

        if error.is_not_found() {
            self.navigator.redirect(NOT_FOUND_PATH).await;
        }
    }
}

async fn read_body(
    response: reqwest::Response,
    response_type: ResponseType,
) -> Result<ResponseData, reqwest::Error> {
    let data = match response_type {
        ResponseType::ArrayBuffer => ResponseData::Bytes(response.bytes().await?.to_vec()),
        ResponseType::Text => ResponseData::Text(response.text().await?),
        ResponseType::Json => {
            let text = response.text().await?;
            if text.trim().is_empty() {
                ResponseData::Json(Value::Null)
            } else {
                match serde_json::from_str(&text) {
                    Ok(value) => ResponseData::Json(value),
                    Err(_) => ResponseData::Text(text),
                }
            }
        }
    };
    Ok(data)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use axum::extract::RawQuery;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
    use axum::routing::{get, post};
    use axum::Json;
    use serde_json::json;
    use std::collections::HashMap;

    async fn echo(headers: AxumHeaders, RawQuery(query): RawQuery) -> Json<Value> {
        Json(json!({
            "csrf": headers.get("x-csrftoken").and_then(|v| v.to_str().ok()),
            "query": query,
        }))
    }

    async fn echo_body(Json(body): Json<Value>) -> Json<Value> {
        Json(json!({ "received": body }))
    }

    fn test_app() -> axum::Router {
        axum::Router::new()
            .route("/echo", get(echo).post(echo_body))
            .route(
                "/bad",
                get(|| async {
                    (
                        AxumStatus::BAD_REQUEST,
                        Json(json!({"code": 1, "msg": "Bad input", "detail": "x"})),
                    )
                }),
            )
            .route(
                "/detail-only",
                get(|| async {
                    (
                        AxumStatus::FORBIDDEN,
                        Json(json!({"detail": "Not allowed"})),
                    )
                }),
            )
            .route(
                "/missing",
                get(|| async {
                    (
                        AxumStatus::NOT_FOUND,
                        Json(json!({"code": 21001, "msg": "Quilt Diff Not Found"})),
                    )
                }),
            )
            .route(
                "/plain-error",
                post(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "oops") }),
            )
    }

    struct Harness {
        request: IktRequest,
        notifier: Arc<RecordingNotifier>,
        navigator: Arc<RecordingNavigator>,
    }

    async fn harness(interceptors: Interceptors) -> Harness {
        let base_url = spawn_server(test_app()).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let navigator = Arc::new(RecordingNavigator::default());

        let settings = RequestSettings {
            interceptors,
            ..RequestSettings::new(base_url)
        };
        let request = IktRequest::new(settings)
            .unwrap()
            .with_notifier(notifier.clone())
            .with_navigator(navigator.clone());

        Harness {
            request,
            notifier,
            navigator,
        }
    }

    fn csrf_interceptors(cookies: HashMap<String, String>) -> Interceptors {
        let csrf = CsrfInterceptor::new(Arc::new(cookies), "csrftoken", "X-CSRFToken").unwrap();
        Interceptors::new().with_request(csrf)
    }

    #[tokio::test]
    async fn test_csrf_cookie_forwarded() {
        let cookies = HashMap::from([("csrftoken".to_string(), "abc123".to_string())]);
        let h = harness(csrf_interceptors(cookies)).await;

        let body: Value = h.request.request_json(RequestConfig::new("/echo")).await.unwrap();
        assert_eq!(body["csrf"], "abc123");
    }

    #[tokio::test]
    async fn test_no_csrf_header_without_cookie() {
        let h = harness(csrf_interceptors(HashMap::new())).await;

        let body: Value = h.request.request_json(RequestConfig::new("/echo")).await.unwrap();
        assert!(body["csrf"].is_null());
    }

    #[tokio::test]
    async fn test_unset_params_not_sent() {
        let h = harness(Interceptors::new()).await;

        let config = RequestConfig::new("/echo")
            .param("repoId", 3)
            .param_opt::<u64>("diffId", None);
        let body: Value = h.request.request_json(config).await.unwrap();
        assert_eq!(body["query"], "repoId=3");
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let h = harness(Interceptors::new()).await;

        let config = RequestConfig::new("echo").data(json!({"username": "jane"}));
        let body: Value = h.request.post(config).await.unwrap().json().unwrap();
        assert_eq!(body["received"]["username"], "jane");
    }

    #[tokio::test]
    async fn test_error_message_priority() {
        let h = harness(Interceptors::new()).await;

        let err = h.request.get(RequestConfig::new("/bad")).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        let err = h.request.get(RequestConfig::new("/detail-only")).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        h.request
            .post(RequestConfig::new("/plain-error"))
            .await
            .unwrap_err();

        let messages = h.notifier.messages.lock().unwrap().clone();
        assert_eq!(
            messages,
            vec![
                "Bad input".to_string(),
                "Not allowed".to_string(),
                "Request failed with status code 500".to_string(),
            ]
        );
        assert!(h.navigator.locations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_not_found_redirects() {
        let h = harness(Interceptors::new()).await;

        let err = h.request.get(RequestConfig::new("/missing")).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            *h.notifier.messages.lock().unwrap(),
            vec!["Quilt Diff Not Found".to_string()]
        );
        assert_eq!(
            *h.navigator.locations.lock().unwrap(),
            vec![NOT_FOUND_PATH.to_string()]
        );
    }

    #[tokio::test]
    async fn test_transport_error_reported() {
        let notifier = Arc::new(RecordingNotifier::default());
        let navigator = Arc::new(RecordingNavigator::default());
        // Nothing listens on port 9 locally
        let request = IktRequest::new(RequestSettings::new("http://127.0.0.1:9"))
            .unwrap()
            .with_notifier(notifier.clone())
            .with_navigator(navigator.clone());

        let err = request.get(RequestConfig::new("/echo")).await.unwrap_err();
        assert!(err.status().is_none());
        assert_eq!(notifier.messages.lock().unwrap().len(), 1);
        assert!(navigator.locations.lock().unwrap().is_empty());
    }

    fn mark(mut response: Response, marker: &str) -> Result<Response, RequestError> {
        if let ResponseData::Json(Value::Object(body)) = &mut response.data {
            let trail = body.entry("trail").or_insert_with(|| json!([]));
            if let Value::Array(trail) = trail {
                trail.push(json!(marker));
            }
        }
        Ok(response)
    }

    #[tokio::test]
    async fn test_call_request_interceptors_run_before_instance_ones() {
        let instance = Interceptors::new().with_request(
            |mut c: RequestConfig| -> Result<RequestConfig, RequestError> {
                c.params.push(("order".into(), Some("instance".into())));
                Ok(c)
            },
        );
        let h = harness(instance).await;

        let config = RequestConfig::new("/echo").request_interceptor(
            |mut c: RequestConfig| -> Result<RequestConfig, RequestError> {
                c.params.push(("order".into(), Some("call".into())));
                Ok(c)
            },
        );

        let body: Value = h.request.request_json(config).await.unwrap();
        assert_eq!(body["query"], "order=call&order=instance");
    }

    #[tokio::test]
    async fn test_instance_response_interceptors_run_before_call_ones() {
        let instance = Interceptors::new().with_response(
            |r: Response| -> Result<Response, RequestError> { mark(r, "instance") },
        );
        let h = harness(instance).await;

        let config = RequestConfig::new("/echo")
            .response_interceptor(|r: Response| -> Result<Response, RequestError> {
                mark(r, "call")
            });

        let body: Value = h.request.request_json(config).await.unwrap();
        assert_eq!(body["trail"], json!(["instance", "call"]));
    }

    #[tokio::test]
    async fn test_timeout_reported_once_without_redirect() {
        let app = axum::Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                "late"
            }),
        );
        let base_url = spawn_server(app).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let settings = RequestSettings {
            timeout: Duration::from_millis(50),
            ..RequestSettings::new(base_url)
        };
        let request = IktRequest::new(settings)
            .unwrap()
            .with_notifier(notifier.clone())
            .with_navigator(navigator.clone());

        let err = request.get(RequestConfig::new("/slow")).await.unwrap_err();
        assert!(matches!(err, RequestError::Timeout(50)));
        assert_eq!(
            *notifier.messages.lock().unwrap(),
            vec!["timeout of 50ms exceeded".to_string()]
        );
        assert!(navigator.locations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_truncated_error_body_keeps_status() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Promises more body bytes than it sends, then closes
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 100\r\n\r\n{\"msg\"")
                .await
                .unwrap();
        });

        let notifier = Arc::new(RecordingNotifier::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let request = IktRequest::new(RequestSettings::new(format!("http://{}", addr)))
            .unwrap()
            .with_notifier(notifier.clone())
            .with_navigator(navigator.clone());

        let err = request.get(RequestConfig::new("/gone")).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(err.body().is_none());
        assert_eq!(
            *notifier.messages.lock().unwrap(),
            vec!["Request failed with status code 404".to_string()]
        );
        assert_eq!(
            *navigator.locations.lock().unwrap(),
            vec![NOT_FOUND_PATH.to_string()]
        );
    }

    #[tokio::test]
    async fn test_response_interceptor_error_skips_notification() {
        let h = harness(Interceptors::new()).await;

        let config = RequestConfig::new("/echo").response_interceptor(
            |_: Response| -> Result<Response, RequestError> { Err(RequestError::MissingFilename) },
        );
        let err = h.request.get(config).await.unwrap_err();
        assert!(matches!(err, RequestError::MissingFilename));
        assert!(h.notifier.messages.lock().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_base_url() {
        let result = IktRequest::new(RequestSettings::new("not a url"));
        assert!(matches!(result, Err(RequestError::InvalidUrl { .. })));
    }

    #[test]
    fn test_resolve_url() {
        let request = IktRequest::new(RequestSettings::new("http://host/v1/")).unwrap();
        assert_eq!(
            request.resolve_url("/openikt/app_ii/images").unwrap().as_str(),
            "http://host/v1/openikt/app_ii/images"
        );
        assert_eq!(
            request.resolve_url("https://other/x").unwrap().as_str(),
            "https://other/x"
        );
    }
}
