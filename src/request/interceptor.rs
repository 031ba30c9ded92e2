//! Interceptor Middleware
//!
//! Ordered lists of transforms applied before dispatch and after a
//! successful response. Closures with the right signature are interceptors
//! too.

use reqwest::header::{HeaderName, HeaderValue};
use std::fmt;
use std::sync::Arc;

use super::cookie::CookieSource;
use super::{RequestConfig, RequestError, Response};

/// Transforms a request configuration before it is sent
pub trait RequestInterceptor: Send + Sync {
    fn on_request(&self, config: RequestConfig) -> Result<RequestConfig, RequestError>;
}

impl<F> RequestInterceptor for F
where
    F: Fn(RequestConfig) -> Result<RequestConfig, RequestError> + Send + Sync,
{
    fn on_request(&self, config: RequestConfig) -> Result<RequestConfig, RequestError> {
        self(config)
    }
}

/// Transforms a successful response before its body is returned
pub trait ResponseInterceptor: Send + Sync {
    fn on_response(&self, response: Response) -> Result<Response, RequestError>;
}

impl<F> ResponseInterceptor for F
where
    F: Fn(Response) -> Result<Response, RequestError> + Send + Sync,
{
    fn on_response(&self, response: Response) -> Result<Response, RequestError> {
        self(response)
    }
}

/// Request and response middleware, applied in insertion order
#[derive(Clone, Default)]
pub struct Interceptors {
    request: Vec<Arc<dyn RequestInterceptor>>,
    response: Vec<Arc<dyn ResponseInterceptor>>,
}

impl Interceptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.request.push(Arc::new(interceptor));
        self
    }

    pub fn with_response(mut self, interceptor: impl ResponseInterceptor + 'static) -> Self {
        self.response.push(Arc::new(interceptor));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.request.is_empty() && self.response.is_empty()
    }

    pub fn apply_request(&self, config: RequestConfig) -> Result<RequestConfig, RequestError> {
        self.request
            .iter()
            .try_fold(config, |config, interceptor| interceptor.on_request(config))
    }

    pub fn apply_response(&self, response: Response) -> Result<Response, RequestError> {
        self.response
            .iter()
            .try_fold(response, |response, interceptor| interceptor.on_response(response))
    }
}

impl fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptors")
            .field("request", &self.request.len())
            .field("response", &self.response.len())
            .finish()
    }
}

/// Copies the CSRF cookie into a request header.
///
/// When the cookie is missing or empty the configuration passes through
/// untouched.
pub struct CsrfInterceptor {
    cookies: Arc<dyn CookieSource>,
    cookie_name: String,
    header_name: HeaderName,
}

impl CsrfInterceptor {
    pub fn new(
        cookies: Arc<dyn CookieSource>,
        cookie_name: impl Into<String>,
        header_name: &str,
    ) -> Result<Self, RequestError> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .map_err(|e| RequestError::Interceptor(format!("invalid header name: {}", e)))?;
        Ok(Self {
            cookies,
            cookie_name: cookie_name.into(),
            header_name,
        })
    }
}

impl RequestInterceptor for CsrfInterceptor {
    fn on_request(&self, mut config: RequestConfig) -> Result<RequestConfig, RequestError> {
        let Some(token) = self.cookies.get(&self.cookie_name).filter(|t| !t.is_empty()) else {
            return Ok(config);
        };

        match HeaderValue::from_str(&token) {
            Ok(value) => {
                config.headers.insert(self.header_name.clone(), value);
            }
            Err(_) => {
                tracing::warn!(
                    "Cookie {} is not a valid header value, skipping",
                    self.cookie_name
                );
            }
        }
        Ok(config)
    }
}
