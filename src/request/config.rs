//! Per-call request configuration

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;

use super::interceptor::{Interceptors, RequestInterceptor, ResponseInterceptor};

/// How the response body should be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Parse as JSON, keeping the raw text when it is not valid JSON
    #[default]
    Json,
    Text,
    /// Raw bytes (spreadsheets and other binary downloads)
    ArrayBuffer,
}

/// Configuration for a single request.
///
/// Built fresh for every call and consumed by
/// [`IktRequest::request`](super::IktRequest::request).
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Path relative to the base URL, or an absolute URL
    pub url: String,
    pub method: Method,
    /// Query parameters; `None` values are left out of the query string
    pub params: Vec<(String, Option<String>)>,
    /// JSON request body
    pub data: Option<Value>,
    pub response_type: ResponseType,
    pub headers: HeaderMap,
    /// Interceptors that only apply to this call
    pub interceptors: Interceptors,
}

impl RequestConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), Some(value.to_string())));
        self
    }

    /// Add a query parameter that is omitted when `value` is `None`
    pub fn param_opt<V: ToString>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.params.push((key.into(), value.map(|v| v.to_string())));
        self
    }

    /// Set the JSON body
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn request_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.interceptors = self.interceptors.with_request(interceptor);
        self
    }

    pub fn response_interceptor(
        mut self,
        interceptor: impl ResponseInterceptor + 'static,
    ) -> Self {
        self.interceptors = self.interceptors.with_response(interceptor);
        self
    }

    /// Query pairs that will actually be sent
    pub fn query_pairs(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
            .collect()
    }

    /// Value of a query parameter that will be sent
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query_pairs()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}
