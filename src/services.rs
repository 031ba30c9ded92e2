//! Application Services
//!
//! Wires the request wrapper the way the application uses it: one cookie
//! jar shared between the HTTP client and the CSRF interceptor, the
//! configured base URL and timeout, and the app router as the navigator
//! for not-found redirects.

use reqwest::cookie::Jar;
use reqwest::Url;
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;
use crate::request::{
    CsrfInterceptor, IktRequest, Interceptors, JarCookies, Notifier, RequestError,
    RequestSettings,
};
use crate::router::{app_router, Router, RouterError};

/// Errors raised while wiring the services
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Request setup failed: {0}")]
    Request(#[from] RequestError),

    #[error("Router setup failed: {0}")]
    Router(#[from] RouterError),
}

/// Shared request wrapper and router
pub struct Services {
    request: IktRequest,
    router: Arc<Router>,
    cookie_jar: Arc<Jar>,
    api_url: Url,
}

impl Services {
    pub fn new(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self, ServiceError> {
        let api_url = Url::parse(&config.api.base_url).map_err(|e| RequestError::InvalidUrl {
            url: config.api.base_url.clone(),
            reason: e.to_string(),
        })?;

        let cookie_jar = Arc::new(Jar::default());
        let cookies = Arc::new(JarCookies::new(Arc::clone(&cookie_jar), api_url.clone()));
        let csrf = CsrfInterceptor::new(cookies, &config.api.csrf_cookie, &config.api.csrf_header)?;

        let settings = RequestSettings {
            base_url: config.api.base_url.clone(),
            timeout: config.api.timeout(),
            interceptors: Interceptors::new().with_request(csrf),
            cookie_jar: Some(Arc::clone(&cookie_jar)),
        };

        let router = Arc::new(app_router(&config.router.base, &config.router.app_title)?);
        let request = IktRequest::new(settings)?
            .with_notifier(notifier)
            .with_navigator(router.clone());

        tracing::debug!("Services ready for {}", api_url);

        Ok(Self {
            request,
            router,
            cookie_jar,
            api_url,
        })
    }

    pub fn request(&self) -> &IktRequest {
        &self.request
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Store a cookie for the API origin, as if the server had set it
    pub fn set_cookie(&self, name: &str, value: &str) {
        let cookie = format!("{}={}; Path=/", name, urlencoding::encode(value));
        self.cookie_jar.add_cookie_str(&cookie, &self.api_url);
    }
}
