//! Cookie Access
//!
//! Read-only view of the cookies the browser-side session would carry.

use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;

/// Source of cookie values, read once per request
pub trait CookieSource: Send + Sync {
    /// Decoded value of the cookie called `name`
    fn get(&self, name: &str) -> Option<String>;
}

/// Cookies held by a `reqwest` jar for one origin.
///
/// Share the same jar with the HTTP client so that cookies set by the
/// server (for example after logging in) become visible here.
pub struct JarCookies {
    jar: Arc<Jar>,
    url: Url,
}

impl JarCookies {
    pub fn new(jar: Arc<Jar>, url: Url) -> Self {
        Self { jar, url }
    }
}

impl CookieSource for JarCookies {
    fn get(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.url)?;
        let header = header.to_str().ok()?;
        find_cookie(header, name)
    }
}

impl CookieSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Find a cookie in a `Cookie:` header value and percent-decode it
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| decode_value(value.trim_matches('"')))
}

fn decode_value(value: &str) -> String {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}
