//! Account endpoints

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::request::{IktRequest, RequestConfig, RequestError};

const AUTH_PREFIX: &str = "/openikt/auth";

/// Body returned by the account endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

pub fn sign_up_config(username: &str, password: &str, email: &str) -> RequestConfig {
    RequestConfig::new(format!("{}/sign-up", AUTH_PREFIX)).data(json!({
        "username": username,
        "password": password,
        "email": email,
    }))
}

pub fn log_in_config(username: &str, password: &str) -> RequestConfig {
    RequestConfig::new(format!("{}/login", AUTH_PREFIX)).data(json!({
        "username": username,
        "password": password,
    }))
}

pub fn log_out_config() -> RequestConfig {
    RequestConfig::new(format!("{}/logout", AUTH_PREFIX))
}

/// Register a new account
pub async fn sign_up(
    request: &IktRequest,
    username: &str,
    password: &str,
    email: &str,
) -> Result<AuthResponse, RequestError> {
    request
        .post(sign_up_config(username, password, email))
        .await?
        .json()
}

/// Start a session. The server answers with session and CSRF cookies.
pub async fn log_in(
    request: &IktRequest,
    username: &str,
    password: &str,
) -> Result<AuthResponse, RequestError> {
    request.post(log_in_config(username, password)).await?.json()
}

pub async fn log_out(request: &IktRequest) -> Result<AuthResponse, RequestError> {
    request.get(log_out_config()).await?.json()
}
