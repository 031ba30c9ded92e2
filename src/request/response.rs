//! Response types

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::RequestError;

/// A successful response as seen by response interceptors
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub data: ResponseData,
}

impl Response {
    /// Header value as a string, if present and valid UTF-8
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A file returned by the server together with its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub data: Vec<u8>,
    pub filename: String,
}

/// Response body, after interceptors have run
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
    File(ExportFile),
}

impl ResponseData {
    /// Deserialize a JSON body into `T`
    pub fn json<T: DeserializeOwned>(self) -> Result<T, RequestError> {
        match self {
            ResponseData::Json(value) => {
                serde_json::from_value(value).map_err(|e| RequestError::Decode(e.to_string()))
            }
            other => Err(RequestError::Decode(format!(
                "expected a JSON body, got {}",
                other.kind()
            ))),
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, RequestError> {
        match self {
            ResponseData::Bytes(bytes) => Ok(bytes),
            ResponseData::Text(text) => Ok(text.into_bytes()),
            ResponseData::File(file) => Ok(file.data),
            ResponseData::Json(_) => Err(RequestError::Decode(
                "expected a binary body, got JSON".to_string(),
            )),
        }
    }

    pub fn into_file(self) -> Result<ExportFile, RequestError> {
        match self {
            ResponseData::File(file) => Ok(file),
            other => Err(RequestError::Decode(format!(
                "expected a file, got {}",
                other.kind()
            ))),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ResponseData::Json(_) => "JSON",
            ResponseData::Text(_) => "text",
            ResponseData::Bytes(_) => "bytes",
            ResponseData::File(_) => "a file",
        }
    }
}
