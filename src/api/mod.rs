//! OpenIKT Backend API
//!
//! Endpoint functions grouped by backend application:
//!
//! - [`auth`]: sign up, log in, log out
//! - [`quilt_diff`]: repositories, quilt diff overviews and details, export
//! - [`image_comparison`]: OS images, image comparisons, packages
//!
//! Every endpoint has a pure `*_config` builder returning the
//! [`RequestConfig`](crate::request::RequestConfig) it sends, and an async
//! function dispatching it through a shared
//! [`IktRequest`](crate::request::IktRequest). Optional arguments that are
//! unset, empty or zero are left out of the query string.

pub mod auth;
pub mod image_comparison;
pub mod quilt_diff;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::RequestError;

/// Response wrapper used by the backend's JSON endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// 0 on success, an error code otherwise
    #[serde(default)]
    pub code: i64,
    pub data: T,
    #[serde(default)]
    pub msg: String,
    /// A string, or extra structured data such as pagination counts
    #[serde(default)]
    pub detail: Value,
}

/// Select option as returned by type and repository lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelValue {
    pub label: String,
    pub value: Value,
}

/// Rows of a data table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData<T = Value> {
    #[serde(rename = "tableData", default)]
    pub table_data: Vec<T>,
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

pub(crate) fn non_zero(value: Option<u64>) -> Option<u64> {
    value.filter(|v| *v != 0)
}

pub(crate) fn to_body<T: Serialize>(data: &T) -> Result<Value, RequestError> {
    serde_json::to_value(data).map_err(|e| RequestError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_with_object_detail() {
        let body = json!({
            "code": 0,
            "data": [{"subject": "fix"}],
            "msg": "",
            "detail": {"patchCount": 1, "upsCount": 0}
        });
        let envelope: Envelope<Vec<Value>> = serde_json::from_value(body).unwrap();
        assert_eq!(envelope.code, 0);
        assert_eq!(envelope.data.len(), 1);
        assert_eq!(envelope.detail["patchCount"], 1);
    }

    #[test]
    fn test_falsy_helpers() {
        assert_eq!(non_empty(Some("")), None);
        assert_eq!(non_empty(Some("zlib")), Some("zlib"));
        assert_eq!(non_zero(Some(0)), None);
        assert_eq!(non_zero(Some(4)), Some(4));
    }
}
