//! Image comparison endpoints

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{non_empty, non_zero, to_body, Envelope, LabelValue, TableData};
use crate::request::{IktRequest, RequestConfig, RequestError};

const IMAGE_PREFIX: &str = "/openikt/app_ii";

/// A new OS image to import before comparing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewImage {
    pub os: String,
    pub name: String,
    pub release: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Name of a previously uploaded raw package list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageValue {
    /// Name of an image the server already knows
    Existing(String),
    Import(NewImage),
}

/// One side of an image comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSelection {
    pub is_import: bool,
    pub value: ImageValue,
}

impl ImageSelection {
    pub fn existing(name: impl Into<String>) -> Self {
        Self {
            is_import: false,
            value: ImageValue::Existing(name.into()),
        }
    }

    pub fn import(image: NewImage) -> Self {
        Self {
            is_import: true,
            value: ImageValue::Import(image),
        }
    }
}

/// Body of a create request: the two images to compare
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateImageComparison {
    #[serde(rename = "imgA")]
    pub img_a: ImageSelection,
    #[serde(rename = "imgB")]
    pub img_b: ImageSelection,
}

fn endpoint(path: &str) -> String {
    format!("{}/{}", IMAGE_PREFIX, path)
}

pub fn image_comparison_list_config() -> RequestConfig {
    RequestConfig::new(endpoint("images"))
}

pub fn image_comparison_table_data_config(image_comparison_id: Option<u64>) -> RequestConfig {
    RequestConfig::new(endpoint("image_list")).param_opt("imageId", non_zero(image_comparison_id))
}

pub fn image_list_config() -> RequestConfig {
    RequestConfig::new(endpoint("image_data"))
}

pub fn os_list_config() -> RequestConfig {
    RequestConfig::new(endpoint("os_list"))
}

pub fn verify_create_image_exist_config(image_a_name: &str, image_b_name: &str) -> RequestConfig {
    RequestConfig::new(endpoint("diff_exist"))
        .param("imgA", image_a_name)
        .param("imgB", image_b_name)
}

pub fn verify_create_image_name_config(image_name: &str) -> RequestConfig {
    RequestConfig::new(endpoint("name_verify")).param("name", image_name)
}

pub fn verify_create_image_url_config(image_url: &str) -> RequestConfig {
    RequestConfig::new(endpoint("url_verify")).param("url", image_url)
}

pub fn create_image_comparison_config(
    data: &CreateImageComparison,
) -> Result<RequestConfig, RequestError> {
    Ok(RequestConfig::new(endpoint("create")).data(to_body(data)?))
}

pub fn package_type_list_config() -> RequestConfig {
    RequestConfig::new(endpoint("pkg_type"))
}

pub fn image_comparison_details_config(
    image_comparison_id: u64,
    package_types: &[String],
    package_name: Option<&str>,
) -> RequestConfig {
    let diff_type = package_types.join(",");
    RequestConfig::new(endpoint("image_diff_pkg"))
        .param("DiffId", image_comparison_id)
        .param_opt("diffType", non_empty(Some(diff_type.as_str())))
        .param_opt("packageName", non_empty(package_name))
}

pub fn package_details_config(package_id: u64) -> RequestConfig {
    RequestConfig::new(endpoint("pkg_detail")).param("PackageId", package_id)
}

/// All image comparisons
pub async fn get_image_comparison_list(
    request: &IktRequest,
) -> Result<Envelope<Vec<Value>>, RequestError> {
    request.get(image_comparison_list_config()).await?.json()
}

/// Table rows, optionally narrowed to one comparison
pub async fn get_image_comparison_table_data(
    request: &IktRequest,
    image_comparison_id: Option<u64>,
) -> Result<Envelope<TableData>, RequestError> {
    request
        .get(image_comparison_table_data_config(image_comparison_id))
        .await?
        .json()
}

/// All imported OS images
pub async fn get_image_list(request: &IktRequest) -> Result<Envelope<Vec<Value>>, RequestError> {
    request.get(image_list_config()).await?.json()
}

pub async fn get_os_list(request: &IktRequest) -> Result<Envelope<Vec<LabelValue>>, RequestError> {
    request.get(os_list_config()).await?.json()
}

/// Whether a comparison between the two images already exists
pub async fn verify_create_image_exist(
    request: &IktRequest,
    image_a_name: &str,
    image_b_name: &str,
) -> Result<Value, RequestError> {
    request
        .get(verify_create_image_exist_config(image_a_name, image_b_name))
        .await?
        .json()
}

/// `true` when no image is registered under `image_name` yet
pub async fn verify_create_image_name(
    request: &IktRequest,
    image_name: &str,
) -> Result<bool, RequestError> {
    request
        .get(verify_create_image_name_config(image_name))
        .await?
        .json()
}

pub async fn verify_create_image_url(
    request: &IktRequest,
    image_url: &str,
) -> Result<Value, RequestError> {
    request
        .get(verify_create_image_url_config(image_url))
        .await?
        .json()
}

/// Import images as needed and trigger the comparison job
pub async fn create_image_comparison(
    request: &IktRequest,
    data: &CreateImageComparison,
) -> Result<Envelope<Value>, RequestError> {
    request
        .post(create_image_comparison_config(data)?)
        .await?
        .json()
}

pub async fn get_package_type_list(
    request: &IktRequest,
) -> Result<Envelope<Vec<LabelValue>>, RequestError> {
    request.get(package_type_list_config()).await?.json()
}

/// Package differences of one comparison, filtered by type and name
pub async fn get_image_comparison_details(
    request: &IktRequest,
    image_comparison_id: u64,
    package_types: &[String],
    package_name: Option<&str>,
) -> Result<Envelope<TableData>, RequestError> {
    request
        .get(image_comparison_details_config(
            image_comparison_id,
            package_types,
            package_name,
        ))
        .await?
        .json()
}

pub async fn get_package_details(
    request: &IktRequest,
    package_id: u64,
) -> Result<Envelope<Vec<Value>>, RequestError> {
    request.get(package_details_config(package_id)).await?.json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::test_support::*;
    use crate::request::RequestSettings;
    use axum::extract::Query;
    use axum::routing::get;
    use axum::Json;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_details_omits_unset_filters() {
        let config = image_comparison_details_config(4, &[], None);
        assert_eq!(config.url, "/openikt/app_ii/image_diff_pkg");
        assert_eq!(config.query_pairs(), vec![("DiffId", "4")]);

        let config = image_comparison_details_config(4, &[], Some(""));
        assert_eq!(config.query_pairs(), vec![("DiffId", "4")]);
    }

    #[test]
    fn test_details_joins_package_types() {
        let types = vec!["1".to_string(), "3".to_string()];
        let config = image_comparison_details_config(4, &types, Some("openssl"));
        assert_eq!(
            config.query_pairs(),
            vec![("DiffId", "4"), ("diffType", "1,3"), ("packageName", "openssl")]
        );
    }

    #[test]
    fn test_table_data_omits_unset_id() {
        assert!(image_comparison_table_data_config(None).query_pairs().is_empty());
        assert_eq!(
            image_comparison_table_data_config(Some(2)).query_value("imageId"),
            Some("2")
        );
    }

    #[test]
    fn test_verify_configs() {
        let config = verify_create_image_exist_config("img-a", "img b");
        assert_eq!(config.query_pairs(), vec![("imgA", "img-a"), ("imgB", "img b")]);
        assert_eq!(
            verify_create_image_name_config("x").query_value("name"),
            Some("x")
        );
        assert_eq!(
            verify_create_image_url_config("https://x/y.html").query_value("url"),
            Some("https://x/y.html")
        );
        assert_eq!(package_details_config(11).query_value("PackageId"), Some("11"));
    }

    #[test]
    fn test_create_body_shape() {
        let data = CreateImageComparison {
            img_a: ImageSelection::existing("ubuntu-22.04"),
            img_b: ImageSelection::import(NewImage {
                os: "ubuntu".into(),
                name: "ubuntu-24.04".into(),
                release: "24.04".into(),
                url: Some("https://example.com/manifest".into()),
                ..Default::default()
            }),
        };
        let body = create_image_comparison_config(&data).unwrap().data.unwrap();
        assert_eq!(
            body,
            json!({
                "imgA": {"isImport": false, "value": "ubuntu-22.04"},
                "imgB": {
                    "isImport": true,
                    "value": {
                        "os": "ubuntu",
                        "name": "ubuntu-24.04",
                        "release": "24.04",
                        "url": "https://example.com/manifest"
                    }
                }
            })
        );
    }

    #[test]
    fn test_create_body_from_json() {
        let data: CreateImageComparison = serde_json::from_value(json!({
            "imgA": {"isImport": false, "value": "rhel-9.2"},
            "imgB": {
                "isImport": true,
                "value": {"os": "rhel", "name": "rhel-9.4", "release": "9.4", "rawData": "pkgs.txt"}
            }
        }))
        .unwrap();

        assert_eq!(data.img_a, ImageSelection::existing("rhel-9.2"));
        match data.img_b.value {
            ImageValue::Import(image) => {
                assert_eq!(image.name, "rhel-9.4");
                assert_eq!(image.raw_data.as_deref(), Some("pkgs.txt"));
                assert_eq!(image.url, None);
            }
            other => panic!("expected import, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_name_verify_roundtrip() {
        let app = axum::Router::new().route(
            "/openikt/app_ii/name_verify",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                Json(json!(q.get("name").map(String::as_str) != Some("taken")))
            }),
        );
        let base_url = spawn_server(app).await;
        let request = IktRequest::new(RequestSettings::new(base_url)).unwrap();

        assert!(verify_create_image_name(&request, "fresh name").await.unwrap());
        assert!(!verify_create_image_name(&request, "taken").await.unwrap());
    }

    #[tokio::test]
    async fn test_details_table_roundtrip() {
        let app = axum::Router::new().route(
            "/openikt/app_ii/image_diff_pkg",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                Json(json!({
                    "code": 0,
                    "data": {"tableData": [{"diff": q.get("DiffId"), "types": q.get("diffType")}]},
                    "msg": "",
                    "detail": ""
                }))
            }),
        );
        let base_url = spawn_server(app).await;
        let request = IktRequest::new(RequestSettings::new(base_url)).unwrap();

        let types = vec!["2".to_string()];
        let details = get_image_comparison_details(&request, 6, &types, None)
            .await
            .unwrap();
        assert_eq!(details.data.table_data.len(), 1);
        assert_eq!(details.data.table_data[0]["diff"], "6");
        assert_eq!(details.data.table_data[0]["types"], "2");
    }
}
