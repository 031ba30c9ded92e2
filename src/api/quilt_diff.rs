//! Quilt diff endpoints
//!
//! A quilt diff compares the patch stacks of two repository refs. These
//! endpoints list repositories and diffs, page through the patches of one
//! diff, export a diff as a spreadsheet and trigger new diff jobs.

use reqwest::header::{HeaderValue, ACCEPT};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{non_zero, to_body, Envelope, LabelValue};
use crate::request::{
    ExportFile, IktRequest, RequestConfig, RequestError, Response, ResponseData, ResponseType,
};
use crate::utils::{parse_content_disposition_filename, SPREADSHEET_MIME};

const QUILT_DIFF_PREFIX: &str = "/openikt/app_diff";

pub const DEFAULT_CURRENT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Page of a details table. Zero values fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: DEFAULT_CURRENT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Overview table plus the diff tags of the selected repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuiltDiffOverview {
    #[serde(rename = "tableData", default)]
    pub table_data: Vec<Value>,
    #[serde(rename = "tagList", default)]
    pub tag_list: Vec<LabelValue>,
}

/// Ref selector options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefOptions {
    #[serde(rename = "refsA", default)]
    pub refs_a: Vec<LabelValue>,
    #[serde(rename = "refsB", default)]
    pub refs_b: Vec<LabelValue>,
}

/// Counts attached to a details page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchCounts {
    #[serde(rename = "patchCount", default)]
    pub patch_count: u64,
    #[serde(rename = "upsCount", default)]
    pub ups_count: u64,
}

impl Envelope<Vec<Value>> {
    /// Patch counts carried in `detail` of a details response
    pub fn patch_counts(&self) -> PatchCounts {
        serde_json::from_value(self.detail.clone()).unwrap_or_default()
    }
}

/// Which quilt diff to export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub quilt_diff_id: u64,
    pub ref_a: String,
    pub ref_b: String,
}

/// Parameters of a new quilt diff job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuiltDiff {
    pub repository_from: String,
    pub repository_to: String,
    pub ref_from: String,
    pub ref_to: String,
    pub base_from: String,
    pub base_to: String,
    pub diff_type: String,
}

fn endpoint(path: &str) -> String {
    format!("{}/{}", QUILT_DIFF_PREFIX, path)
}

pub fn repository_list_config() -> RequestConfig {
    RequestConfig::new(endpoint("repos"))
}

pub fn overview_table_data_config(
    repository_id: Option<u64>,
    diff_tag_id: Option<u64>,
) -> RequestConfig {
    RequestConfig::new(endpoint("quilt_diffs"))
        .param_opt("repoId", non_zero(repository_id))
        .param_opt("diffId", non_zero(diff_tag_id))
}

pub fn details_table_data_config(
    quilt_diff_id: u64,
    quilt_diff_type: &str,
    page: Option<Pagination>,
) -> RequestConfig {
    let page = page.unwrap_or_default();
    let current_page = match page.current_page {
        0 => DEFAULT_CURRENT_PAGE,
        n => n,
    };
    let page_size = match page.page_size {
        0 => DEFAULT_PAGE_SIZE,
        n => n,
    };

    RequestConfig::new(endpoint("detail"))
        .param("quiltDiffId", quilt_diff_id)
        .param("quiltDiffType", quilt_diff_type)
        .param("currentPage", current_page)
        .param("pageSize", page_size)
}

pub fn binary_export_config(export: &ExportRequest) -> Result<RequestConfig, RequestError> {
    Ok(RequestConfig::new(endpoint("detail"))
        .response_type(ResponseType::ArrayBuffer)
        .header(ACCEPT, HeaderValue::from_static(SPREADSHEET_MIME))
        .data(to_body(export)?)
        .response_interceptor(repackage_export))
}

/// Turn a raw spreadsheet response into an [`ExportFile`] named after the
/// `content-disposition` header
fn repackage_export(mut response: Response) -> Result<Response, RequestError> {
    let filename = response
        .header_str("content-disposition")
        .and_then(parse_content_disposition_filename)
        .ok_or(RequestError::MissingFilename)?;

    let data = std::mem::replace(&mut response.data, ResponseData::Bytes(Vec::new()));
    response.data = ResponseData::File(ExportFile {
        data: data.into_bytes()?,
        filename,
    });
    Ok(response)
}

pub fn refs_config() -> RequestConfig {
    RequestConfig::new(endpoint("refs"))
}

pub fn patch_types_config() -> RequestConfig {
    RequestConfig::new(endpoint("type"))
}

pub fn diff_types_config() -> RequestConfig {
    RequestConfig::new(endpoint("diff_type"))
}

pub fn create_quilt_diff_config(form: &CreateQuiltDiff) -> Result<RequestConfig, RequestError> {
    Ok(RequestConfig::new(endpoint("create")).data(to_body(form)?))
}

/// Repositories with at least one quilt diff
pub async fn get_repository_list(
    request: &IktRequest,
) -> Result<Envelope<Vec<LabelValue>>, RequestError> {
    request.get(repository_list_config()).await?.json()
}

/// Quilt diffs, optionally narrowed to one repository and one diff
pub async fn get_overview_table_data(
    request: &IktRequest,
    repository_id: Option<u64>,
    diff_tag_id: Option<u64>,
) -> Result<Envelope<QuiltDiffOverview>, RequestError> {
    request
        .get(overview_table_data_config(repository_id, diff_tag_id))
        .await?
        .json()
}

/// One page of patches of a given type
pub async fn get_details_table_data(
    request: &IktRequest,
    quilt_diff_id: u64,
    quilt_diff_type: &str,
    page: Option<Pagination>,
) -> Result<Envelope<Vec<Value>>, RequestError> {
    request
        .get(details_table_data_config(quilt_diff_id, quilt_diff_type, page))
        .await?
        .json()
}

/// Spreadsheet export of a quilt diff
pub async fn get_binary_export_data(
    request: &IktRequest,
    export: &ExportRequest,
) -> Result<ExportFile, RequestError> {
    request.post(binary_export_config(export)?).await?.into_file()
}

pub async fn get_refs(request: &IktRequest) -> Result<Envelope<RefOptions>, RequestError> {
    request.get(refs_config()).await?.json()
}

pub async fn get_patch_types(
    request: &IktRequest,
) -> Result<Envelope<Vec<LabelValue>>, RequestError> {
    request.get(patch_types_config()).await?.json()
}

pub async fn get_diff_types(
    request: &IktRequest,
) -> Result<Envelope<Vec<LabelValue>>, RequestError> {
    request.get(diff_types_config()).await?.json()
}

/// Trigger a quilt diff job on the backend
pub async fn create_quilt_diff(
    request: &IktRequest,
    form: &CreateQuiltDiff,
) -> Result<Envelope<Value>, RequestError> {
    request.post(create_quilt_diff_config(form)?).await?.json()
}
