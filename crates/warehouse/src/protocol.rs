//! Request and response bodies for the warehouse session REST endpoints.

use crate::error::{Result, WarehouseError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const LOGIN_PATH: &str = "/session/v1/login-request";
pub const QUERY_PATH: &str = "/queries/v1/query-request";
pub const SESSION_PATH: &str = "/session";

pub const CLIENT_APP_ID: &str = "sfrun";
pub const CLIENT_APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Response codes meaning "accepted, still executing"
pub const QUERY_IN_PROGRESS: &str = "333333";
pub const QUERY_IN_PROGRESS_ASYNC: &str = "333334";

/// Common wrapper around every response body
#[derive(Deserialize, Debug)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub code: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub success: bool,
}

impl<T> Envelope<T> {
    pub fn code_or_unknown(&self) -> String {
        self.code.clone().unwrap_or_else(|| "unknown".to_string())
    }

    pub fn message_or_default(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "no message from warehouse".to_string())
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            self.code.as_deref(),
            Some(QUERY_IN_PROGRESS) | Some(QUERY_IN_PROGRESS_ASYNC)
        )
    }
}

#[derive(Serialize, Debug)]
pub struct LoginRequest {
    pub data: LoginRequestData,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LoginRequestData {
    pub client_app_id: String,
    pub client_app_version: String,
    pub account_name: String,
    pub login_name: String,
    pub password: String,
    pub session_parameters: BTreeMap<String, Value>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponseData {
    pub token: String,
    pub master_token: Option<String>,
    pub session_id: Option<i64>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest<'a> {
    pub sql_text: &'a str,
    pub async_exec: bool,
    pub sequence_id: u64,
    pub is_internal: bool,
}

/// Column metadata for one result column
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RowType {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub precision: Option<i64>,
    pub scale: Option<i64>,
    #[serde(default = "nullable_default")]
    pub nullable: bool,
}

fn nullable_default() -> bool {
    true
}

/// A slice of the result served from object storage
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChunkInfo {
    pub url: String,
    pub row_count: usize,
    pub uncompressed_size: Option<u64>,
}

/// Body of a query response; also carries error details on failure
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponseData {
    #[serde(default)]
    pub rowtype: Vec<RowType>,
    #[serde(default)]
    pub rowset: Vec<Vec<Value>>,
    pub total: Option<i64>,
    pub returned: Option<i64>,
    pub query_id: Option<String>,
    pub sql_state: Option<String>,
    pub statement_type_id: Option<i64>,
    pub query_result_format: Option<String>,
    #[serde(default)]
    pub chunks: Vec<ChunkInfo>,
    pub chunk_headers: Option<BTreeMap<String, String>>,
    pub qrmk: Option<String>,
    pub get_result_url: Option<String>,
}

impl QueryResponseData {
    pub fn has_result_set(&self) -> bool {
        !self.rowtype.is_empty()
    }

    pub fn row_count_hint(&self) -> usize {
        self.rowset.len() + self.chunks.iter().map(|c| c.row_count).sum::<usize>()
    }

    /// Fail unless the rows can be read from `rowset` and `chunks`.
    ///
    /// An account-level `QUERY_RESULT_FORMAT` can override the session
    /// setting and deliver rows as base64 Arrow instead.
    pub fn ensure_json_rows(&self) -> Result<()> {
        if let Some(format) = self.query_result_format.as_deref() {
            if !format.eq_ignore_ascii_case("json") {
                return Err(WarehouseError::protocol(format!(
                    "unsupported result format '{format}', expected json"
                )));
            }
        }
        let reported = self.returned.or(self.total).unwrap_or(0);
        if reported > 0 && self.row_count_hint() == 0 {
            return Err(WarehouseError::protocol(format!(
                "result reports {reported} rows but carries none"
            )));
        }
        Ok(())
    }
}
