// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Blocking warehouse session: login, statement execution, result chunks
//! and logout.

use crate::config::ConnectionConfig;
use crate::error::{Result, WarehouseError};
use crate::protocol::{
    CLIENT_APP_ID, CLIENT_APP_VERSION, ChunkInfo, Envelope, LOGIN_PATH, LoginRequest,
    LoginRequestData, LoginResponseData, QUERY_PATH, QueryRequest, QueryResponseData, SESSION_PATH,
};
use crate::rowset::decode_rows;
use crate::script::Cursor;
use arrow_array::RecordBatch;
use diagnostics::*;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use url::Url;

const ACCEPT_SNOWFLAKE: &str = "application/snowflake";
const SSE_C_ALGORITHM: &str = "x-amz-server-side-encryption-customer-algorithm";
const SSE_C_KEY: &str = "x-amz-server-side-encryption-customer-key";

/// An open warehouse session.
///
/// Close it with [`Connection::close`]. A connection dropped while still open
/// (for example on an error path) logs out on a best-effort basis.
pub struct Connection {
    http: Client,
    base_url: Url,
    token: Option<String>,
    sequence: Cell<u64>,
    query_timeout: Duration,
    poll_interval: Duration,
}

impl Connection {
    /// Log in and open a session using `config`
    pub fn open(config: &ConnectionConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .default_headers(default_headers())
            .build()?;

        let account = config.account_name().to_string();
        let user = config.user.clone();
        info!("Logging in to {account} as {user}", account: account, user: user);

        let mut session_parameters = BTreeMap::new();
        session_parameters.insert("QUERY_RESULT_FORMAT".to_string(), Value::from("JSON"));
        let body = LoginRequest {
            data: LoginRequestData {
                client_app_id: CLIENT_APP_ID.to_string(),
                client_app_version: CLIENT_APP_VERSION.to_string(),
                account_name: account,
                login_name: config.user.clone(),
                password: config.password.clone(),
                session_parameters,
            },
        };

        let request = http
            .post(endpoint(&base_url, LOGIN_PATH)?)
            .query(&[
                ("warehouse", config.warehouse.as_str()),
                ("databaseName", config.database.as_str()),
                ("schemaName", config.schema.as_str()),
                ("roleName", config.role.as_str()),
            ])
            .json(&body);
        let envelope: Envelope<LoginResponseData> = send_json(request)?;

        if !envelope.success {
            return Err(WarehouseError::Login {
                code: envelope.code_or_unknown(),
                message: envelope.message_or_default(),
            });
        }
        let data = envelope
            .data
            .ok_or_else(|| WarehouseError::protocol("login response carried no session data"))?;

        debug!("Session opened");
        Ok(Self {
            http,
            base_url,
            token: Some(data.token),
            sequence: Cell::new(0),
            query_timeout: Duration::from_secs(config.query_timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }

    /// A cursor for running statements on this session
    #[must_use]
    pub fn cursor(&self) -> SnowflakeCursor<'_> {
        SnowflakeCursor {
            connection: self,
            current: None,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.token.is_some()
    }

    /// Log out and release the session
    pub fn close(mut self) -> Result<()> {
        self.logout()
    }

    fn logout(&mut self) -> Result<()> {
        let Some(token) = self.token.take() else {
            return Ok(());
        };
        let request = self
            .http
            .post(endpoint(&self.base_url, SESSION_PATH)?)
            .query(&[("delete", "true")])
            .header(AUTHORIZATION, auth_value(&token));
        let envelope: Envelope<Value> = send_json(request)?;
        if !envelope.success {
            return Err(WarehouseError::protocol(format!(
                "logout rejected ({}): {}",
                envelope.code_or_unknown(),
                envelope.message_or_default()
            )));
        }
        info!("Session closed");
        Ok(())
    }

    fn token(&self) -> Result<&str> {
        self.token.as_deref().ok_or(WarehouseError::Closed)
    }

    fn next_sequence_id(&self) -> u64 {
        let next = self.sequence.get() + 1;
        self.sequence.set(next);
        next
    }

    fn submit(&self, sql: &str) -> Result<QueryResponseData> {
        let token = self.token()?;
        let sequence_id = self.next_sequence_id();
        let request_id = uuid7::uuid7().to_string();

        let body = QueryRequest {
            sql_text: sql,
            async_exec: false,
            sequence_id,
            is_internal: false,
        };
        let request = self
            .http
            .post(endpoint(&self.base_url, QUERY_PATH)?)
            .query(&[("requestId", request_id.as_str())])
            .header(AUTHORIZATION, auth_value(token))
            .json(&body);
        let mut envelope: Envelope<QueryResponseData> = send_json(request)?;

        let started = Instant::now();
        while envelope.is_in_progress() {
            envelope = self.poll(envelope, started)?;
        }

        if !envelope.success {
            let data = envelope.data.as_ref();
            return Err(WarehouseError::Statement {
                code: envelope.code_or_unknown(),
                message: envelope.message_or_default(),
                sql_state: data.and_then(|d| d.sql_state.clone()),
                query_id: data.and_then(|d| d.query_id.clone()),
            });
        }
        Ok(envelope.data.unwrap_or_default())
    }

    fn poll(
        &self,
        pending: Envelope<QueryResponseData>,
        started: Instant,
    ) -> Result<Envelope<QueryResponseData>> {
        let data = pending
            .data
            .ok_or_else(|| WarehouseError::protocol("in-progress response without data"))?;
        let query_id = data.query_id.unwrap_or_default();
        let result_url = data.get_result_url.ok_or_else(|| {
            WarehouseError::protocol(format!("query {query_id} is running but has no result URL"))
        })?;

        if started.elapsed() >= self.query_timeout {
            return Err(WarehouseError::QueryTimeout {
                query_id,
                seconds: self.query_timeout.as_secs(),
            });
        }

        debug!(
            "Query {query_id} still running, polling {result_url}",
            query_id: query_id,
            result_url: result_url
        );
        std::thread::sleep(self.poll_interval);

        let request = self
            .http
            .get(endpoint(&self.base_url, &result_url)?)
            .header(AUTHORIZATION, auth_value(self.token()?));
        send_json(request)
    }

    fn download_chunk(&self, chunk: &ChunkInfo, result: &QueryResponseData) -> Result<Vec<Vec<Value>>> {
        let mut request = self.http.get(&chunk.url);
        match (&result.chunk_headers, &result.qrmk) {
            (Some(headers), _) => {
                for (name, value) in headers {
                    request = request.header(name.as_str(), value.as_str());
                }
            }
            (None, Some(qrmk)) => {
                request = request
                    .header(SSE_C_ALGORITHM, "AES256")
                    .header(SSE_C_KEY, qrmk.as_str());
            }
            (None, None) => {}
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(WarehouseError::protocol(format!(
                "chunk download returned HTTP {status}"
            )));
        }
        let body = response.text()?;

        // Chunk bodies are a bare comma-separated list of rows
        let rows: Vec<Vec<Value>> = serde_json::from_str(&format!("[{body}]"))?;
        if rows.len() != chunk.row_count {
            let expected = chunk.row_count;
            let got = rows.len();
            warn!(
                "Chunk row count mismatch: expected {expected}, got {got}",
                expected: expected,
                got: got
            );
        }
        Ok(rows)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.token.is_some() {
            if let Err(e) = self.logout() {
                let message = e.to_string();
                warn!(
                    "Connection dropped without close; logout failed: {message}",
                    message: message
                );
            }
        }
    }
}

/// Cursor over a [`Connection`]; holds the response of the last statement
pub struct SnowflakeCursor<'a> {
    connection: &'a Connection,
    current: Option<QueryResponseData>,
}

impl SnowflakeCursor<'_> {
    /// Query id of the last executed statement, when the warehouse sent one
    #[must_use]
    pub fn query_id(&self) -> Option<&str> {
        self.current.as_ref().and_then(|d| d.query_id.as_deref())
    }
}

impl Cursor for SnowflakeCursor<'_> {
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.current = None;
        let data = self.connection.submit(sql)?;
        if let Some(query_id) = data.query_id.as_deref() {
            debug!("Statement finished as query {query_id}", query_id: query_id);
        }
        self.current = Some(data);
        Ok(())
    }

    fn fetch_all(&mut self) -> Result<RecordBatch> {
        let mut data = self.current.take().ok_or(WarehouseError::NoResultSet)?;
        if !data.has_result_set() {
            return Err(WarehouseError::NoResultSet);
        }
        data.ensure_json_rows()?;

        let capacity = data.row_count_hint();
        let mut rows = std::mem::take(&mut data.rowset);
        rows.reserve(capacity.saturating_sub(rows.len()));
        for (index, chunk) in data.chunks.iter().enumerate() {
            let expected = chunk.row_count;
            debug!(
                "Downloading result chunk {index} ({expected} rows)",
                index: index,
                expected: expected
            );
            rows.extend(self.connection.download_chunk(chunk, &data)?);
        }

        decode_rows(&data.rowtype, &rows)
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(3);
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_SNOWFLAKE));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("sfrun/", env!("CARGO_PKG_VERSION"))),
    );
    headers
}

/// Resolve a server path below `base`; leading `/` must not drop a host prefix
fn endpoint(base: &Url, path: &str) -> Result<Url> {
    Ok(base.join(path.trim_start_matches('/'))?)
}

fn auth_value(token: &str) -> String {
    format!("Snowflake Token=\"{token}\"")
}

fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = request.send()?;
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(WarehouseError::protocol(format!("HTTP {status}: {body}")));
    }
    Ok(serde_json::from_str(&body)?)
}
