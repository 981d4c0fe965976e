use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use warp::{Filter, Reply};

pub const MOCK_TOKEN: &str = "mock-session-token";
pub const MOCK_PASSWORD: &str = "correct-horse";
pub const CHUNK_KEY: &str = "mock-qrmk";
pub const CHUNK_HEADER_KEY: &str = "mock-chunk-header-key";

/// Everything the mock saw, for assertions
#[derive(Debug, Default)]
pub struct Recorded {
    pub login_params: HashMap<String, String>,
    pub login_body: Value,
    /// (sequenceId, sqlText) per query request
    pub statements: Vec<(u64, String)>,
    pub polls: usize,
    pub chunk_downloads: usize,
    /// SSE-C key presented on each chunk download
    pub chunk_keys: Vec<String>,
    pub closes: usize,
}

/// Mock warehouse serving the session endpoints on an ephemeral port.
///
/// Responses depend on the statement text:
/// - contains `FAIL`: compilation error 002003
/// - starts with `USE`: success with no result columns
/// - starts with `SLOW`: "still running", finished on the first poll
/// - starts with `STUCK`: "still running" on every poll
/// - `SELECT CHUNKED`: one inline row plus a two-row chunk keyed by `qrmk`
/// - `SELECT SIGNED CHUNKED`: the same rows, with `chunkHeaders` as well
/// - `SELECT ARROW`: rows delivered as base64 Arrow instead of JSON
/// - any other `SELECT` (leading `--` comment lines ignored): the
///   latest-order-per-customer report
/// - anything else: a one-row status result
pub struct MockWarehouse {
    pub base_url: String,
    recorded: Arc<Mutex<Recorded>>,
    _runtime: tokio::runtime::Runtime,
}

impl MockWarehouse {
    pub fn start() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("tokio runtime");
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let base = Arc::new(Mutex::new(String::new()));

        let login_state = recorded.clone();
        let login = warp::path!("session" / "v1" / "login-request")
            .and(warp::post())
            .and(warp::query::<HashMap<String, String>>())
            .and(warp::body::json::<Value>())
            .map(move |params: HashMap<String, String>, body: Value| {
                let mut state = login_state.lock().expect("mock state");
                state.login_params = params;
                state.login_body = body.clone();
                let reply = if body["data"]["PASSWORD"] == MOCK_PASSWORD {
                    json!({
                        "data": {"token": MOCK_TOKEN, "masterToken": "mock-master", "sessionId": 42},
                        "code": null,
                        "message": null,
                        "success": true
                    })
                } else {
                    json!({
                        "data": null,
                        "code": "390100",
                        "message": "Incorrect username or password was specified.",
                        "success": false
                    })
                };
                warp::reply::json(&reply).into_response()
            });

        let query_state = recorded.clone();
        let query_base = base.clone();
        let query = warp::path!("queries" / "v1" / "query-request")
            .and(warp::post())
            .and(warp::header::optional::<String>("authorization"))
            .and(warp::body::json::<Value>())
            .map(move |auth: Option<String>, body: Value| {
                if !authorized(auth.as_deref()) {
                    return warp::reply::json(&unauthorized()).into_response();
                }
                let sql = body["sqlText"].as_str().unwrap_or_default().to_string();
                let sequence = body["sequenceId"].as_u64().unwrap_or_default();
                query_state
                    .lock()
                    .expect("mock state")
                    .statements
                    .push((sequence, sql.clone()));
                let base_url = query_base.lock().expect("mock base").clone();
                warp::reply::json(&respond_to(&sql, &base_url)).into_response()
            });

        let poll_state = recorded.clone();
        let poll = warp::path!("queries" / String / "result")
            .and(warp::get())
            .and(warp::header::optional::<String>("authorization"))
            .map(move |query_id: String, auth: Option<String>| {
                if !authorized(auth.as_deref()) {
                    return warp::reply::json(&unauthorized()).into_response();
                }
                poll_state.lock().expect("mock state").polls += 1;
                if query_id == "q-stuck" {
                    return warp::reply::json(&still_running("q-stuck", "333333")).into_response();
                }
                warp::reply::json(&status_result(&query_id, "Slow statement finished."))
                    .into_response()
            });

        let chunk_state = recorded.clone();
        let chunk = warp::path!("chunks" / usize)
            .and(warp::get())
            .and(warp::header::optional::<String>(
                "x-amz-server-side-encryption-customer-key",
            ))
            .map(move |_index: usize, key: Option<String>| {
                let Some(key) = key.filter(|k| [CHUNK_KEY, CHUNK_HEADER_KEY].contains(&k.as_str())) else {
                    return warp::reply::with_status("missing key", warp::http::StatusCode::FORBIDDEN)
                        .into_response();
                };
                let mut state = chunk_state.lock().expect("mock state");
                state.chunk_downloads += 1;
                state.chunk_keys.push(key);
                warp::reply::with_header(
                    r#"["2", "b"],["3", null]"#,
                    "content-type",
                    "application/json",
                )
                .into_response()
            });

        let close_state = recorded.clone();
        let close = warp::path!("session")
            .and(warp::post())
            .and(warp::query::<HashMap<String, String>>())
            .and(warp::header::optional::<String>("authorization"))
            .map(move |params: HashMap<String, String>, auth: Option<String>| {
                if !authorized(auth.as_deref()) || params.get("delete").map(String::as_str) != Some("true") {
                    return warp::reply::json(&unauthorized()).into_response();
                }
                close_state.lock().expect("mock state").closes += 1;
                warp::reply::json(&json!({"data": null, "code": null, "message": null, "success": true}))
                    .into_response()
            });

        let routes = login.or(query).or(poll).or(chunk).or(close);

        let (addr, server) = {
            let _guard = runtime.enter();
            warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0))
        };
        runtime.spawn(server);

        let base_url = format!("http://127.0.0.1:{}", addr.port());
        *base.lock().expect("mock base") = base_url.clone();

        MockWarehouse {
            base_url,
            recorded,
            _runtime: runtime,
        }
    }

    pub fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().expect("mock state")
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.recorded().statements.iter().map(|(_, sql)| sql.clone()).collect()
    }
}

fn authorized(header: Option<&str>) -> bool {
    header == Some(format!("Snowflake Token=\"{MOCK_TOKEN}\"").as_str())
}

fn unauthorized() -> Value {
    json!({
        "data": null,
        "code": "390104",
        "message": "User must login again to access the service.",
        "success": false
    })
}

fn without_comments(sql: &str) -> String {
    sql.lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn status_result(query_id: &str, status: &str) -> Value {
    json!({
        "data": {
            "rowtype": [{"name": "status", "type": "text", "nullable": true}],
            "rowset": [[status]],
            "queryId": query_id,
            "queryResultFormat": "json"
        },
        "code": null,
        "message": null,
        "success": true
    })
}

fn still_running(query_id: &str, code: &str) -> Value {
    json!({
        "data": {"queryId": query_id, "getResultUrl": format!("/queries/{query_id}/result")},
        "code": code,
        "message": "Asynchronous execution in progress.",
        "success": true
    })
}

fn respond_to(sql: &str, base_url: &str) -> Value {
    let body = without_comments(sql);

    if body.contains("FAIL") {
        return json!({
            "data": {"errorCode": "002003", "sqlState": "42S02", "queryId": "q-fail"},
            "code": "002003",
            "message": "SQL compilation error: Object 'FAIL' does not exist or not authorized.",
            "success": false
        });
    }
    if body.starts_with("USE") {
        return json!({
            "data": {"rowtype": [], "rowset": [], "queryId": "q-use"},
            "code": null,
            "message": null,
            "success": true
        });
    }
    if body.starts_with("SLOW") {
        return still_running("q-slow", "333334");
    }
    if body.starts_with("STUCK") {
        return still_running("q-stuck", "333333");
    }
    if body == "SELECT ARROW" {
        return json!({
            "data": {
                "rowtype": [{"name": "N", "type": "fixed", "precision": 38, "scale": 0, "nullable": false}],
                "rowsetBase64": "QVJST1cx",
                "queryId": "q-arrow",
                "total": 3,
                "returned": 3,
                "queryResultFormat": "arrow"
            },
            "code": null,
            "message": null,
            "success": true
        });
    }
    if body == "SELECT CHUNKED" || body == "SELECT SIGNED CHUNKED" {
        let mut reply = json!({
            "data": {
                "rowtype": [
                    {"name": "N", "type": "fixed", "precision": 38, "scale": 0, "nullable": false},
                    {"name": "LABEL", "type": "text", "nullable": true}
                ],
                "rowset": [["1", "a"]],
                "queryId": "q-chunked",
                "total": 3,
                "returned": 3,
                "queryResultFormat": "json",
                "chunks": [{"url": format!("{base_url}/chunks/0"), "rowCount": 2, "uncompressedSize": 24}],
                "qrmk": CHUNK_KEY
            },
            "code": null,
            "message": null,
            "success": true
        });
        if body == "SELECT SIGNED CHUNKED" {
            reply["data"]["chunkHeaders"] = json!({
                "x-amz-server-side-encryption-customer-algorithm": "AES256",
                "x-amz-server-side-encryption-customer-key": CHUNK_HEADER_KEY
            });
        }
        return reply;
    }
    if body.starts_with("SELECT") {
        return json!({
            "data": {
                "rowtype": [
                    {"name": "CUSTOMER_ID", "type": "fixed", "precision": 38, "scale": 0, "nullable": true},
                    {"name": "CUSTOMER_NAME", "type": "text", "nullable": true},
                    {"name": "STATE", "type": "text", "nullable": true},
                    {"name": "ORDER_ID", "type": "fixed", "precision": 38, "scale": 0, "nullable": true},
                    {"name": "ORDER_DATE", "type": "date", "nullable": true},
                    {"name": "ORDER_TOTAL", "type": "fixed", "precision": 38, "scale": 2, "nullable": true}
                ],
                "rowset": [
                    ["1", "Alice", "CA", "1002", "20393", "199.00"],
                    ["2", "Bob", "NY", "1003", "20389", "49.98"],
                    ["3", "Chloe", "TX", "1004", "20395", "398.00"]
                ],
                "queryId": "q-report",
                "total": 3,
                "returned": 3,
                "queryResultFormat": "json"
            },
            "code": null,
            "message": null,
            "success": true
        });
    }
    status_result("q-status", "Statement executed successfully.")
}
