// Error types for warehouse sessions and script execution

pub type Result<T> = std::result::Result<T, WarehouseError>;

#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_yaml_ng::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Login failed ({code}): {message}")]
    Login { code: String, message: String },

    #[error("Statement failed ({code}): {message}")]
    Statement {
        code: String,
        message: String,
        sql_state: Option<String>,
        query_id: Option<String>,
    },

    #[error("Query {query_id} still running after {seconds}s")]
    QueryTimeout { query_id: String, seconds: u64 },

    /// The statement completed but produced nothing to fetch
    #[error("No result set available")]
    NoResultSet,

    #[error("Cannot decode column {column}: {message}")]
    Decode { column: String, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Session is closed")]
    Closed,
}

impl WarehouseError {
    pub fn decode<C: Into<String>, M: Into<String>>(column: C, message: M) -> Self {
        WarehouseError::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn protocol<M: Into<String>>(message: M) -> Self {
        WarehouseError::Protocol(message.into())
    }

    /// True for the one failure a script run tolerates on its final fetch
    #[must_use]
    pub fn is_no_result_set(&self) -> bool {
        matches!(self, WarehouseError::NoResultSet)
    }
}
