use crate::error::{Result, WarehouseError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Environment variables consulted by [`ConnectionConfig::with_env`]
pub const ENV_USER: &str = "SF_USER";
pub const ENV_PASSWORD: &str = "SF_PASSWORD";
pub const ENV_ACCOUNT: &str = "SF_ACCOUNT";
pub const ENV_WAREHOUSE: &str = "SF_WAREHOUSE";
pub const ENV_DATABASE: &str = "SF_DATABASE";
pub const ENV_SCHEMA: &str = "SF_SCHEMA";
pub const ENV_ROLE: &str = "SF_ROLE";
pub const ENV_HOST: &str = "SF_HOST";

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 600;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Connection parameters for one warehouse session.
///
/// The seven login values are passed through untouched: no trimming, case
/// folding or validation happens here. Missing YAML keys keep their defaults.
#[derive(Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    pub user: String,
    pub password: String,
    /// Account identifier, e.g. `xy12345.us-east-1`
    pub account: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub role: String,
    /// Base URL override; defaults to `https://{account}.snowflakecomputing.com`
    pub host: Option<String>,
    /// Per-request HTTP timeout
    pub timeout_secs: u64,
    /// Upper bound on waiting for a long-running statement
    pub query_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            user: "<YOUR_USER>".to_string(),
            password: "<YOUR_PASSWORD>".to_string(),
            account: "<YOUR_ACCOUNT>".to_string(),
            warehouse: "COMPUTE_WH".to_string(),
            database: "DEMO_DB".to_string(),
            schema: "PUBLIC".to_string(),
            role: "ACCOUNTADMIN".to_string(),
            host: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("account", &self.account)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("role", &self.role)
            .field("host", &self.host)
            .field("timeout_secs", &self.timeout_secs)
            .field("query_timeout_secs", &self.query_timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .finish()
    }
}

impl ConnectionConfig {
    /// Defaults overlaid by the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Load a YAML file; keys it omits keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Overlay values from the process environment
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_vars(|name| std::env::var(name).ok())
    }

    /// Overlay values from `lookup`; a variable that is set wins even when empty
    #[must_use]
    pub fn with_vars<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut String); 7] = [
            (ENV_USER, &mut self.user),
            (ENV_PASSWORD, &mut self.password),
            (ENV_ACCOUNT, &mut self.account),
            (ENV_WAREHOUSE, &mut self.warehouse),
            (ENV_DATABASE, &mut self.database),
            (ENV_SCHEMA, &mut self.schema),
            (ENV_ROLE, &mut self.role),
        ];
        for (name, slot) in fields {
            if let Some(value) = lookup(name) {
                *slot = value;
            }
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.host = Some(host);
        }
        self
    }

    /// Names of login fields still holding a `<...>` placeholder
    #[must_use]
    pub fn placeholder_fields(&self) -> Vec<&'static str> {
        let is_placeholder = |v: &str| v.starts_with('<') && v.ends_with('>');
        [
            ("user", &self.user),
            ("password", &self.password),
            ("account", &self.account),
        ]
        .into_iter()
        .filter(|(_, value)| is_placeholder(value))
        .map(|(name, _)| name)
        .collect()
    }

    /// Account name as the login endpoint expects it: the identifier up to
    /// the first `.` (region and cloud suffixes are part of the host only)
    #[must_use]
    pub fn account_name(&self) -> &str {
        self.account.split('.').next().unwrap_or(&self.account)
    }

    /// Root that every endpoint path is resolved against. A path prefix on
    /// `host` (e.g. behind a proxy) is kept, and always ends in `/`.
    pub fn base_url(&self) -> Result<Url> {
        let raw = match &self.host {
            Some(host) => host.clone(),
            None => format!("https://{}.snowflakecomputing.com", self.account),
        };
        let mut url = Url::parse(&raw)?;
        if url.cannot_be_a_base() {
            return Err(WarehouseError::protocol(format!(
                "warehouse host {raw} cannot be used as a base URL"
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}
