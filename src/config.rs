//! Process configuration.
//!
//! Parsed once at startup from flags, falling back to environment variables
//! (a `.env` file is loaded first when present).

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;

use crate::cors::OriginPolicy;
use crate::service::PollSettings;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

#[derive(Parser, Debug, Clone)]
#[command(name = "dbsql-relay")]
#[command(version, about = "Relay SQL from the browser to a Databricks SQL warehouse", long_about = None)]
pub struct RelayConfig {
    /// Workspace URL, e.g. https://<workspace>.cloud.databricks.com
    #[arg(long, env = "DATABRICKS_HOST", value_name = "URL")]
    pub databricks_host: Option<String>,

    /// Personal access token sent as a bearer credential
    #[arg(long, env = "DATABRICKS_TOKEN", value_name = "TOKEN", hide_env_values = true)]
    pub databricks_token: Option<String>,

    /// SQL warehouse that runs every statement
    #[arg(long, env = "DATABRICKS_WAREHOUSE_ID", value_name = "ID")]
    pub warehouse_id: Option<String>,

    /// Exact origins allowed to call the relay (comma-separated)
    #[arg(long, env = "ALLOWED_ORIGIN", value_name = "ORIGIN", value_delimiter = ',')]
    pub allowed_origin: Vec<String>,

    /// Host suffixes allowed to call the relay (comma-separated)
    #[arg(
        long,
        env = "ALLOWED_HOST_SUFFIXES",
        value_name = "SUFFIX",
        value_delimiter = ',',
        default_value = ".worf.replit.dev,.repl.co"
    )]
    pub allowed_host_suffix: Vec<String>,

    #[arg(long, env = "BIND_ADDRESS", value_name = "ADDR", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    #[arg(short, long, env = "PORT", value_name = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Inline wait hint passed with each submitted statement
    #[arg(long, env = "STATEMENT_WAIT_TIMEOUT", value_name = "DURATION", default_value = "20s")]
    pub wait_timeout: String,

    #[arg(long, env = "POLL_INTERVAL_MS", value_name = "MS", default_value_t = 600)]
    pub poll_interval_ms: u64,

    /// Give up polling after this long and return the last status seen
    #[arg(long, env = "POLL_TIMEOUT_MS", value_name = "MS", default_value_t = 30_000)]
    pub poll_timeout_ms: u64,

    /// Upper bound on any single call to Databricks; keep it above the wait hint
    #[arg(long, env = "REQUEST_TIMEOUT_MS", value_name = "MS", default_value_t = 60_000)]
    pub request_timeout_ms: u64,
}

impl RelayConfig {
    /// Parses flags and environment; `.env` must already be loaded.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Names of required settings that are unset or blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("DATABRICKS_HOST", &self.databricks_host),
            ("DATABRICKS_TOKEN", &self.databricks_token),
            ("DATABRICKS_WAREHOUSE_ID", &self.warehouse_id),
        ]
        .into_iter()
        .filter(|(_, v)| v.as_deref().map_or(true, |s| s.trim().is_empty()))
        .map(|(k, _)| k)
        .collect()
    }

    pub fn host(&self) -> &str {
        self.databricks_host.as_deref().unwrap_or_default()
    }

    pub fn token(&self) -> &str {
        self.databricks_token.as_deref().unwrap_or_default()
    }

    pub fn warehouse(&self) -> &str {
        self.warehouse_id.as_deref().unwrap_or_default()
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            wait_timeout: self.wait_timeout.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            poll_timeout: Duration::from_millis(self.poll_timeout_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn origin_policy(&self) -> OriginPolicy {
        let clean = |items: &[String]| {
            items
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        };
        OriginPolicy::new(clean(&self.allowed_origin), clean(&self.allowed_host_suffix))
    }
}
