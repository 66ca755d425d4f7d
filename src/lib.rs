//! Relay SQL statements from browser clients to a Databricks SQL warehouse.
//!
//! A `/query` call submits the statement through the Statement Execution API,
//! polls until it settles, backfills the first result chunk when rows were not
//! returned inline, and hands the payload back untouched.

pub mod api {
    pub mod v2_models;
    pub mod v2_sql_statements;
}

pub mod api_client {
    pub mod v2_client;
}

pub mod config;
pub mod cors;
pub mod error;
pub mod server;
pub mod service;

pub use api::v2_models::{StatementRequest, StatementResponse, StatementState};
pub use api::v2_sql_statements::V2SqlStatements;
pub use api_client::v2_client::V2Client;
pub use config::RelayConfig;
pub use cors::OriginPolicy;
pub use error::RelayError;
pub use server::RelayServer;
pub use service::{PollSettings, QueryRelay};
