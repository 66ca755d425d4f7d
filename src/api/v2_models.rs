use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Request body when executing a SQL statement
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct StatementRequest {
    pub statement: String,
    pub warehouse_id: String,

    /// How long the API may hold the submit call open, e.g. "20s".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_timeout: Option<String>,
}

/// Lifecycle state of a statement.
///
/// Anything the relay does not recognise, including non-string values, is
/// kept verbatim in `Other` so the payload can be relayed unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum StatementState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Closed,
    Other(Value),
}

impl StatementState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Canceled | Self::Closed
        )
    }

    fn known_name(&self) -> Option<&'static str> {
        match self {
            Self::Pending => Some("PENDING"),
            Self::Running => Some("RUNNING"),
            Self::Succeeded => Some("SUCCEEDED"),
            Self::Failed => Some("FAILED"),
            Self::Canceled => Some("CANCELED"),
            Self::Closed => Some("CLOSED"),
            Self::Other(_) => None,
        }
    }
}

impl From<Value> for StatementState {
    fn from(value: Value) -> Self {
        let Value::String(s) = value else {
            return Self::Other(value);
        };
        match s.as_str() {
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "CANCELED" => Self::Canceled,
            "CLOSED" => Self::Closed,
            _ => Self::Other(Value::String(s)),
        }
    }
}

impl From<StatementState> for Value {
    fn from(state: StatementState) -> Self {
        match (state.known_name(), state) {
            (Some(name), _) => Value::String(name.to_string()),
            (None, StatementState::Other(raw)) => raw,
            (None, _) => Value::Null,
        }
    }
}

impl fmt::Display for StatementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.known_name(), self) {
            (Some(name), _) => f.write_str(name),
            (None, Self::Other(Value::String(s))) => f.write_str(s),
            (None, Self::Other(raw)) => write!(f, "{raw}"),
            (None, _) => Ok(()),
        }
    }
}

/// Top-level statement response.
///
/// Only the fields the relay inspects are typed; everything else
/// (manifest, error details, ...) rides along in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatementResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatementStatus>,
    /// Present when rows came back inline (`disposition=INLINE`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<StatementResult>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatementResponse {
    pub fn state(&self) -> Option<&StatementState> {
        self.status.as_ref().and_then(|s| s.state.as_ref())
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_some_and(StatementState::is_terminal)
    }

    pub fn has_succeeded(&self) -> bool {
        self.state() == Some(&StatementState::Succeeded)
    }

    pub fn has_inline_data(&self) -> bool {
        self.result
            .as_ref()
            .is_some_and(|r| r.data_array.is_some())
    }
}

/// Execution status. A status without `state` counts as non-terminal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatementStatus {
    #[serde(
        default,
        deserialize_with = "present_state",
        skip_serializing_if = "Option::is_none"
    )]
    pub state: Option<StatementState>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// `"state": null` stays `Some(Other(Null))` so it is re-emitted as-is.
fn present_state<'de, D>(deserializer: D) -> Result<Option<StatementState>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|v| Some(StatementState::from(v)))
}

/// Result object for a statement. Rows are opaque JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatementResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_array: Option<Value>,

    /// Set to `0` when rows were backfilled from the first chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single chunk response for /result/chunks/{chunk_index}
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_array: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
