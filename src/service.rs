use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, field, info, warn};

use crate::api::v2_models::{StatementRequest, StatementResponse, StatementResult};
use crate::api::v2_sql_statements::V2SqlStatements;
use crate::error::RelayError;

/// Timing knobs for the submit/poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Sent as `wait_timeout` so fast statements come back inline.
    pub wait_timeout: String,
    pub poll_interval: Duration,
    /// Once exceeded, the last observed status is returned as-is.
    pub poll_timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            wait_timeout: "20s".to_string(),
            poll_interval: Duration::from_millis(600),
            poll_timeout: Duration::from_secs(30),
        }
    }
}

/// Higher-level service layer built on top of a [`V2SqlStatements`] implementation.
/// Submits a statement, waits for it to settle, and backfills the first result chunk.
#[derive(Clone)]
pub struct QueryRelay {
    client: Arc<dyn V2SqlStatements>,
    warehouse_id: String,
    settings: PollSettings,
}

impl QueryRelay {
    pub fn new(
        client: Arc<dyn V2SqlStatements>,
        warehouse_id: impl Into<String>,
        settings: PollSettings,
    ) -> Self {
        Self {
            client,
            warehouse_id: warehouse_id.into(),
            settings,
        }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Runs `sql` on the configured warehouse and returns the statement payload.
    ///
    /// If the statement is still running when the poll timeout elapses, the
    /// last observed response is returned without an error. Its
    /// `statement_id` lets the caller keep polling on their own.
    pub async fn submit_query(&self, sql: &str) -> Result<StatementResponse, RelayError> {
        if sql.is_empty() {
            return Err(RelayError::missing_sql());
        }

        let request = StatementRequest {
            statement: sql.to_string(),
            warehouse_id: self.warehouse_id.clone(),
            wait_timeout: Some(self.settings.wait_timeout.clone()),
        };

        let submitted = self.client.execute_statement(&request).await?;
        debug!(
            statement_id = ?submitted.statement_id,
            state = submitted.state().map(field::display),
            "statement submitted"
        );

        if submitted.has_inline_data() || submitted.has_succeeded() {
            info!(statement_id = ?submitted.statement_id, "statement finished inline");
            return Ok(submitted);
        }

        let statement_id = submitted
            .statement_id
            .clone()
            .ok_or(RelayError::MissingStatementId)?;

        let mut settled = self.poll_statement_until_done(&statement_id).await?;

        if settled.has_succeeded() && !settled.has_inline_data() {
            self.backfill_first_chunk(&statement_id, &mut settled)
                .await?;
        }

        info!(
            %statement_id,
            state = settled.state().map(field::display),
            "statement relayed"
        );
        Ok(settled)
    }

    /// Polls a statement until it reaches a terminal state or the poll timeout passes.
    ///
    /// The elapsed check happens after each fetch, so the loop overruns the
    /// timeout by at most one interval plus one request.
    pub async fn poll_statement_until_done(
        &self,
        statement_id: &str,
    ) -> Result<StatementResponse, RelayError> {
        let started = Instant::now();
        let mut polls = 0usize;

        loop {
            let resp = self.client.get_statement(statement_id).await?;
            polls += 1;

            if resp.is_terminal() {
                debug!(%statement_id, polls, "statement reached terminal state");
                return Ok(resp);
            }

            if started.elapsed() > self.settings.poll_timeout {
                warn!(
                    %statement_id,
                    polls,
                    state = resp.state().map(field::display),
                    "poll timeout elapsed, returning last known status"
                );
                return Ok(resp);
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// Fetches chunk 0 and stores its rows under `result.data_array`.
    async fn backfill_first_chunk(
        &self,
        statement_id: &str,
        resp: &mut StatementResponse,
    ) -> Result<(), RelayError> {
        let chunk = self
            .client
            .get_statement_result_chunk(statement_id, 0)
            .await?;

        let result = resp.result.get_or_insert_with(StatementResult::default);
        result.data_array = Some(chunk.data_array.unwrap_or(Value::Array(Vec::new())));
        result.chunk_index = Some(Value::from(0));
        Ok(())
    }
}
