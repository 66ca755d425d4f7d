use async_trait::async_trait;

use crate::api::v2_models::{ChunkResponse, StatementRequest, StatementResponse};
use crate::error::RelayError;

/// Statement Execution API 2.0 operations the relay depends on.
#[async_trait]
pub trait V2SqlStatements: Send + Sync {
    /// POST /api/2.0/sql/statements
    /// Execute a SQL statement and optionally wait for results.
    async fn execute_statement(
        &self,
        request: &StatementRequest,
    ) -> Result<StatementResponse, RelayError>;

    /// GET /api/2.0/sql/statements/{statement_id}
    /// Poll for the statement's status, plus the first chunk of results if available.
    async fn get_statement(&self, statement_id: &str) -> Result<StatementResponse, RelayError>;

    /// GET /api/2.0/sql/statements/{statement_id}/result/chunks/{chunk_index}
    /// Fetch a chunk of results for a completed statement.
    async fn get_statement_result_chunk(
        &self,
        statement_id: &str,
        chunk_index: u32,
    ) -> Result<ChunkResponse, RelayError>;
}
