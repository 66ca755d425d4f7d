use async_trait::async_trait;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::v2_models::{ChunkResponse, StatementRequest, StatementResponse};
use crate::api::v2_sql_statements::V2SqlStatements;
use crate::error::RelayError;

/// Low-level Databricks SQL Warehouse client that directly calls the REST endpoints.
#[derive(Debug, Clone)]
pub struct V2Client {
    base_url: String,
    token: String,
    http_client: Client,
    request_timeout: Option<Duration>,
}

impl V2Client {
    /// Creates a new client with the given Databricks workspace URL and access token.
    ///
    /// Example base_url: https://<your-workspace>.cloud.databricks.com
    pub fn new(base_url: &str, token: &str) -> Self {
        Self::with_http_client(base_url, token, Client::new())
    }

    /// Same as [`V2Client::new`] but reuses an existing connection pool.
    pub fn with_http_client(base_url: &str, token: &str, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http_client,
            request_timeout: None,
        }
    }

    /// Caps every outbound call so a stalled upstream cannot hold a poll loop open.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.bearer_auth(&self.token);
        match self.request_timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    /// Turns a response into `T`, or into `RelayError::Upstream` when the status is not 2xx.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, RelayError> {
        // Capture the status code before consuming the response
        let status = resp.status();
        let text_body = resp.text().await?;

        debug!(status = %status, bytes = text_body.len(), "databricks response");

        if !status.is_success() {
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                body: text_body,
            });
        }

        serde_json::from_str(&text_body).map_err(|e| RelayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl V2SqlStatements for V2Client {
    async fn execute_statement(
        &self,
        request: &StatementRequest,
    ) -> Result<StatementResponse, RelayError> {
        let url = format!("{}/api/2.0/sql/statements", self.base_url);
        debug!(%url, warehouse_id = %request.warehouse_id, "submitting statement");

        let resp = self
            .authorize(self.http_client.post(&url))
            .json(request)
            .send()
            .await?;

        self.handle_response(resp).await
    }

    async fn get_statement(&self, statement_id: &str) -> Result<StatementResponse, RelayError> {
        let url = format!("{}/api/2.0/sql/statements/{}", self.base_url, statement_id);
        debug!(%url, "fetching statement status");

        let resp = self
            .authorize(self.http_client.get(&url))
            .send()
            .await?;

        self.handle_response(resp).await
    }

    async fn get_statement_result_chunk(
        &self,
        statement_id: &str,
        chunk_index: u32,
    ) -> Result<ChunkResponse, RelayError> {
        let url = format!(
            "{}/api/2.0/sql/statements/{}/result/chunks/{}",
            self.base_url, statement_id, chunk_index
        );
        debug!(%url, "fetching result chunk");

        let resp = self
            .authorize(self.http_client.get(&url))
            .send()
            .await?;

        self.handle_response(resp).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::v2_models::StatementState;

    #[tokio::test]
    async fn submit_sends_bearer_token_and_statement_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/2.0/sql/statements"))
            .and(header("authorization", "Bearer dapi-test"))
            .and(body_json(json!({
                "statement": "SELECT 1",
                "warehouse_id": "wh-1",
                "wait_timeout": "20s"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statement_id": "abc",
                "status": { "state": "PENDING" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        // Trailing slash must not produce a double slash in the path.
        let client = V2Client::new(&format!("{}/", server.uri()), "dapi-test");
        let resp = client
            .execute_statement(&StatementRequest {
                statement: "SELECT 1".into(),
                warehouse_id: "wh-1".into(),
                wait_timeout: Some("20s".into()),
            })
            .await
            .unwrap();

        assert_eq!(resp.statement_id.as_deref(), Some("abc"));
        assert_eq!(resp.state(), Some(&StatementState::Pending));
    }

    #[tokio::test]
    async fn non_success_status_becomes_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/2.0/sql/statements/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("statement not found"))
            .mount(&server)
            .await;

        let client = V2Client::new(&server.uri(), "t");
        let err = client.get_statement("missing").await.unwrap_err();

        match err {
            RelayError::Upstream { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "statement not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn chunk_is_fetched_by_index() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/2.0/sql/statements/abc/result/chunks/0"))
            .and(header("authorization", "Bearer t"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chunk_index": 0,
                "row_offset": 0,
                "data_array": [["a"], ["b"]]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = V2Client::new(&server.uri(), "t");
        let chunk = client.get_statement_result_chunk("abc", 0).await.unwrap();

        assert_eq!(chunk.data_array, Some(json!([["a"], ["b"]])));
        assert_eq!(chunk.extra.get("row_offset"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn garbage_body_is_a_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/2.0/sql/statements/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = V2Client::new(&server.uri(), "t");
        let err = client.get_statement("abc").await.unwrap_err();
        assert!(matches!(err, RelayError::Decode(_)));
    }

    #[tokio::test]
    async fn stalled_upstream_hits_the_request_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/2.0/sql/statements/abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": { "state": "RUNNING" } }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client =
            V2Client::new(&server.uri(), "t").with_request_timeout(Duration::from_millis(100));
        let started = std::time::Instant::now();
        let err = client.get_statement("abc").await.unwrap_err();

        match err {
            RelayError::Transport(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
