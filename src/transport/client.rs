//! Batteries-included client transport
//!
//! Stands in for "the target's native client": a `reqwest::Client` with automatic
//! content negotiation (including zstd) left on, session-style connection reuse, and
//! byte counts estimated from `Content-Length`/decoded body size rather than measured
//! on the wire — the tradeoff the raw transport exists to avoid.

use super::{CalibrationSample, Transport, TransportResult};
use crate::error::{KneeError, Result};
use crate::workload::Operation;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct ClientTransport {
    client: Client,
    base_url: String,
    database: String,
}

impl ClientTransport {
    pub fn new(client: Client, base_url: String, database: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            database,
        }
    }

    fn docs_url(&self, id: u64) -> String {
        format!("{}/databases/{}/docs?id=docs/{id}", self.base_url, self.database)
    }

    fn queries_url(&self) -> String {
        format!("{}/databases/{}/queries", self.base_url, self.database)
    }

    fn bulk_url(&self) -> String {
        format!("{}/databases/{}/bulk_docs", self.base_url, self.database)
    }

    async fn send_json(&self, method: reqwest::Method, url: &str, body: Option<serde_json::Value>) -> TransportResult {
        let bytes_out = body.as_ref().map(|b| serde_json::to_vec(b).map(|v| v.len()).unwrap_or(0) as u64).unwrap_or(0);
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => return TransportResult::failed(bytes_out, e.to_string()),
        };
        let status = response.status();
        let content_length = response.content_length();

        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return TransportResult::failed(bytes_out, e.to_string()),
        };
        let bytes_in = content_length.unwrap_or(body.len() as u64);

        if status.is_success() {
            TransportResult::ok(bytes_out, bytes_in)
        } else {
            TransportResult::failed(bytes_out, format!("HTTP {status}"))
        }
    }

    async fn send_raw(&self, method: reqwest::Method, url: &str, body: Option<Vec<u8>>) -> TransportResult {
        let bytes_out = body.as_ref().map(|b| b.len() as u64).unwrap_or(0);
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => return TransportResult::failed(bytes_out, e.to_string()),
        };
        let status = response.status();
        let content_length = response.content_length();
        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return TransportResult::failed(bytes_out, e.to_string()),
        };
        let bytes_in = content_length.unwrap_or(body.len() as u64);

        if status.is_success() {
            TransportResult::ok(bytes_out, bytes_in)
        } else {
            TransportResult::failed(bytes_out, format!("HTTP {status}"))
        }
    }
}

#[async_trait]
impl Transport for ClientTransport {
    async fn execute(&self, op: &Operation, cancel: &CancellationToken) -> TransportResult {
        let fut = async {
            match op {
                Operation::ReadById { id, .. } => self.send_raw(reqwest::Method::GET, &self.docs_url(*id), None).await,
                Operation::Insert { id, payload } | Operation::Update { id, payload } => {
                    self.send_raw(reqwest::Method::PUT, &self.docs_url(*id), Some(payload.to_vec())).await
                }
                Operation::BulkInsert { documents } => {
                    let body = serde_json::json!(documents
                        .iter()
                        .map(|(id, payload)| serde_json::json!({
                            "id": format!("docs/{id}"),
                            "document": String::from_utf8_lossy(payload),
                        }))
                        .collect::<Vec<_>>());
                    self.send_json(reqwest::Method::POST, &self.bulk_url(), Some(body)).await
                }
                Operation::Query { text, parameters } => {
                    let body = serde_json::json!({
                        "Query": text,
                        "QueryParameters": parameters.iter().cloned().collect::<std::collections::HashMap<_, _>>(),
                    });
                    self.send_json(reqwest::Method::POST, &self.queries_url(), Some(body)).await
                }
                Operation::VectorSearch { vector, field, k, threshold, .. } => {
                    let body = serde_json::json!({
                        "Field": field,
                        "Vector": vector,
                        "K": k,
                        "Threshold": threshold,
                    });
                    self.send_json(reqwest::Method::POST, &self.queries_url(), Some(body)).await
                }
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => TransportResult::cancelled(),
            result = fut => result,
        }
    }

    async fn calibrate(&self, path: &str) -> Result<CalibrationSample> {
        let url = format!("{}{path}", self.base_url);
        let start = Instant::now();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| KneeError::Transport(e.to_string()))?;
        let ttfb_us = start.elapsed().as_micros() as u64;
        response.bytes().await.map_err(|e| KneeError::Transport(e.to_string()))?;
        let total_us = start.elapsed().as_micros() as u64;
        Ok(CalibrationSample { ttfb_us, total_us })
    }

    async fn put_document(&self, id: u64, payload: &[u8]) -> Result<()> {
        let result = self.send_raw(reqwest::Method::PUT, &self.docs_url(id), Some(payload.to_vec())).await;
        if result.success {
            Ok(())
        } else {
            Err(KneeError::Transport(result.error_detail.unwrap_or_default()))
        }
    }

    async fn get_server_counters(&self) -> Option<String> {
        let url = format!("{}/admin/debug/memory/stats", self.base_url);
        self.client.get(&url).send().await.ok()?.text().await.ok()
    }

    async fn validate(&self) -> Result<()> {
        let url = format!("{}/databases/{}/stats", self.base_url, self.database);
        self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| KneeError::Transport(format!("target unreachable: {e}")))?;
        Ok(())
    }
}

pub fn build(base_url: String, database: String, http_client: Client) -> ClientTransport {
    ClientTransport::new(http_client, base_url, database)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docs_url_points_at_the_configured_database() {
        let transport = ClientTransport::new(Client::new(), "http://localhost:8080".to_string(), "bench".to_string());
        assert_eq!(transport.docs_url(42), "http://localhost:8080/databases/bench/docs?id=docs/42");
    }
}
