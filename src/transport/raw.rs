//! Hand-built request transport
//!
//! Every request is assembled explicitly — method, headers, body — rather than
//! delegated to a client session with automatic content negotiation. Automatic
//! response decompression is disabled on the underlying `reqwest::Client` so the
//! wire bytes can be measured exactly before this module decodes them by hand.

use super::{CalibrationSample, Transport, TransportResult};
use crate::config::CompressionMode;
use crate::error::{KneeError, Result};
use crate::workload::Operation;
use async_trait::async_trait;
use reqwest::Client;
use std::io::Read;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct RawTransport {
    client: Client,
    base_url: String,
    database: String,
    compression: CompressionMode,
}

impl RawTransport {
    pub fn new(client: Client, base_url: String, database: String, compression: CompressionMode) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            database,
            compression,
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

    fn accept_encoding(&self) -> &'static str {
        match self.compression {
            CompressionMode::Identity => "identity",
            CompressionMode::Gzip => "gzip",
            CompressionMode::Brotli => "br",
            CompressionMode::Deflate => "deflate",
            // The raw transport does not implement zstd decoding; request identity
            // rather than silently mis-measuring compressed bytes it can't decode.
            CompressionMode::Zstd => "identity",
        }
    }

    async fn send(&self, method: reqwest::Method, url: &str, body: Option<Vec<u8>>) -> (TransportResult, Option<Vec<u8>>) {
        let bytes_out = body.as_ref().map(|b| b.len() as u64).unwrap_or(0);
        let mut request = self.client.request(method, url).header(reqwest::header::ACCEPT_ENCODING, self.accept_encoding());
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => return (TransportResult::failed(bytes_out, e.to_string()), None),
        };

        let status = response.status();
        let encoding = response
            .headers()
            .get(reqwest::header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("identity")
            .to_string();

        let wire_bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return (TransportResult::failed(bytes_out, e.to_string()), None),
        };
        let bytes_in = wire_bytes.len() as u64;

        if !status.is_success() {
            return (
                TransportResult::failed(bytes_out, format!("HTTP {status}")),
                None,
            );
        }

        match decompress(&wire_bytes, &encoding) {
            Ok(decoded) => (TransportResult::ok(bytes_out, bytes_in), Some(decoded)),
            Err(e) => (TransportResult::failed(bytes_out, format!("decompression failed: {e}")), None),
        }
    }
}

fn decompress(body: &[u8], encoding: &str) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    match encoding {
        "gzip" => {
            flate2::read::GzDecoder::new(body).read_to_end(&mut out)?;
        }
        "deflate" => {
            flate2::read::DeflateDecoder::new(body).read_to_end(&mut out)?;
        }
        "br" => {
            brotli::Decompressor::new(body, 4096).read_to_end(&mut out)?;
        }
        _ => out.extend_from_slice(body),
    }
    Ok(out)
}

#[async_trait]
impl Transport for RawTransport {
    async fn execute(&self, op: &Operation, cancel: &CancellationToken) -> TransportResult {
        let fut = async {
            match op {
                Operation::ReadById { id, .. } => self.send(reqwest::Method::GET, &self.docs_url(*id), None).await.0,
                Operation::Insert { id, payload } | Operation::Update { id, payload } => {
                    self.send(reqwest::Method::PUT, &self.docs_url(*id), Some(payload.to_vec())).await.0
                }
                Operation::BulkInsert { documents } => {
                    let body = serde_json::to_vec(
                        &documents
                            .iter()
                            .map(|(id, payload)| {
                                serde_json::json!({ "id": format!("docs/{id}"), "document": String::from_utf8_lossy(payload) })
                            })
                            .collect::<Vec<_>>(),
                    )
                    .unwrap_or_default();
                    self.send(reqwest::Method::POST, &self.bulk_url(), Some(body)).await.0
                }
                Operation::Query { text, parameters } => {
                    let body = serde_json::to_vec(&serde_json::json!({
                        "Query": text,
                        "QueryParameters": parameters.iter().cloned().collect::<std::collections::HashMap<_, _>>(),
                    }))
                    .unwrap_or_default();
                    self.send(reqwest::Method::POST, &self.queries_url(), Some(body)).await.0
                }
                Operation::VectorSearch { vector, field, k, threshold, .. } => {
                    let body = serde_json::to_vec(&serde_json::json!({
                        "Field": field,
                        "Vector": vector,
                        "K": k,
                        "Threshold": threshold,
                    }))
                    .unwrap_or_default();
                    self.send(reqwest::Method::POST, &self.queries_url(), Some(body)).await.0
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
        let (result, _) = self.send(reqwest::Method::PUT, &self.docs_url(id), Some(payload.to_vec())).await;
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

pub fn build(base_url: String, database: String, compression: CompressionMode, http_client: Client) -> RawTransport {
    RawTransport::new(http_client, base_url, database, compression)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_decompress_is_a_passthrough() {
        let body = b"hello world";
        let out = decompress(body, "identity").unwrap();
        assert_eq!(out, body);
    }

    #[test]
    fn gzip_roundtrip_decompresses_correctly() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"round trip me").unwrap();
        let compressed = encoder.finish().unwrap();

        let out = decompress(&compressed, "gzip").unwrap();
        assert_eq!(out, b"round trip me");
    }

    #[test]
    fn zstd_requested_falls_back_to_identity_accept_encoding() {
        let transport = RawTransport::new(
            Client::new(),
            "http://localhost:8080".to_string(),
            "bench".to_string(),
            CompressionMode::Zstd,
        );
        assert_eq!(transport.accept_encoding(), "identity");
    }
}
