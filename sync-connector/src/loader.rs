// Copyright 2024 RisingWave Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Loader stage (§4.6): bulk-indexes documents over the search index's HTTP `_bulk` endpoint.
//! Modeled on the `reqwest`-based bulk senders the teacher ships for its own HTTP sinks
//! (`connector/src/sink/doris_starrocks_connector.rs`): build one `Client`, reuse it, retry only
//! the transport call — per-item indexing errors are logged, never retried (§7 kind 2).

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::Result;
use crate::model::IndexDocument;
use crate::retry::BackoffPolicy;

pub struct EsLoader {
    client: Client,
    base_url: String,
    index: String,
    retry: BackoffPolicy,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    index: BulkItemResult,
}

#[derive(Debug, Deserialize)]
struct BulkItemResult {
    #[serde(default)]
    #[serde(rename = "_id")]
    id: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl EsLoader {
    pub fn new(base_url: String, index: String, retry: BackoffPolicy) -> Self {
        Self {
            client: Client::new(),
            base_url,
            index,
            retry,
        }
    }

    /// Bulk-indexes `docs`, logging (not raising) any per-item failure the index reports (§7 kind
    /// 2). An empty `docs` is a no-op — callers should not invoke this for an empty transformer
    /// output, but nothing breaks if they do.
    pub async fn load(&self, docs: &[IndexDocument]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }

        let body = build_bulk_body(&self.index, docs)?;
        let url = format!("{}/_bulk", self.base_url.trim_end_matches('/'));

        let response = self
            .retry
            .retry(
                || {
                    let body = body.clone();
                    let url = url.clone();
                    async move {
                        self.client
                            .post(&url)
                            .header("Content-Type", "application/x-ndjson")
                            .body(body)
                            .send()
                            .await
                    }
                },
                |err| !matches!(err.status(), Some(status) if status.is_client_error()),
            )
            .await?;

        tracing::info!(count = docs.len(), status = %response.status(), "bulk request sent");

        if response.status() == StatusCode::BAD_REQUEST {
            // Index missing or schema mismatch; the spec treats this as a logged failure for the
            // whole batch rather than a retryable transport error (§7 kind 2).
            let text = response.text().await.unwrap_or_default();
            tracing::error!(response = %text, "bulk request rejected");
            return Ok(());
        }

        let parsed: BulkResponse = response.json().await?;
        for item in parsed.items {
            if let Some(error) = item.index.error {
                tracing::error!(id = ?item.index.id, %error, "document failed to index");
            }
        }
        Ok(())
    }
}

fn build_bulk_body(index: &str, docs: &[IndexDocument]) -> Result<String> {
    let mut body = String::new();
    for doc in docs {
        let action = serde_json::json!({ "index": { "_index": index, "_id": doc.id } });
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(doc)?);
        body.push('\n');
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn bulk_body_has_one_action_line_per_document() {
        let doc = IndexDocument::new(
            Uuid::new_v4(),
            "Arrival".to_string(),
            "desc".to_string(),
            8.0,
        );
        let body = build_bulk_body("movies", std::slice::from_ref(&doc)).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"_index\":\"movies\""));
        assert!(lines[1].contains(doc.id.as_str()));
    }

    /// Requires a running Elasticsearch-compatible endpoint; not run in CI.
    #[ignore]
    #[tokio::test]
    async fn bulk_loads_against_live_index() {
        let loader = EsLoader::new(
            "http://localhost:9200".to_string(),
            "movies".to_string(),
            BackoffPolicy::http_default(),
        );
        let doc = IndexDocument::new(
            Uuid::new_v4(),
            "Arrival".to_string(),
            "desc".to_string(),
            8.0,
        );
        loader.load(&[doc]).await.unwrap();
    }
}
