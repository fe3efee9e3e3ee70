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

//! Index-schema bootstrap (§6.3, supplement resolving the "out of scope: index-schema bootstrap"
//! note). A one-shot setup tool, grounded in
//! `original_source/ETLs/postgres_to_es_refactored/create_es_schemas.py`'s `init_schema`: PUT the
//! fixed mapping for every `*.json` file under `schemas/` to `<ES_URL>/<stem>`, treating HTTP 400
//! (index already exists) as a no-op and any other non-2xx status as an error. Not part of the
//! sync cycle's retry/backoff envelope — this runs once, by hand, before the first cycle.

use std::path::PathBuf;

use clap::Parser;
use reqwest::StatusCode;

#[derive(Parser, Debug)]
#[command(name = "create-index", about = "Bootstrap the search index schema")]
struct Cli {
    #[clap(long, env = "ES_URL", default_value = "http://localhost:9200")]
    es_url: String,

    #[clap(long, env = "ES_INDEX", default_value = "movies")]
    es_index: String,

    #[clap(long, default_value = "sync/schemas")]
    schemas_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let schema_path = cli.schemas_dir.join(format!("{}.json", cli.es_index));
    let schema: serde_json::Value = match std::fs::read_to_string(&schema_path) {
        Ok(raw) => serde_json::from_str(&raw).expect("schema file is not valid JSON"),
        Err(err) => {
            tracing::error!(%err, path = %schema_path.display(), "failed to read schema file");
            std::process::exit(1);
        }
    };

    if let Err(err) = init_schema(&client, &cli.es_url, &cli.es_index, &schema).await {
        tracing::error!(%err, "failed to create index");
        std::process::exit(1);
    }
}

async fn init_schema(
    client: &reqwest::Client,
    es_url: &str,
    index: &str,
    schema: &serde_json::Value,
) -> reqwest::Result<()> {
    let url = format!("{}/{}", es_url.trim_end_matches('/'), index);
    let response = client.put(&url).json(schema).send().await?;

    match response.status() {
        StatusCode::OK | StatusCode::CREATED => {
            let text = response.text().await.unwrap_or_default();
            tracing::info!(index, response = %text, "created index schema");
        }
        StatusCode::BAD_REQUEST => {
            let text = response.text().await.unwrap_or_default();
            tracing::info!(index, response = %text, "index schema already exists");
        }
        status => {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(index, %status, response = %text, "failed to create index schema");
        }
    }
    Ok(())
}
