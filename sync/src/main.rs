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

//! Entry point: load configuration, wire logging, acquire the single-instance pidfile lock, run
//! one cycle over every entity class, and map the outcome to a process exit code (§6, §7).

mod config;
mod cycle;

use content_sync_connector::loader::EsLoader;
use content_sync_connector::pg::PgClient;
use content_sync_connector::pidfile::PidFile;
use content_sync_connector::watermark::WatermarkStore;
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = config::Cli::parse();
    init_logger();

    let _pid_guard = match PidFile::acquire(&cli.pid_path) {
        Ok(guard) => guard,
        Err(err) => {
            tracing::error!(%err, "refusing to start");
            std::process::exit(1);
        }
    };

    match run(&cli).await {
        Ok(()) => {
            tracing::info!("sync finished successfully");
        }
        Err(err) => {
            tracing::error!(%err, "sync aborted");
            std::process::exit(1);
        }
    }
}

async fn run(cli: &config::Cli) -> content_sync_connector::error::Result<()> {
    let watermark = WatermarkStore::open(&cli.state_path)?;
    let pg = PgClient::connect(cli.pg_config(), cli.db_backoff()).await?;
    let loader = EsLoader::new(cli.es_url.clone(), cli.es_index.clone(), cli.http_backoff());

    cycle::run_all(&pg, &watermark, &loader, cli.page_size).await
}

/// `tracing` + `tracing-subscriber`'s `fmt` layer, `RUST_LOG`-filterable, defaulting to `info`
/// (§6.2). Deliberately simpler than the teacher's multi-layer `init_risingwave_logger` (no
/// OpenTelemetry/Jaeger/tokio-console wiring) — this process is a short-lived batch cycle, not a
/// long-running server with a dashboard to export traces to.
fn init_logger() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();
}
