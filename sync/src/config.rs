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

//! Configuration loading (§6, resolves the "out of scope: environment/DSN configuration loading"
//! note). One `clap::Parser` struct with `env` lookups for every key the spec enumerates, in the
//! same shape the teacher uses for its node `Opts` structs (`risingwave_meta::MetaNodeOpts`):
//! `#[clap(long, env = "...", default_value = "...")]` per field, no separate config file format.

use std::time::Duration;

use content_sync_connector::retry::BackoffPolicy;
use chrono::{DateTime, Utc};
use clap::Parser;
use tokio_postgres::Config as PgConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "catalog-sync", about = "Incremental film-catalog search-index sync")]
pub struct Cli {
    #[clap(long, env = "PG_HOST", default_value = "localhost")]
    pub pg_host: String,

    #[clap(long, env = "PG_PORT", default_value_t = 5432)]
    pub pg_port: u16,

    #[clap(long, env = "PG_USER", default_value = "app")]
    pub pg_user: String,

    #[clap(long, env = "PG_PASSWORD", default_value = "")]
    pub pg_password: String,

    #[clap(long, env = "PG_DBNAME", default_value = "movies")]
    pub pg_dbname: String,

    #[clap(long, env = "ES_URL", default_value = "http://localhost:9200")]
    pub es_url: String,

    #[clap(long, env = "ES_INDEX", default_value = "movies")]
    pub es_index: String,

    #[clap(long, env = "STATE_PATH", default_value = "./state.json")]
    pub state_path: String,

    #[clap(long, env = "PID_PATH", default_value = "./catalog-sync.pid")]
    pub pid_path: String,

    #[clap(long, env = "PAGE_SIZE", default_value_t = 100)]
    pub page_size: i64,

    #[clap(long, env = "BACKOFF_MAX_TRIES", default_value_t = 5)]
    pub backoff_max_tries: usize,

    #[clap(long, env = "BACKOFF_MAX_TIME_DB_SECS", default_value_t = 10)]
    pub backoff_max_time_db_secs: u64,

    #[clap(long, env = "BACKOFF_MAX_TIME_HTTP_SECS", default_value_t = 300)]
    pub backoff_max_time_http_secs: u64,

    /// `DEFAULT_UPDATED_AT`; only consulted by documentation today since
    /// `content_sync_connector::watermark::epoch_default` already returns the spec's fixed
    /// 1970-01-01T00:00:00Z sentinel. Kept as a configuration key so an operator replaying a
    /// known-good cutover point doesn't need to hand-edit `state.json`.
    #[clap(long, env = "DEFAULT_UPDATED_AT", default_value = "1970-01-01T00:00:00Z")]
    pub default_updated_at: DateTime<Utc>,
}

impl Cli {
    pub fn pg_config(&self) -> PgConfig {
        let mut config = PgConfig::new();
        config
            .host(&self.pg_host)
            .port(self.pg_port)
            .user(&self.pg_user)
            .password(&self.pg_password)
            .dbname(&self.pg_dbname);
        config
    }

    pub fn db_backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.backoff_max_tries,
            Duration::from_secs(self.backoff_max_time_db_secs),
        )
    }

    pub fn http_backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.backoff_max_tries,
            Duration::from_secs(self.backoff_max_time_http_secs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cli = Cli::parse_from(["catalog-sync"]);
        assert_eq!(cli.es_index, "movies");
        assert_eq!(cli.page_size, 100);
        assert_eq!(cli.backoff_max_tries, 5);
        assert_eq!(cli.backoff_max_time_db_secs, 10);
        assert_eq!(cli.backoff_max_time_http_secs, 300);
    }

    #[test]
    fn pg_config_assembles_from_pieces() {
        let cli = Cli::parse_from([
            "catalog-sync",
            "--pg-host",
            "db.internal",
            "--pg-port",
            "6543",
            "--pg-user",
            "svc",
            "--pg-dbname",
            "catalog",
        ]);
        let config = cli.pg_config();
        assert_eq!(config.get_hosts().len(), 1);
    }
}
