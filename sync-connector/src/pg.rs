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

//! Relational source access (§4.2, §4.3, §4.4). One [`PgClient`] is shared across every stage of
//! every class's cycle; queries are plain `tokio_postgres` calls wrapped in [`BackoffPolicy`] the
//! same way the teacher wraps its own Postgres CDC parser calls.

use chrono::{DateTime, Utc};
use tokio_postgres::{Config, NoTls};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{EntityClass, EntityRef, FilmworkFanoutRow, Role};
use crate::retry::BackoffPolicy;

pub struct PgClient {
    client: tokio_postgres::Client,
    retry: BackoffPolicy,
}

impl PgClient {
    /// Connects and spawns the driver's background connection task, logging it to completion.
    /// Mirrors the connect/spawn pairing the teacher uses around every bare `tokio_postgres::connect`
    /// call (`parser/postgres.rs`): the library never awaits the connection future itself, only the
    /// client built from it.
    pub async fn connect(config: Config, retry: BackoffPolicy) -> Result<Self> {
        let (client, connection) = retry
            .retry(
                || {
                    let config = config.clone();
                    async move { config.connect(NoTls).await }
                },
                |_err| true,
            )
            .await?;

        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::error!(?err, "postgres connection task terminated");
            }
        });

        Ok(Self { client, retry })
    }

    /// Producer page for `Genre`/`Person` (§4.2). `Filmwork` never calls this — its producer is the
    /// one-shot empty-batch shortcut in [`crate::producer`].
    ///
    /// Pages are ordered `(modified, id)` and the cursor is the last row's `(modified, id)` pair,
    /// compared with Postgres row-value comparison (`WHERE (modified, id) > ($1, $2)`). This is the
    /// resolution to the skip-at-equal-timestamp hazard a plain `modified > $1` cursor has when two
    /// rows share a timestamp and land on either side of a page boundary.
    pub async fn query_producer_page(
        &self,
        class: EntityClass,
        after_modified: DateTime<Utc>,
        after_id: Uuid,
        page_size: i64,
    ) -> Result<Vec<EntityRef>> {
        let table = class
            .source_table()
            .expect("query_producer_page called for a class with no source table");
        let query = format!(
            "SELECT id, modified FROM {table} \
             WHERE (modified, id) > ($1, $2) \
             ORDER BY modified, id \
             LIMIT $3"
        );
        let rows = self
            .retry
            .retry(
                || {
                    let query = query.clone();
                    async move {
                        self.client
                            .query(&query, &[&after_modified, &after_id, &page_size])
                            .await
                    }
                },
                |_err| true,
            )
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(EntityRef {
                    id: row.try_get("id")?,
                    modified: row.try_get("modified")?,
                })
            })
            .collect()
    }

    /// Enricher page for `Genre`/`Person` (§4.3): filmworks linked to any of `ids` through the
    /// class's many-to-many table, modified after the shared filmwork watermark. Does not advance
    /// that watermark itself — only the `Filmwork` enricher does (§4.2 design note, §9 Open
    /// Question #2).
    pub async fn query_enricher_page(
        &self,
        class: EntityClass,
        ids: &[Uuid],
        after_modified: DateTime<Utc>,
        after_id: Uuid,
        page_size: i64,
    ) -> Result<Vec<EntityRef>> {
        let link_table = class
            .link_table()
            .expect("query_enricher_page called for a class with no link table");
        let link_column = class.link_column().unwrap();
        let query = format!(
            "SELECT fw.id, fw.modified FROM content.filmwork fw \
             JOIN {link_table} mtm ON mtm.filmwork_id = fw.id \
             WHERE (fw.modified, fw.id) > ($1, $2) AND mtm.{link_column} = ANY($3) \
             ORDER BY fw.modified, fw.id \
             LIMIT $4"
        );
        let rows = self
            .retry
            .retry(
                || {
                    let query = query.clone();
                    async move {
                        self.client
                            .query(&query, &[&after_modified, &after_id, &ids, &page_size])
                            .await
                    }
                },
                |_err| true,
            )
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(EntityRef {
                    id: row.try_get("id")?,
                    modified: row.try_get("modified")?,
                })
            })
            .collect()
    }

    /// Enricher page for `Filmwork` (§4.2 shortcut): a direct walk over `content.filmwork`, bounded
    /// only by the shared filmwork watermark, no link table. This is the one Enricher call that
    /// advances `filmwork_updated_at` on the caller's behalf by returning the page's tail
    /// `(modified, id)` for the caller to persist.
    pub async fn query_filmwork_page(
        &self,
        after_modified: DateTime<Utc>,
        after_id: Uuid,
        page_size: i64,
    ) -> Result<Vec<EntityRef>> {
        let query = "SELECT id, modified FROM content.filmwork \
                      WHERE (modified, id) > ($1, $2) \
                      ORDER BY modified, id \
                      LIMIT $3";
        let rows = self
            .retry
            .retry(
                || async {
                    self.client
                        .query(query, &[&after_modified, &after_id, &page_size])
                        .await
                },
                |_err| true,
            )
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(EntityRef {
                    id: row.try_get("id")?,
                    modified: row.try_get("modified")?,
                })
            })
            .collect()
    }

    /// Merger (§4.4): the full fan-out join across filmwork, person (via role) and genre for a
    /// batch of filmwork ids. One row per (person × role) × genre combination; folded into
    /// documents by [`crate::transformer`].
    pub async fn query_merge(&self, fw_ids: &[Uuid]) -> Result<Vec<FilmworkFanoutRow>> {
        if fw_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = "SELECT \
                        fw.id AS fw_id, \
                        fw.title, \
                        fw.description, \
                        fw.rating AS imdb_rating, \
                        fw.type AS fw_type, \
                        fw.created, \
                        fw.modified, \
                        fwp.role, \
                        p.id AS person_id, \
                        p.full_name, \
                        g.name AS genre \
                      FROM content.filmwork fw \
                      LEFT JOIN content.filmworks_persons fwp ON fwp.filmwork_id = fw.id \
                      LEFT JOIN content.person p ON p.id = fwp.person_id \
                      LEFT JOIN content.filmworks_genres fwg ON fwg.filmwork_id = fw.id \
                      LEFT JOIN content.genre g ON g.id = fwg.genre_id \
                      WHERE fw.id = ANY($1)";
        let rows = self
            .retry
            .retry(
                || async { self.client.query(query, &[&fw_ids]).await },
                |_err| true,
            )
            .await?;
        rows.into_iter()
            .map(|row| {
                let role_raw: Option<String> = row.try_get("role")?;
                let role = role_raw.map(|r| Role::parse(&r)).transpose()?;
                Ok(FilmworkFanoutRow {
                    fw_id: row.try_get("fw_id")?,
                    title: row.try_get("title")?,
                    description: row.try_get("description")?,
                    imdb_rating: row.try_get("imdb_rating")?,
                    fw_type: row.try_get("fw_type")?,
                    created: row.try_get("created")?,
                    modified: row.try_get("modified")?,
                    role,
                    person_id: row.try_get("person_id")?,
                    full_name: row.try_get("full_name")?,
                    genre: row.try_get("genre")?,
                })
            })
            .collect::<Result<Vec<_>>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Requires a running Postgres with the `content` schema loaded; not run in CI.
    #[ignore]
    #[tokio::test]
    async fn connects_and_pages_genres() {
        let mut config = Config::new();
        config
            .host("localhost")
            .port(5432)
            .user("app")
            .password("app")
            .dbname("movies");
        let pg = PgClient::connect(config, BackoffPolicy::new(3, Duration::from_secs(5)))
            .await
            .unwrap();
        let page = pg
            .query_producer_page(
                EntityClass::Genre,
                crate::watermark::epoch_default(),
                Uuid::nil(),
                100,
            )
            .await
            .unwrap();
        assert!(page.len() <= 100);
    }
}
