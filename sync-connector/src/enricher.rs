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

//! Enricher stage (§4.3): resolves a batch of changed `Genre`/`Person`/`Filmwork` ids into the
//! filmwork ids that need re-indexing as a result.

use futures_async_stream::try_stream;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::model::EntityClass;
use crate::pg::PgClient;
use crate::watermark::WatermarkStore;

/// For `Genre`/`Person`: walks filmworks linked to `ids` through the class's link table, bounded by
/// the shared filmwork watermark, without advancing it — the `Filmwork` class's own producer/
/// enricher pair owns that watermark (§4.2 design note, §9 Open Question #2). For `Filmwork`: the
/// real per-class walk lives here too, since its producer only ever sends one empty batch; this is
/// the one call site that both reads and advances `filmwork_updated_at`.
#[try_stream(ok = Vec<Uuid>, error = PipelineError)]
pub async fn enrich<'a>(
    pg: &'a PgClient,
    watermark: &'a WatermarkStore,
    class: EntityClass,
    ids: Vec<Uuid>,
    page_size: i64,
) {
    if class == EntityClass::Filmwork {
        let mut cursor_id = Uuid::nil();
        loop {
            let cursor_modified = watermark.get(EntityClass::filmwork_watermark_key());
            let page = pg
                .query_filmwork_page(cursor_modified, cursor_id, page_size)
                .await?;

            if page.is_empty() {
                tracing::info!("no updated filmworks found");
                break;
            }

            let fw_ids: Vec<Uuid> = page.iter().map(|r| r.id).collect();
            let tail = page.last().unwrap();
            let (tail_modified, tail_id) = (tail.modified, tail.id);

            yield fw_ids;

            watermark.set(EntityClass::filmwork_watermark_key(), tail_modified)?;
            cursor_id = tail_id;
        }
        return;
    }

    if ids.is_empty() {
        return;
    }

    // Seeded once from the shared filmwork watermark, then advanced locally from each page's tail
    // row — never persisted back (only `Filmwork`'s own enricher pass is allowed to move
    // `filmwork_updated_at` forward, §4.2 design note). Mirrors the Python original's local
    // `updated_at = result[-1].modified` advance, which is also never written back to the state
    // file.
    let mut cursor_modified = watermark.get(EntityClass::filmwork_watermark_key());
    let mut cursor_id = Uuid::nil();
    loop {
        let page = pg
            .query_enricher_page(class, &ids, cursor_modified, cursor_id, page_size)
            .await?;

        if page.is_empty() {
            break;
        }

        let fw_ids: Vec<Uuid> = page.iter().map(|r| r.id).collect();
        let tail = page.last().unwrap();
        cursor_modified = tail.modified;
        cursor_id = tail.id;

        yield fw_ids;
    }
}
