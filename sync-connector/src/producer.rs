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

//! Producer stage (§4.2): walks a class's own watermark forward, yielding id batches. Built with
//! `futures_async_stream::try_stream`, the same generator macro the teacher uses for its Kinesis
//! shard reader (`connector/src/kinesis/source/reader.rs`) — the generator only resumes after the
//! caller has finished with the yielded batch, which is exactly the "persist the watermark only
//! after downstream has processed it" ordering the cycle runner needs (§5).

use futures_async_stream::try_stream;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::model::EntityClass;
use crate::pg::PgClient;
use crate::watermark::WatermarkStore;

/// Yields one batch of ids per page until the source table is exhausted, then returns. `Filmwork`
/// never calls the real query (§4.2 design note, §9 Open Question #2): it yields a single empty
/// batch and stops, leaving the real walk — and that watermark's advancement — entirely to the
/// Enricher.
#[try_stream(ok = Vec<Uuid>, error = PipelineError)]
pub async fn produce<'a>(
    pg: &'a PgClient,
    watermark: &'a WatermarkStore,
    class: EntityClass,
    page_size: i64,
) {
    if class.source_table().is_none() {
        yield Vec::new();
        return;
    }

    // The `(modified, id)` cursor's `id` half is not itself part of the persisted watermark (§4.1
    // stores a single `DateTime` per key); it only needs to survive within this stream's own
    // lifetime, to split ties among rows sharing `modified` across adjacent pages. A restart
    // reseeds it to `Uuid::nil()`, the lowest possible id, which re-admits every row still sitting
    // on the last persisted `modified` instead of silently skipping any of them.
    let mut cursor_id = Uuid::nil();

    loop {
        let cursor_modified = watermark.get(class.watermark_key());
        let page = pg
            .query_producer_page(class, cursor_modified, cursor_id, page_size)
            .await?;

        if page.is_empty() {
            tracing::info!(class = class.as_str(), "no updated rows found");
            break;
        }

        let ids: Vec<Uuid> = page.iter().map(|r| r.id).collect();
        let tail = page.last().unwrap();
        let (tail_modified, tail_id) = (tail.modified, tail.id);

        yield ids;

        watermark.set(class.watermark_key(), tail_modified)?;
        cursor_id = tail_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filmwork_has_no_source_table() {
        assert!(EntityClass::Filmwork.source_table().is_none());
        assert!(EntityClass::Genre.source_table().is_some());
        assert!(EntityClass::Person.source_table().is_some());
    }
}
