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

//! Merger stage (§4.4): a thin pass-through over [`PgClient::query_merge`]. Kept as its own module,
//! rather than inlined into the cycle runner, because it is the one stage the spec names
//! independently of Producer/Enricher/Transformer/Loader and a future caller (e.g. a one-off
//! re-index tool) may want to invoke it directly.

use uuid::Uuid;

use crate::error::Result;
use crate::model::FilmworkFanoutRow;
use crate::pg::PgClient;

pub async fn merge(pg: &PgClient, fw_ids: &[Uuid]) -> Result<Vec<FilmworkFanoutRow>> {
    pg.query_merge(fw_ids).await
}
