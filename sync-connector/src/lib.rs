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

//! The trigger-resolver-composer-loader pipeline library: a Postgres-backed change-data-capture
//! source, a set of pull/push pipeline stages, and an Elasticsearch-style bulk loader, with the
//! crash-safe watermark bookkeeping that ties a cycle's side effects into one ordered sequence.
//!
//! The binary crate (`catalog-sync`) owns configuration loading, logging, the pidfile guard
//! lifetime, and the outer cycle-runner that sequences the three entity classes; everything here
//! is a library a caller drives explicitly.

pub mod enricher;
pub mod error;
pub mod loader;
pub mod merger;
pub mod model;
pub mod pg;
pub mod pidfile;
pub mod producer;
pub mod retry;
pub mod transformer;
pub mod watermark;

pub use error::{PipelineError, Result};
pub use model::{EntityClass, EntityRef, FilmworkFanoutRow, IndexDocument, PersonRef, Role};
