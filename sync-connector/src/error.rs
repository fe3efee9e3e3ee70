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

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors surfaced by the trigger-resolver-composer-loader pipeline.
///
/// `Database` and `Transport` are the transient-external kind (§7 kind 1): stage call sites wrap
/// them in [`crate::retry`] and only let them escape here once the backoff budget is exhausted.
/// `Invariant` is the programmer/logic kind (§7 kind 3) and is never retried.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("search index transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("watermark store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("watermark store serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("another instance is already running (pid {0})")]
    AlreadyRunning(u32),

    #[error("invalid pidfile at {path}: {reason}")]
    InvalidPidFile { path: String, reason: String },

    #[error("invariant violation: {0}")]
    Invariant(String),
}

impl PipelineError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        PipelineError::Invariant(msg.into())
    }
}
