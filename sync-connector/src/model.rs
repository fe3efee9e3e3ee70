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

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PipelineError;

/// Names a watched stream and selects the Producer/Enricher strategy for it.
///
/// This is the "strategy selector keyed by `EntityClass`" the design notes call for in place of
/// subtype polymorphism: no `Producer`/`Enricher` trait object hierarchy, just a plain enum with
/// associated data used to parameterize the shared SQL templates in [`crate::pg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityClass {
    Genre,
    Person,
    Filmwork,
}

impl EntityClass {
    /// All classes, in the order a single invocation runs them (sequential, no cross-class
    /// parallelism — see §5).
    pub const ALL: [EntityClass; 3] = [
        EntityClass::Genre,
        EntityClass::Person,
        EntityClass::Filmwork,
    ];

    /// The watermark key this class's own producer advances.
    pub fn watermark_key(self) -> &'static str {
        match self {
            EntityClass::Genre => "genre_updated_at",
            EntityClass::Person => "person_updated_at",
            EntityClass::Filmwork => "filmwork_updated_at",
        }
    }

    /// The watermark key shared by every enricher to bound its filmwork walk.
    pub fn filmwork_watermark_key() -> &'static str {
        EntityClass::Filmwork.watermark_key()
    }

    /// Source table queried by the Producer for this class. `Filmwork` has no table here because
    /// its Producer never queries (§4.2 filmwork shortcut).
    pub fn source_table(self) -> Option<&'static str> {
        match self {
            EntityClass::Genre => Some("content.genre"),
            EntityClass::Person => Some("content.person"),
            EntityClass::Filmwork => None,
        }
    }

    /// `filmwork_<class>` many-to-many link table joined by the Enricher.
    pub fn link_table(self) -> Option<&'static str> {
        match self {
            EntityClass::Genre => Some("content.filmworks_genres"),
            EntityClass::Person => Some("content.filmworks_persons"),
            EntityClass::Filmwork => None,
        }
    }

    /// Column on the link table that references this class's id.
    pub fn link_column(self) -> Option<&'static str> {
        match self {
            EntityClass::Genre => Some("genre_id"),
            EntityClass::Person => Some("person_id"),
            EntityClass::Filmwork => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityClass::Genre => "genre",
            EntityClass::Person => "person",
            EntityClass::Filmwork => "filmwork",
        }
    }
}

/// Minimal key returned by the Producer; `modified` advances the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRef {
    pub id: Uuid,
    pub modified: DateTime<Utc>,
}

/// `filmworks_persons.role` — a row with no person link decodes to `None`, not a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Director,
    Actor,
    Writer,
}

impl Role {
    pub fn parse(raw: &str) -> Result<Self, PipelineError> {
        match raw {
            "DIRECTOR" => Ok(Role::Director),
            "ACTOR" => Ok(Role::Actor),
            "WRITER" => Ok(Role::Writer),
            other => Err(PipelineError::invariant(format!(
                "unrecognized filmworks_persons.role {other:?}"
            ))),
        }
    }
}

/// One row of the raw join between `filmwork`, `filmworks_persons`/`person`, and
/// `filmworks_genres`/`genre`. Many rows compose one [`IndexDocument`] (one per (person × role) ×
/// genre cross product for a given filmwork).
#[derive(Debug, Clone)]
pub struct FilmworkFanoutRow {
    pub fw_id: Uuid,
    pub title: String,
    pub description: String,
    pub imdb_rating: f64,
    pub fw_type: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub role: Option<Role>,
    pub person_id: Option<Uuid>,
    pub full_name: Option<String>,
    pub genre: Option<String>,
}

/// A person reference nested inside an [`IndexDocument`]. Dedup key is the full tuple (both `id`
/// and `name`), distinct from the `_names` collections which dedup on name alone (§4.5).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: String,
    pub name: String,
}

/// The denormalized search-index document folded from a filmwork's fan-out rows.
///
/// `genre`/`actors`/`writers`/`actors_names`/`writers_names` are insertion-order-preserving sets:
/// plain `Vec`s with membership checked before push, so JSON serialization keeps first-seen order
/// (a `HashSet` would not). `director` is deliberately a single `String`, not a list — see the
/// documented anomaly in §4.5 and Open Question #3, resolved in DESIGN.md.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub id: String,
    pub title: String,
    pub description: String,
    pub imdb_rating: f64,
    pub genre: Vec<String>,
    pub actors: Vec<PersonRef>,
    pub writers: Vec<PersonRef>,
    pub actors_names: Vec<String>,
    pub writers_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
}

impl IndexDocument {
    pub fn new(fw_id: Uuid, title: String, description: String, imdb_rating: f64) -> Self {
        Self {
            id: fw_id.to_string(),
            title,
            description,
            imdb_rating,
            genre: Vec::new(),
            actors: Vec::new(),
            writers: Vec::new(),
            actors_names: Vec::new(),
            writers_names: Vec::new(),
            director: None,
        }
    }

    /// Invariant 3 (§3): every set-valued field is duplicate-free.
    #[cfg(test)]
    pub fn has_no_duplicates(&self) -> bool {
        let genre_set: HashSet<_> = self.genre.iter().collect();
        let actor_set: HashSet<_> = self.actors.iter().collect();
        let writer_set: HashSet<_> = self.writers.iter().collect();
        let actor_names_set: HashSet<_> = self.actors_names.iter().collect();
        let writer_names_set: HashSet<_> = self.writers_names.iter().collect();
        genre_set.len() == self.genre.len()
            && actor_set.len() == self.actors.len()
            && writer_set.len() == self.writers.len()
            && actor_names_set.len() == self.actors_names.len()
            && writer_names_set.len() == self.writers_names.len()
    }
}

/// Appends `value` to `vec` if not already present, preserving first-seen order.
pub(crate) fn push_unique<T: PartialEq>(vec: &mut Vec<T>, value: T) {
    if !vec.contains(&value) {
        vec.push(value);
    }
}
