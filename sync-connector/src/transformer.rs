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

//! Transformer stage (§4.5): a pure fold of the merger's fan-out rows into one [`IndexDocument`]
//! per filmwork. No I/O, no retry policy — everything here is synchronous and total.

use indexmap::IndexMap;
use uuid::Uuid;

use crate::model::{push_unique, FilmworkFanoutRow, IndexDocument, PersonRef, Role};

/// Folds fan-out rows into documents, one per distinct `fw_id`, preserving the order filmworks
/// were first seen in `rows`. A filmwork with no person/genre rows at all (every joined column
/// `NULL`) still produces a document with empty collections — the `LEFT JOIN`s in
/// [`crate::pg::PgClient::query_merge`] guarantee at least one row per requested id.
pub fn transform(rows: Vec<FilmworkFanoutRow>) -> Vec<IndexDocument> {
    let mut filmworks: IndexMap<Uuid, IndexDocument> = IndexMap::new();

    for row in rows {
        let doc = filmworks.entry(row.fw_id).or_insert_with(|| {
            IndexDocument::new(
                row.fw_id,
                row.title.clone(),
                row.description.clone(),
                row.imdb_rating,
            )
        });

        if let Some(genre) = &row.genre {
            push_unique(&mut doc.genre, genre.clone());
        }

        apply_person(doc, &row);
    }

    filmworks.into_values().collect()
}

/// Role dispatch (§4.5): `Director` overwrites the single `director` field, `Actor`/`Writer`
/// append to their respective unique lists. A row with no person link (`role` is `None`) is a
/// no-op here — it only ever contributes the genre handled above.
fn apply_person(doc: &mut IndexDocument, row: &FilmworkFanoutRow) {
    let (Some(role), Some(person_id), Some(full_name)) =
        (row.role, row.person_id, row.full_name.clone())
    else {
        return;
    };

    match role {
        Role::Director => {
            doc.director = Some(full_name);
        }
        Role::Actor => {
            push_unique(
                &mut doc.actors,
                PersonRef {
                    id: person_id.to_string(),
                    name: full_name.clone(),
                },
            );
            push_unique(&mut doc.actors_names, full_name);
        }
        Role::Writer => {
            push_unique(
                &mut doc.writers,
                PersonRef {
                    id: person_id.to_string(),
                    name: full_name.clone(),
                },
            );
            push_unique(&mut doc.writers_names, full_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn base_row(fw_id: Uuid) -> FilmworkFanoutRow {
        FilmworkFanoutRow {
            fw_id,
            title: "Arrival".to_string(),
            description: "A linguist deciphers an alien language.".to_string(),
            imdb_rating: 8.0,
            fw_type: "movie".to_string(),
            created: Utc::now(),
            modified: Utc::now(),
            role: None,
            person_id: None,
            full_name: None,
            genre: None,
        }
    }

    fn person_row(
        fw_id: Uuid,
        role: Role,
        person_id: Uuid,
        name: &str,
    ) -> FilmworkFanoutRow {
        FilmworkFanoutRow {
            role: Some(role),
            person_id: Some(person_id),
            full_name: Some(name.to_string()),
            ..base_row(fw_id)
        }
    }

    fn genre_row(fw_id: Uuid, genre: &str) -> FilmworkFanoutRow {
        FilmworkFanoutRow {
            genre: Some(genre.to_string()),
            ..base_row(fw_id)
        }
    }

    /// S2: one filmwork row with no person/genre rows still yields a document.
    #[test]
    fn row_with_no_links_still_produces_a_document() {
        let fw_id = Uuid::new_v4();
        let docs = transform(vec![base_row(fw_id)]);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, fw_id.to_string());
        assert!(docs[0].genre.is_empty());
        assert!(docs[0].actors.is_empty());
        assert!(docs[0].director.is_none());
    }

    /// S5: duplicate (person, role, genre) combinations in the fan-out collapse to one entry.
    #[test]
    fn duplicate_links_are_deduplicated() {
        let fw_id = Uuid::new_v4();
        let actor_id = Uuid::new_v4();
        let rows = vec![
            person_row(fw_id, Role::Actor, actor_id, "Amy Adams"),
            person_row(fw_id, Role::Actor, actor_id, "Amy Adams"),
            genre_row(fw_id, "Drama"),
            genre_row(fw_id, "Drama"),
        ];
        let docs = transform(rows);
        assert_eq!(docs.len(), 1);
        assert!(docs[0].has_no_duplicates());
        assert_eq!(docs[0].actors.len(), 1);
        assert_eq!(docs[0].genre.len(), 1);
    }

    #[test]
    fn director_role_sets_single_value_field() {
        let fw_id = Uuid::new_v4();
        let director_id = Uuid::new_v4();
        let docs = transform(vec![person_row(
            fw_id,
            Role::Director,
            director_id,
            "Denis Villeneuve",
        )]);
        assert_eq!(docs[0].director.as_deref(), Some("Denis Villeneuve"));
    }

    /// A later director row for the same filmwork overwrites the earlier one rather than
    /// accumulating — this is the documented single-value anomaly (§4.5, Open Question #3).
    #[test]
    fn second_director_row_overwrites_first() {
        let fw_id = Uuid::new_v4();
        let docs = transform(vec![
            person_row(fw_id, Role::Director, Uuid::new_v4(), "First Director"),
            person_row(fw_id, Role::Director, Uuid::new_v4(), "Second Director"),
        ]);
        assert_eq!(docs[0].director.as_deref(), Some("Second Director"));
    }

    #[test]
    fn two_filmworks_stay_independent_and_in_first_seen_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let docs = transform(vec![genre_row(second, "Comedy"), genre_row(first, "Drama")]);
        assert_eq!(docs[0].id, second.to_string());
        assert_eq!(docs[1].id, first.to_string());
    }
}
