//! Database query functions for the `exercise_sets` table.
//!
//! Sets are only ever written as a whole collection on behalf of their
//! exercise: [`insert_sets`] on create and [`replace_sets`] on update. Both
//! expect to run inside the caller's transaction.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use sqlx::{PgConnection, PgExecutor, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use crate::models::{ExerciseSet, SetKind};

/// A set as submitted for persistence, before it has a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSet {
    /// ID of an existing set to keep on update. Ignored on create.
    pub id: Option<Uuid>,
    pub name: Option<String>,
    /// Nanoseconds.
    pub rest_time: i64,
    pub kind: Option<SetKind>,
}

/// A [`NewSet`] with its assigned 1-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderedSet<'a> {
    pub set_number: i32,
    pub set: &'a NewSet,
}

/// What [`replace_sets`] did to the stored collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    pub retained: usize,
    pub inserted: usize,
    pub removed: u64,
}

/// List the sets of one exercise in set order.
pub async fn list_sets_for_exercise(
    executor: impl PgExecutor<'_>,
    exercise_id: Uuid,
) -> Result<Vec<ExerciseSet>> {
    let sets = sqlx::query_as::<_, ExerciseSet>(
        "SELECT * FROM exercise_sets WHERE exercise_id = $1 ORDER BY set_number ASC",
    )
    .bind(exercise_id)
    .fetch_all(executor)
    .await
    .context("failed to list sets for exercise")?;

    Ok(sets)
}

/// List the sets of several exercises, grouped by exercise, each group in set
/// order. Exercises without sets are absent from the map.
pub async fn list_sets_for_exercises(
    executor: impl PgExecutor<'_>,
    exercise_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<ExerciseSet>>> {
    if exercise_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let sets = sqlx::query_as::<_, ExerciseSet>(
        "SELECT * FROM exercise_sets \
         WHERE exercise_id = ANY($1) \
         ORDER BY exercise_id, set_number ASC",
    )
    .bind(exercise_ids)
    .fetch_all(executor)
    .await
    .context("failed to list sets for exercises")?;

    let mut grouped: HashMap<Uuid, Vec<ExerciseSet>> = HashMap::new();
    for set in sets {
        grouped.entry(set.exercise_id).or_default().push(set);
    }
    Ok(grouped)
}

/// Insert every set for a freshly created exercise in one statement.
///
/// Set IDs are generated by the database.
pub async fn insert_sets(
    conn: &mut PgConnection,
    exercise_id: Uuid,
    sets: &[OrderedSet<'_>],
) -> Result<u64> {
    if sets.is_empty() {
        return Ok(0);
    }

    let mut query: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "INSERT INTO exercise_sets \
         (exercise_id, name, set_number, rest_time, rep_count, duration) ",
    );
    query.push_values(sets, |mut row, ordered| {
        let (rep_count, duration) = SetKind::columns(ordered.set.kind);
        row.push_bind(exercise_id)
            .push_bind(ordered.set.name.clone())
            .push_bind(ordered.set_number)
            .push_bind(ordered.set.rest_time)
            .push_bind(rep_count)
            .push_bind(duration);
    });

    let result = query
        .build()
        .execute(&mut *conn)
        .await
        .context("failed to insert exercise sets")?;

    debug!(%exercise_id, rows = result.rows_affected(), "inserted exercise sets");
    Ok(result.rows_affected())
}

/// Make the stored sets of `exercise_id` exactly `sets`.
///
/// Stored sets whose ID is not submitted are deleted. A submitted ID that
/// belongs to this exercise keeps its row (updated in place); any other set,
/// including one naming an ID from a different exercise, is inserted fresh.
pub async fn replace_sets(
    conn: &mut PgConnection,
    exercise_id: Uuid,
    sets: &[OrderedSet<'_>],
) -> Result<ReplaceSummary> {
    let existing: HashSet<Uuid> =
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM exercise_sets WHERE exercise_id = $1")
            .bind(exercise_id)
            .fetch_all(&mut *conn)
            .await
            .context("failed to read existing exercise sets")?
            .into_iter()
            .collect();

    let mut retained: Vec<Uuid> = Vec::new();
    let mut row_ids: Vec<Uuid> = Vec::with_capacity(sets.len());
    for ordered in sets {
        let id = match ordered.set.id {
            Some(id) if existing.contains(&id) && !retained.contains(&id) => {
                retained.push(id);
                id
            }
            _ => Uuid::new_v4(),
        };
        row_ids.push(id);
    }

    let removed = sqlx::query(
        "DELETE FROM exercise_sets WHERE exercise_id = $1 AND NOT (id = ANY($2))",
    )
    .bind(exercise_id)
    .bind(&retained)
    .execute(&mut *conn)
    .await
    .context("failed to delete superseded exercise sets")?
    .rows_affected();

    if !sets.is_empty() {
        let mut query: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO exercise_sets \
             (id, exercise_id, name, set_number, rest_time, rep_count, duration) ",
        );
        query.push_values(sets.iter().zip(&row_ids), |mut row, (ordered, id)| {
            let (rep_count, duration) = SetKind::columns(ordered.set.kind);
            row.push_bind(*id)
                .push_bind(exercise_id)
                .push_bind(ordered.set.name.clone())
                .push_bind(ordered.set_number)
                .push_bind(ordered.set.rest_time)
                .push_bind(rep_count)
                .push_bind(duration);
        });
        query.push(
            " ON CONFLICT (id) DO UPDATE SET \
             name = EXCLUDED.name, \
             set_number = EXCLUDED.set_number, \
             rest_time = EXCLUDED.rest_time, \
             rep_count = EXCLUDED.rep_count, \
             duration = EXCLUDED.duration, \
             updated_at = now()",
        );

        query
            .build()
            .execute(&mut *conn)
            .await
            .context("failed to upsert exercise sets")?;
    }

    let summary = ReplaceSummary {
        retained: retained.len(),
        inserted: sets.len() - retained.len(),
        removed,
    };
    debug!(%exercise_id, ?summary, "replaced exercise sets");
    Ok(summary)
}
