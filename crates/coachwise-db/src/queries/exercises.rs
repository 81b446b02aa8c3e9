//! Database query functions for the `exercises` table.

use anyhow::{Context, Result};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{Exercise, ExerciseWithSets};
use crate::queries::sets;

/// Caller-editable fields of an exercise row.
#[derive(Debug, Clone, Copy)]
pub struct ExerciseFields<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub public: bool,
}

/// Which exercises a listing may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Every exercise (operator access).
    All,
    /// Public and shared exercises plus those owned by this user.
    User(Uuid),
}

/// Filters for [`list_exercises`].
#[derive(Debug, Clone)]
pub struct ExerciseFilter {
    pub visibility: Visibility,
    pub public: Option<bool>,
    /// Case-insensitive substring match on the name.
    pub name: Option<String>,
}

impl ExerciseFilter {
    pub fn new(visibility: Visibility) -> Self {
        Self {
            visibility,
            public: None,
            name: None,
        }
    }
}

/// Insert a new exercise row. Returns the inserted row with server-generated
/// id and timestamps.
pub async fn insert_exercise(
    executor: impl PgExecutor<'_>,
    owner_id: Option<Uuid>,
    fields: ExerciseFields<'_>,
) -> Result<Exercise> {
    let exercise = sqlx::query_as::<_, Exercise>(
        "INSERT INTO exercises (owner_id, name, description, public) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(owner_id)
    .bind(fields.name)
    .bind(fields.description)
    .bind(fields.public)
    .fetch_one(executor)
    .await
    .context("failed to insert exercise")?;

    Ok(exercise)
}

/// Fetch an exercise row by its ID.
pub async fn get_exercise(executor: impl PgExecutor<'_>, id: Uuid) -> Result<Option<Exercise>> {
    let exercise = sqlx::query_as::<_, Exercise>("SELECT * FROM exercises WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("failed to fetch exercise")?;

    Ok(exercise)
}

/// Overwrite the editable fields of an exercise and bump `updated_at`.
///
/// Returns `None` when no row has the given ID.
pub async fn update_exercise(
    executor: impl PgExecutor<'_>,
    id: Uuid,
    fields: ExerciseFields<'_>,
) -> Result<Option<Exercise>> {
    let exercise = sqlx::query_as::<_, Exercise>(
        "UPDATE exercises \
         SET name = $1, description = $2, public = $3, updated_at = now() \
         WHERE id = $4 \
         RETURNING *",
    )
    .bind(fields.name)
    .bind(fields.description)
    .bind(fields.public)
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to update exercise")?;

    Ok(exercise)
}

/// Delete an exercise; its sets go with it through the foreign key cascade.
///
/// Returns `false` when no row has the given ID.
pub async fn delete_exercise(executor: impl PgExecutor<'_>, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM exercises WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context("failed to delete exercise")?;

    Ok(result.rows_affected() > 0)
}

/// List exercise rows matching `filter`, newest first.
pub async fn list_exercises(
    executor: impl PgExecutor<'_>,
    filter: &ExerciseFilter,
) -> Result<Vec<Exercise>> {
    let mut query: QueryBuilder<'_, Postgres> =
        QueryBuilder::new("SELECT * FROM exercises WHERE TRUE");

    if let Visibility::User(user_id) = filter.visibility {
        query
            .push(" AND (public OR owner_id IS NULL OR owner_id = ")
            .push_bind(user_id)
            .push(")");
    }
    if let Some(public) = filter.public {
        query.push(" AND public = ").push_bind(public);
    }
    if let Some(name) = &filter.name {
        query
            .push(" AND name ILIKE ")
            .push_bind(like_pattern(name))
            .push(" ESCAPE '\\'");
    }
    query.push(" ORDER BY created_at DESC, id");

    let exercises = query
        .build_query_as::<Exercise>()
        .fetch_all(executor)
        .await
        .context("failed to list exercises")?;

    Ok(exercises)
}

/// Fetch an exercise and its sets in set order.
pub async fn get_aggregate(pool: &PgPool, id: Uuid) -> Result<Option<ExerciseWithSets>> {
    let Some(exercise) = get_exercise(pool, id).await? else {
        return Ok(None);
    };
    let sets = sets::list_sets_for_exercise(pool, id).await?;

    Ok(Some(ExerciseWithSets { exercise, sets }))
}

/// List exercises matching `filter` together with their sets.
///
/// Sets for all returned exercises are loaded with a single query.
pub async fn list_aggregates(
    pool: &PgPool,
    filter: &ExerciseFilter,
) -> Result<Vec<ExerciseWithSets>> {
    let exercises = list_exercises(pool, filter).await?;
    let ids: Vec<Uuid> = exercises.iter().map(|e| e.id).collect();
    let mut by_exercise = sets::list_sets_for_exercises(pool, &ids).await?;

    Ok(exercises
        .into_iter()
        .map(|exercise| {
            let sets = by_exercise.remove(&exercise.id).unwrap_or_default();
            ExerciseWithSets { exercise, sets }
        })
        .collect())
}

/// Build an `ILIKE` pattern matching `needle` anywhere, with wildcard
/// characters in the needle taken literally.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
