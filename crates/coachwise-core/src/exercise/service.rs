//! Exercise service layer.
//!
//! Creates and updates an exercise together with its full set collection in
//! one database transaction, then reloads the stored aggregate so callers see
//! server-assigned ids, timestamps, and set numbers. These functions do not
//! check ownership; see [`crate::access`] for the caller-facing wrappers.

use anyhow::Context;
use coachwise_db::models::ExerciseWithSets;
use coachwise_db::queries::exercises::{self, ExerciseFilter};
use coachwise_db::queries::sets;
use sqlx::PgPool;
use sqlx::error::ErrorKind;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::ordinal::assign_set_numbers;
use super::request::ExerciseSpec;
use super::validate::{ValidatedExercise, ValidationError, validate_exercise};

/// Errors surfaced by the exercise service.
#[derive(Debug, Error)]
pub enum ExerciseError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("exercise {0} not found")]
    NotFound(Uuid),

    #[error("exercise {0} belongs to another user")]
    Forbidden(Uuid),

    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

impl ExerciseError {
    /// Whether this is a persistence failure caused by a database constraint
    /// (check, unique, foreign key, not-null) rather than by the database
    /// being unavailable.
    pub fn is_constraint_violation(&self) -> bool {
        let Self::Persistence(err) = self else {
            return false;
        };
        err.chain()
            .filter_map(|cause| cause.downcast_ref::<sqlx::Error>())
            .filter_map(sqlx::Error::as_database_error)
            .any(|db| {
                matches!(
                    db.kind(),
                    ErrorKind::CheckViolation
                        | ErrorKind::UniqueViolation
                        | ErrorKind::ForeignKeyViolation
                        | ErrorKind::NotNullViolation
                )
            })
    }
}

/// Validate `spec` and create it as a new exercise owned by `owner_id`
/// (`None` for a shared exercise).
pub async fn create_exercise(
    pool: &PgPool,
    owner_id: Option<Uuid>,
    spec: &ExerciseSpec,
) -> Result<ExerciseWithSets, ExerciseError> {
    let exercise = validate_exercise(spec)?;
    create_validated_exercise(pool, owner_id, &exercise).await
}

/// Insert an already validated exercise and all of its sets.
///
/// The root row and the sets are written in one transaction; if any insert
/// fails nothing is kept.
pub async fn create_validated_exercise(
    pool: &PgPool,
    owner_id: Option<Uuid>,
    exercise: &ValidatedExercise,
) -> Result<ExerciseWithSets, ExerciseError> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let row = exercises::insert_exercise(&mut *tx, owner_id, exercise.fields()).await?;
    let ordered = assign_set_numbers(&exercise.sets);
    sets::insert_sets(&mut tx, row.id, &ordered).await?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(exercise_id = %row.id, sets = ordered.len(), "exercise created");
    reload(pool, row.id).await
}

/// Overwrite an exercise's fields and replace its whole set collection with
/// the sets in `spec`.
///
/// Sets absent from `spec` are deleted; a set naming the id of one of this
/// exercise's stored sets keeps that id. Concurrent updates of the same
/// exercise serialize on its row lock and the last one to commit wins.
pub async fn update_exercise(
    pool: &PgPool,
    id: Uuid,
    spec: &ExerciseSpec,
) -> Result<ExerciseWithSets, ExerciseError> {
    exercises::get_exercise(pool, id)
        .await?
        .ok_or(ExerciseError::NotFound(id))?;

    let exercise = validate_exercise(spec)?;

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    // Takes the row lock for the rest of the transaction.
    exercises::update_exercise(&mut *tx, id, exercise.fields())
        .await?
        .ok_or(ExerciseError::NotFound(id))?;

    let ordered = assign_set_numbers(&exercise.sets);
    let summary = sets::replace_sets(&mut tx, id, &ordered).await?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        exercise_id = %id,
        sets = ordered.len(),
        retained = summary.retained,
        removed = summary.removed,
        "exercise updated"
    );
    reload(pool, id).await
}

/// Fetch an exercise with its sets in set order.
pub async fn get_exercise(pool: &PgPool, id: Uuid) -> Result<ExerciseWithSets, ExerciseError> {
    reload(pool, id).await
}

/// Delete an exercise and, through the foreign key cascade, its sets.
pub async fn delete_exercise(pool: &PgPool, id: Uuid) -> Result<(), ExerciseError> {
    if !exercises::delete_exercise(pool, id).await? {
        return Err(ExerciseError::NotFound(id));
    }
    info!(exercise_id = %id, "exercise deleted");
    Ok(())
}

/// List exercises matching `filter` with their sets, newest first.
pub async fn list_exercises(
    pool: &PgPool,
    filter: &ExerciseFilter,
) -> Result<Vec<ExerciseWithSets>, ExerciseError> {
    Ok(exercises::list_aggregates(pool, filter).await?)
}

async fn reload(pool: &PgPool, id: Uuid) -> Result<ExerciseWithSets, ExerciseError> {
    exercises::get_aggregate(pool, id)
        .await?
        .ok_or(ExerciseError::NotFound(id))
}
