//! Who may see and change an exercise.
//!
//! A user can see public exercises, shared exercises (no owner), and their
//! own. Only the owner can change or delete an exercise. Exercises a user
//! cannot see are reported as not found, so their existence is not revealed.

use coachwise_db::models::{Exercise, ExerciseWithSets};
use coachwise_db::queries::exercises::{self, ExerciseFilter, Visibility};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::exercise::{ExerciseError, ExerciseSpec, service};

/// Whether `user_id` may read `exercise`.
pub fn can_view(exercise: &Exercise, user_id: Uuid) -> bool {
    exercise.public || exercise.owner_id.is_none_or(|owner| owner == user_id)
}

/// Whether `user_id` may change or delete `exercise`.
pub fn can_modify(exercise: &Exercise, user_id: Uuid) -> bool {
    exercise.owner_id == Some(user_id)
}

/// Fail with `NotFound` unless `user_id` may read `exercise`.
pub fn authorize_read(exercise: &Exercise, user_id: Uuid) -> Result<(), ExerciseError> {
    if can_view(exercise, user_id) {
        Ok(())
    } else {
        warn!(exercise_id = %exercise.id, %user_id, "read of hidden exercise refused");
        Err(ExerciseError::NotFound(exercise.id))
    }
}

/// Fail with `NotFound` if `user_id` cannot see `exercise`, or `Forbidden` if
/// they can see it but do not own it.
pub fn authorize_write(exercise: &Exercise, user_id: Uuid) -> Result<(), ExerciseError> {
    authorize_read(exercise, user_id)?;
    if can_modify(exercise, user_id) {
        Ok(())
    } else {
        warn!(exercise_id = %exercise.id, %user_id, "write to foreign exercise refused");
        Err(ExerciseError::Forbidden(exercise.id))
    }
}

/// Fetch an exercise on behalf of `user_id`.
pub async fn get_exercise_as(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<ExerciseWithSets, ExerciseError> {
    let aggregate = service::get_exercise(pool, id).await?;
    authorize_read(&aggregate.exercise, user_id)?;
    Ok(aggregate)
}

/// Create an exercise owned by `user_id`.
pub async fn create_exercise_as(
    pool: &PgPool,
    user_id: Uuid,
    spec: &ExerciseSpec,
) -> Result<ExerciseWithSets, ExerciseError> {
    service::create_exercise(pool, Some(user_id), spec).await
}

/// Update an exercise on behalf of `user_id`, who must own it.
pub async fn update_exercise_as(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    spec: &ExerciseSpec,
) -> Result<ExerciseWithSets, ExerciseError> {
    let existing = exercises::get_exercise(pool, id)
        .await?
        .ok_or(ExerciseError::NotFound(id))?;
    authorize_write(&existing, user_id)?;
    service::update_exercise(pool, id, spec).await
}

/// Delete an exercise on behalf of `user_id`, who must own it.
pub async fn delete_exercise_as(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<(), ExerciseError> {
    let existing = exercises::get_exercise(pool, id)
        .await?
        .ok_or(ExerciseError::NotFound(id))?;
    authorize_write(&existing, user_id)?;
    service::delete_exercise(pool, id).await
}

/// List the exercises `user_id` can see, narrowed by `public` and a name
/// substring.
pub async fn list_exercises_as(
    pool: &PgPool,
    user_id: Uuid,
    public: Option<bool>,
    name: Option<String>,
) -> Result<Vec<ExerciseWithSets>, ExerciseError> {
    let filter = ExerciseFilter {
        visibility: Visibility::User(user_id),
        public,
        name,
    };
    service::list_exercises(pool, &filter).await
}
