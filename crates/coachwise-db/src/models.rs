use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use thiserror::Error;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Set measure
// ---------------------------------------------------------------------------

/// How a set is measured: by repetitions or by time under effort.
///
/// Stored as two nullable columns (`rep_count`, `duration`) of which at most
/// one is set. Serializes flattened into the owning set, so a rep-based set
/// carries a `rep_count` key and a timed set carries a `duration` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SetKind {
    Reps { rep_count: i32 },
    /// Duration in nanoseconds.
    Timed { duration: i64 },
}

/// Both measure columns were populated on a stored set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("set has both rep_count ({rep_count}) and duration ({duration})")]
pub struct SetKindConflict {
    pub rep_count: i32,
    pub duration: i64,
}

impl SetKind {
    /// Rebuild the measure from its column pair.
    pub fn from_columns(
        rep_count: Option<i32>,
        duration: Option<i64>,
    ) -> Result<Option<Self>, SetKindConflict> {
        match (rep_count, duration) {
            (Some(rep_count), Some(duration)) => Err(SetKindConflict {
                rep_count,
                duration,
            }),
            (Some(rep_count), None) => Ok(Some(Self::Reps { rep_count })),
            (None, Some(duration)) => Ok(Some(Self::Timed { duration })),
            (None, None) => Ok(None),
        }
    }

    /// Split an optional measure into its `(rep_count, duration)` columns.
    pub fn columns(kind: Option<Self>) -> (Option<i32>, Option<i64>) {
        match kind {
            Some(Self::Reps { rep_count }) => (Some(rep_count), None),
            Some(Self::Timed { duration }) => (None, Some(duration)),
            None => (None, None),
        }
    }
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// An exercise -- the root of the exercise/set aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exercise {
    pub id: Uuid,
    /// `None` for shared exercises that belong to no user.
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One set of an exercise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseSet {
    pub id: Uuid,
    pub exercise_id: Uuid,
    pub name: Option<String>,
    /// 1-based position within the exercise; always assigned by the server.
    pub set_number: i32,
    /// Rest after the set, in nanoseconds.
    pub rest_time: i64,
    #[serde(flatten)]
    pub kind: Option<SetKind>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ExerciseSet {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let rep_count: Option<i32> = row.try_get("rep_count")?;
        let duration: Option<i64> = row.try_get("duration")?;
        let kind =
            SetKind::from_columns(rep_count, duration).map_err(|e| sqlx::Error::ColumnDecode {
                index: "duration".to_owned(),
                source: Box::new(e),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            exercise_id: row.try_get("exercise_id")?,
            name: row.try_get("name")?,
            set_number: row.try_get("set_number")?,
            rest_time: row.try_get("rest_time")?,
            kind,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// An exercise together with its sets, ordered by `set_number`.
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseWithSets {
    #[serde(flatten)]
    pub exercise: Exercise,
    pub sets: Vec<ExerciseSet>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
