//! Field-level checks run before any database work.
//!
//! [`validate_exercise`] turns a decoded [`ExerciseSpec`] into a
//! [`ValidatedExercise`], whose sets carry a [`SetKind`] instead of two
//! independent optional measures.

use std::collections::HashSet;

use coachwise_db::models::SetKind;
use coachwise_db::queries::exercises::ExerciseFields;
use coachwise_db::queries::sets::NewSet;
use thiserror::Error;
use uuid::Uuid;

use super::request::{ExerciseSpec, SetSpec};

/// Longest accepted exercise or set name, in characters.
pub const MAX_NAME_LEN: usize = 255;

/// Most sets a single exercise may carry.
pub const MAX_SETS: usize = 500;

/// A rule violated by an exercise request. Sets are identified by their
/// 1-based position in the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name is required")]
    MissingName,

    #[error("name is {len} characters long (max {max})", max = MAX_NAME_LEN)]
    NameTooLong { len: usize },

    #[error("exercise has {count} sets (max {max})", max = MAX_SETS)]
    TooManySets { count: usize },

    #[error("set {set}: name is {len} characters long (max {max})", max = MAX_NAME_LEN)]
    SetNameTooLong { set: usize, len: usize },

    #[error("set {set}: rest_time must not be negative (got {value})")]
    NegativeRestTime { set: usize, value: i64 },

    #[error("set {set}: rep_count must not be negative (got {value})")]
    NegativeRepCount { set: usize, value: i64 },

    #[error("set {set}: rep_count {value} is too large")]
    RepCountTooLarge { set: usize, value: i64 },

    #[error("set {set}: duration must not be negative (got {value})")]
    NegativeDuration { set: usize, value: i64 },

    #[error("set {set}: rep_count and duration are mutually exclusive")]
    RepsAndDuration { set: usize },

    #[error("set {set}: id {id} appears more than once")]
    DuplicateSetId { set: usize, id: Uuid },
}

/// An exercise request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedExercise {
    pub name: String,
    pub description: Option<String>,
    pub public: bool,
    pub sets: Vec<NewSet>,
}

impl ValidatedExercise {
    /// Root-row fields for insert or update.
    pub fn fields(&self) -> ExerciseFields<'_> {
        ExerciseFields {
            name: &self.name,
            description: self.description.as_deref(),
            public: self.public,
        }
    }
}

/// Check an exercise request, reporting the first violation found.
pub fn validate_exercise(spec: &ExerciseSpec) -> Result<ValidatedExercise, ValidationError> {
    let name = match spec.name.as_deref() {
        Some(name) if !name.trim().is_empty() => name,
        _ => return Err(ValidationError::MissingName),
    };
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong { len });
    }

    let specs = spec.sets.as_deref().unwrap_or_default();
    if specs.len() > MAX_SETS {
        return Err(ValidationError::TooManySets { count: specs.len() });
    }

    let mut seen_ids = HashSet::new();
    let mut sets = Vec::with_capacity(specs.len());
    for (index, set_spec) in specs.iter().enumerate() {
        let position = index + 1;
        if let Some(id) = set_spec.id {
            if !seen_ids.insert(id) {
                return Err(ValidationError::DuplicateSetId { set: position, id });
            }
        }
        sets.push(validate_set(position, set_spec)?);
    }

    Ok(ValidatedExercise {
        name: name.to_owned(),
        description: spec.description.clone(),
        public: spec.public.unwrap_or(false),
        sets,
    })
}

fn validate_set(set: usize, spec: &SetSpec) -> Result<NewSet, ValidationError> {
    if let Some(name) = &spec.name {
        let len = name.chars().count();
        if len > MAX_NAME_LEN {
            return Err(ValidationError::SetNameTooLong { set, len });
        }
    }

    let rest_time = spec.rest_time.unwrap_or(0);
    if rest_time < 0 {
        return Err(ValidationError::NegativeRestTime {
            set,
            value: rest_time,
        });
    }

    let kind = match (spec.rep_count, spec.duration) {
        (Some(_), Some(_)) => return Err(ValidationError::RepsAndDuration { set }),
        (Some(value), None) if value < 0 => {
            return Err(ValidationError::NegativeRepCount { set, value });
        }
        (Some(value), None) => {
            let rep_count = i32::try_from(value)
                .map_err(|_| ValidationError::RepCountTooLarge { set, value })?;
            Some(SetKind::Reps { rep_count })
        }
        (None, Some(value)) if value < 0 => {
            return Err(ValidationError::NegativeDuration { set, value });
        }
        (None, Some(duration)) => Some(SetKind::Timed { duration }),
        (None, None) => None,
    };

    Ok(NewSet {
        id: spec.id,
        name: spec.name.clone(),
        rest_time,
        kind,
    })
}
