//! The exercise aggregate: request shape, validation, set numbering, and the
//! transactional create/update/read/delete service.

pub mod ordinal;
pub mod request;
pub mod service;
pub mod validate;

pub use ordinal::assign_set_numbers;
pub use request::{ExerciseSpec, SetSpec};
pub use service::{
    ExerciseError, create_exercise, create_validated_exercise, delete_exercise, get_exercise,
    list_exercises, update_exercise,
};
pub use validate::{
    MAX_NAME_LEN, MAX_SETS, ValidatedExercise, ValidationError, validate_exercise,
};
