//! Request body accepted by create and update.
//!
//! Every field is optional at the decoding level so that missing or `null`
//! values reach validation and are reported as validation errors rather than
//! decoding failures. There is no `set_number` field: positions
//! are assigned by the server and any client-supplied value is ignored.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of an exercise create or update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseSpec {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Absent or `null` means private.
    pub public: Option<bool>,
    /// Absent or `null` means no sets.
    pub sets: Option<Vec<SetSpec>>,
}

/// One set inside an [`ExerciseSpec`]. Durations are nanoseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSpec {
    /// Existing set to keep when updating; ignored on create.
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub rest_time: Option<i64>,
    pub rep_count: Option<i64>,
    pub duration: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_typical_client_body() {
        let body = r#"{
            "name": "test",
            "description": "desc",
            "public": false,
            "sets": [
                {"name": "Set 1", "rest_time": 30000000000, "rep_count": 6},
                {"name": "Set 2", "rest_time": 40000000000, "duration": 3000000000}
            ]
        }"#;
        let spec: ExerciseSpec = serde_json::from_str(body).unwrap();
        assert_eq!(spec.name.as_deref(), Some("test"));
        let sets = spec.sets.unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].rep_count, Some(6));
        assert_eq!(sets[1].duration, Some(3_000_000_000));
    }

    #[test]
    fn nulls_and_missing_fields_decode() {
        let spec: ExerciseSpec =
            serde_json::from_str(r#"{"name": "Null Test", "description": null, "sets": null}"#)
                .unwrap();
        assert_eq!(spec.public, None);
        assert_eq!(spec.sets, None);

        let empty: ExerciseSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, ExerciseSpec::default());
    }

    #[test]
    fn client_set_number_is_ignored() {
        let spec: ExerciseSpec =
            serde_json::from_str(r#"{"name": "x", "sets": [{"set_number": 7, "rep_count": 1}]}"#)
                .unwrap();
        let sets = spec.sets.unwrap();
        assert_eq!(sets[0].rep_count, Some(1));
    }
}
