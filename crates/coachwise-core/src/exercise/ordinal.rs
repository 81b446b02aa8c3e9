//! Set numbering.

use coachwise_db::queries::sets::{NewSet, OrderedSet};

/// Number `sets` by position: the first set is 1, the next 2, and so on.
///
/// The request order is the only ordering signal; callers run this right
/// before every write so stored numbers are always contiguous.
pub fn assign_set_numbers(sets: &[NewSet]) -> Vec<OrderedSet<'_>> {
    sets.iter()
        .zip(1..)
        .map(|(set, set_number)| OrderedSet { set_number, set })
        .collect()
}

#[cfg(test)]
mod tests {
    use coachwise_db::models::SetKind;

    use super::*;

    fn set(rep_count: i32) -> NewSet {
        NewSet {
            id: None,
            name: None,
            rest_time: 0,
            kind: Some(SetKind::Reps { rep_count }),
        }
    }

    #[test]
    fn numbers_follow_input_order() {
        let sets = vec![set(10), set(8), set(6)];
        let ordered = assign_set_numbers(&sets);

        let numbers: Vec<i32> = ordered.iter().map(|o| o.set_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        for (ordered, original) in ordered.iter().zip(&sets) {
            assert_eq!(ordered.set, original);
        }
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(assign_set_numbers(&[]).is_empty());
    }

    #[test]
    fn single_set_is_number_one() {
        let sets = vec![set(1)];
        assert_eq!(assign_set_numbers(&sets)[0].set_number, 1);
    }
}
