//! Class ranking with ties.
//!
//! Standard competition ranking: equal averages (at the stored precision)
//! share a rank and the next distinct average gets
//! `previous_rank + size_of_tie_group`, so 18, 15, 15, 12 ranks as
//! 1, 2, 2, 4.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::Rounding;

/// One ranked student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub student_id: String,
    pub average: f64,
    /// 1-based.
    pub rank: u32,
}

/// Rank students by average, highest first.
///
/// Students without an average (or with a non-finite one) are excluded
/// entirely. Equal averages are listed by student id so the output order
/// is deterministic. An empty input yields an empty ranking.
pub fn assign_ranks<'a, I>(entries: I, rounding: &Rounding) -> Vec<RankedEntry>
where
    I: IntoIterator<Item = (&'a str, Option<f64>)>,
{
    let mut keyed: Vec<(i64, &str, f64)> = entries
        .into_iter()
        .filter_map(|(id, average)| {
            let average = average.filter(|a| a.is_finite())?;
            Some((rounding.key(average), id, average))
        })
        .collect();

    keyed.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

    let mut ranked = Vec::with_capacity(keyed.len());
    let mut previous: Option<(i64, u32)> = None;
    for (position, (key, id, average)) in keyed.into_iter().enumerate() {
        let rank = match previous {
            Some((prev_key, prev_rank)) if prev_key == key => prev_rank,
            _ => position as u32 + 1,
        };
        previous = Some((key, rank));
        ranked.push(RankedEntry {
            student_id: id.to_string(),
            average,
            rank,
        });
    }

    tracing::debug!(ranked = ranked.len(), "ranks assigned");
    ranked
}

/// Student id to rank lookup.
pub fn rank_map(ranked: &[RankedEntry]) -> HashMap<&str, u32> {
    ranked
        .iter()
        .map(|entry| (entry.student_id.as_str(), entry.rank))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranks(input: &[(&str, Option<f64>)]) -> Vec<(String, u32)> {
        assign_ranks(input.iter().copied(), &Rounding::default())
            .into_iter()
            .map(|e| (e.student_id, e.rank))
            .collect()
    }

    #[test]
    fn competition_ranking_with_two_way_tie() {
        let result = ranks(&[
            ("a", Some(18.0)),
            ("b", Some(15.0)),
            ("c", Some(15.0)),
            ("d", Some(12.0)),
        ]);
        assert_eq!(
            result,
            vec![
                ("a".into(), 1),
                ("b".into(), 2),
                ("c".into(), 2),
                ("d".into(), 4),
            ]
        );
    }

    #[test]
    fn tie_at_the_top() {
        let result = ranks(&[("x", Some(14.0)), ("y", Some(14.0)), ("z", Some(9.5))]);
        assert_eq!(result[0].1, 1);
        assert_eq!(result[1].1, 1);
        assert_eq!(result[2].1, 3);
    }

    #[test]
    fn ties_measured_at_stored_precision() {
        // Both round to 13.5.
        let result = ranks(&[("a", Some(13.46)), ("b", Some(13.5))]);
        assert_eq!(result[0].1, 1);
        assert_eq!(result[1].1, 1);
        assert_eq!(result[0].0, "a");
    }

    #[test]
    fn unevaluated_students_excluded() {
        let result = ranks(&[("a", Some(10.0)), ("ghost", None), ("nan", Some(f64::NAN))]);
        assert_eq!(result, vec![("a".into(), 1)]);
    }

    #[test]
    fn empty_class_is_a_no_op() {
        assert!(ranks(&[]).is_empty());
    }

    #[test]
    fn input_order_does_not_matter() {
        let forward = ranks(&[("a", Some(11.0)), ("b", Some(16.0)), ("c", Some(11.0))]);
        let backward = ranks(&[("c", Some(11.0)), ("b", Some(16.0)), ("a", Some(11.0))]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn rank_map_lookup() {
        let ranked = assign_ranks(
            [("a", Some(12.0)), ("b", Some(17.0))],
            &Rounding::default(),
        );
        let map = rank_map(&ranked);
        assert_eq!(map["b"], 1);
        assert_eq!(map["a"], 2);
    }
}
