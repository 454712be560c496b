//! Group availability reconciliation: merges attendees' proposed instants
//! into ranked common slots that meet a responder quorum.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Two proposals are the same slot when strictly closer than this.
    pub tolerance: Duration,
    /// Minimum share of responders, in percent, rounded up to whole attendees.
    pub quorum_percent: u32,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            tolerance: Duration::minutes(60),
            quorum_percent: 60,
        }
    }
}

impl ReconcilePolicy {
    pub fn validate(&self) -> AppResult<()> {
        if self.tolerance <= Duration::zero() {
            return Err(AppError::InvalidInput(
                "tolerance window must be positive".to_string(),
            ));
        }
        if self.quorum_percent == 0 || self.quorum_percent > 100 {
            return Err(AppError::InvalidInput(format!(
                "quorum must be within 1..=100 percent, got {}",
                self.quorum_percent
            )));
        }
        Ok(())
    }

    /// `ceil(quorum_percent * responders / 100)` in integer arithmetic.
    pub fn threshold(&self, responders: usize) -> usize {
        let percent = self.quorum_percent as usize;
        (responders * percent).div_ceil(100)
    }

    fn matches(&self, a: &NaiveDateTime, b: &NaiveDateTime) -> bool {
        (*a - *b).abs() < self.tolerance
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommonSlot {
    pub time: NaiveDateTime,
    pub supporting_count: usize,
    pub supporting_fraction: f64,
}

/// Ranks common slots across attendees. Attendees with no proposals are not
/// responders and count toward neither side of the fraction. Result is
/// ordered by support descending, then earliest instant; the first entry is
/// the suggested default. Empty when nobody responded or nothing reaches
/// quorum.
pub fn reconcile(
    availabilities: &[(String, Vec<NaiveDateTime>)],
    policy: &ReconcilePolicy,
) -> Vec<CommonSlot> {
    // An attendee listed twice is still one responder.
    let mut responders: Vec<(&str, BTreeSet<NaiveDateTime>)> = Vec::new();
    for (attendee, times) in availabilities {
        if times.is_empty() {
            continue;
        }
        match responders.iter_mut().find(|(id, _)| *id == attendee.as_str()) {
            Some((_, existing)) => existing.extend(times.iter().copied()),
            None => responders.push((attendee.as_str(), times.iter().copied().collect())),
        }
    }

    if responders.is_empty() {
        return Vec::new();
    }

    let total = responders.len();
    let threshold = policy.threshold(total);

    let candidates: BTreeSet<NaiveDateTime> = responders
        .iter()
        .flat_map(|(_, times)| times.iter().copied())
        .collect();

    let mut eligible: Vec<CommonSlot> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let supporting_count = responders
                .iter()
                .filter(|(_, times)| times.iter().any(|t| policy.matches(t, &candidate)))
                .count();
            (supporting_count >= threshold).then(|| CommonSlot {
                time: candidate,
                supporting_count,
                supporting_fraction: supporting_count as f64 / total as f64,
            })
        })
        .collect();

    eligible.sort_by(|a, b| {
        b.supporting_count
            .cmp(&a.supporting_count)
            .then(a.time.cmp(&b.time))
    });

    // Candidates within tolerance of a better-ranked one are the same slot.
    let mut ranked: Vec<CommonSlot> = Vec::with_capacity(eligible.len());
    for slot in eligible {
        if ranked.iter().all(|kept| !policy.matches(&kept.time, &slot.time)) {
            ranked.push(slot);
        }
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn avail(attendee: &str, times: &[&str]) -> (String, Vec<NaiveDateTime>) {
        (attendee.to_string(), times.iter().map(|t| dt(t)).collect())
    }

    #[test]
    fn test_threshold_rounds_up() {
        let policy = ReconcilePolicy::default();
        assert_eq!(policy.threshold(1), 1);
        assert_eq!(policy.threshold(3), 2);
        assert_eq!(policy.threshold(5), 3);
        assert_eq!(policy.threshold(10), 6);
    }

    #[test]
    fn test_cluster_near_fourteen_with_non_responders() {
        let input = vec![
            avail("a", &["2025-06-20 14:00"]),
            avail("b", &["2025-06-20 14:10"]),
            avail("c", &["2025-06-20 14:25"]),
            avail("d", &[]),
            avail("e", &[]),
        ];

        let result = reconcile(&input, &ReconcilePolicy::default());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].time, dt("2025-06-20 14:00"));
        assert_eq!(result[0].supporting_count, 3);
        assert_eq!(result[0].supporting_fraction, 1.0);
    }

    #[test]
    fn test_zero_responders_is_empty() {
        let input = vec![avail("a", &[]), avail("b", &[])];
        assert!(reconcile(&input, &ReconcilePolicy::default()).is_empty());
        assert!(reconcile(&[], &ReconcilePolicy::default()).is_empty());
    }

    #[test]
    fn test_below_quorum_is_excluded() {
        // 5 responders, threshold 3; 10:00 has only 2 supporters.
        let input = vec![
            avail("a", &["2025-06-20 10:00", "2025-06-20 15:00"]),
            avail("b", &["2025-06-20 10:00", "2025-06-20 15:00"]),
            avail("c", &["2025-06-20 15:00"]),
            avail("d", &["2025-06-21 09:00"]),
            avail("e", &["2025-06-22 09:00"]),
        ];

        let result = reconcile(&input, &ReconcilePolicy::default());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].time, dt("2025-06-20 15:00"));
        assert_eq!(result[0].supporting_count, 3);
        assert!(result.iter().all(|s| s.supporting_fraction >= 0.6));
    }

    #[test]
    fn test_tolerance_is_strict() {
        // Exactly 60 minutes apart: not the same slot.
        let input = vec![
            avail("a", &["2025-06-20 10:00"]),
            avail("b", &["2025-06-20 11:00"]),
        ];
        let result = reconcile(&input, &ReconcilePolicy::default());
        assert!(result.is_empty());
    }

    #[test]
    fn test_one_attendee_counts_once_per_slot() {
        let input = vec![
            avail("a", &["2025-06-20 10:00", "2025-06-20 10:15", "2025-06-20 10:30"]),
            avail("b", &["2025-06-21 10:00"]),
            avail("c", &["2025-06-22 10:00"]),
        ];
        let result = reconcile(&input, &ReconcilePolicy::default());
        // Threshold 2, nobody overlaps with "a".
        assert!(result.is_empty());
    }

    #[test]
    fn test_ranking_by_count_then_earliest() {
        let input = vec![
            avail("a", &["2025-06-20 09:00", "2025-06-20 13:00", "2025-06-20 17:00"]),
            avail("b", &["2025-06-20 09:00", "2025-06-20 13:00", "2025-06-20 17:00"]),
            avail("c", &["2025-06-20 13:00", "2025-06-20 17:00"]),
            avail("d", &["2025-06-20 13:00"]),
        ];
        let result = reconcile(&input, &ReconcilePolicy::default());
        let times: Vec<NaiveDateTime> = result.iter().map(|s| s.time).collect();
        // 09:00 has 2 of 4 supporters, below the threshold of 3.
        assert_eq!(times, vec![dt("2025-06-20 13:00"), dt("2025-06-20 17:00")]);
        assert_eq!(result[0].supporting_count, 4);
        assert_eq!(result[0].supporting_fraction, 1.0);
        assert_eq!(result[1].supporting_count, 3);
        assert_eq!(result[1].supporting_fraction, 0.75);
    }

    #[test]
    fn test_ties_break_on_earliest_instant() {
        let input = vec![
            avail("a", &["2025-06-20 16:00", "2025-06-20 09:00"]),
            avail("b", &["2025-06-20 09:00", "2025-06-20 16:00"]),
        ];
        let result = reconcile(&input, &ReconcilePolicy::default());
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].time, dt("2025-06-20 09:00"));
        assert_eq!(result[1].time, dt("2025-06-20 16:00"));
    }

    #[test]
    fn test_deterministic_regardless_of_input_order() {
        let forward = vec![
            avail("a", &["2025-06-20 09:00", "2025-06-20 12:00"]),
            avail("b", &["2025-06-20 12:20", "2025-06-20 09:10"]),
            avail("c", &["2025-06-20 12:00"]),
        ];
        let mut backward = forward.clone();
        backward.reverse();

        let policy = ReconcilePolicy::default();
        assert_eq!(reconcile(&forward, &policy), reconcile(&forward, &policy));
        assert_eq!(reconcile(&forward, &policy), reconcile(&backward, &policy));
    }

    #[test]
    fn test_duplicate_attendee_rows_merge() {
        let input = vec![
            avail("a", &["2025-06-20 09:00"]),
            avail("a", &["2025-06-20 15:00"]),
            avail("b", &["2025-06-20 15:00"]),
        ];
        let result = reconcile(&input, &ReconcilePolicy::default());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].supporting_count, 2);
        assert_eq!(result[0].supporting_fraction, 1.0);
    }

    #[test]
    fn test_custom_policy() {
        let policy = ReconcilePolicy {
            tolerance: Duration::minutes(15),
            quorum_percent: 100,
        };
        let input = vec![
            avail("a", &["2025-06-20 10:00"]),
            avail("b", &["2025-06-20 10:20"]),
        ];
        assert!(reconcile(&input, &policy).is_empty());

        let input = vec![
            avail("a", &["2025-06-20 10:00"]),
            avail("b", &["2025-06-20 10:10"]),
        ];
        let result = reconcile(&input, &policy);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].supporting_count, 2);
    }

    #[test]
    fn test_policy_validation() {
        assert!(ReconcilePolicy::default().validate().is_ok());
        let zero_tolerance = ReconcilePolicy {
            tolerance: Duration::zero(),
            quorum_percent: 60,
        };
        assert!(zero_tolerance.validate().is_err());
        let bad_quorum = ReconcilePolicy {
            tolerance: Duration::minutes(60),
            quorum_percent: 150,
        };
        assert!(bad_quorum.validate().is_err());
    }
}
