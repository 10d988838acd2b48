// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{Snapshot, StackTrace};
use serde::Deserialize;

/// What to do with a stack whose cumulative totals went down between two
/// snapshots, which happens when the runtime's counters get reset.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum NegativeDeltaPolicy {
    /// Replace each negative component with zero and keep the rest.
    #[default]
    Clamp,
    /// Skip the stack for this profile.
    Drop,
    /// Emit the negative values as they are.
    PassThrough,
}

/// The change of one stack between two snapshots, still in runtime ticks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawDelta {
    pub stack: StackTrace,
    pub count: i64,
    pub cycles: i64,
}

#[derive(Debug, Default)]
pub struct Deltas {
    /// In the current snapshot's order.
    pub deltas: Vec<RawDelta>,
    /// Stacks with at least one component that went down.
    pub regressed: usize,
}

/// Diffs `current` against `previous`.
///
/// Stacks missing from `previous` are reported with their full totals.
/// Stacks missing from `current` are ignored. Stacks that didn't change at
/// all are left out.
pub fn compute_deltas(
    previous: &Snapshot,
    current: &Snapshot,
    policy: NegativeDeltaPolicy,
) -> Deltas {
    let mut deltas = Vec::with_capacity(current.len());
    let mut regressed = 0;
    for (stack, totals) in current.iter() {
        let (mut count, mut cycles) = match previous.get(stack) {
            None => (totals.count, totals.cycles),
            Some(prev) => (
                totals.count.saturating_sub(prev.count),
                totals.cycles.saturating_sub(prev.cycles),
            ),
        };

        if count < 0 || cycles < 0 {
            regressed += 1;
            match policy {
                NegativeDeltaPolicy::Clamp => {
                    count = count.max(0);
                    cycles = cycles.max(0);
                }
                NegativeDeltaPolicy::Drop => continue,
                NegativeDeltaPolicy::PassThrough => {}
            }
        }

        if count == 0 && cycles == 0 {
            continue;
        }

        deltas.push(RawDelta {
            stack: stack.clone(),
            count,
            cycles,
        });
    }
    Deltas { deltas, regressed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContentionRecord;

    fn snapshot(records: &[(&[u64], i64, i64)]) -> Snapshot {
        records
            .iter()
            .map(|(stack, count, cycles)| ContentionRecord::new(*stack, *count, *cycles))
            .collect()
    }

    fn delta(stack: &[u64], count: i64, cycles: i64) -> RawDelta {
        RawDelta {
            stack: StackTrace::from(stack),
            count,
            cycles,
        }
    }

    #[test]
    fn empty_previous_reports_everything() {
        let current = snapshot(&[(&[1], 10, 100), (&[2, 1], 3, 7)]);
        let out = compute_deltas(&Snapshot::default(), &current, Default::default());
        assert_eq!(out.deltas, vec![delta(&[1], 10, 100), delta(&[2, 1], 3, 7)]);
        assert_eq!(out.regressed, 0);
    }

    #[test]
    fn shared_new_and_vanished_stacks() {
        let previous = snapshot(&[(&[1], 10, 100), (&[9], 4, 4)]);
        let current = snapshot(&[(&[1], 15, 140), (&[2], 2, 20)]);
        let out = compute_deltas(&previous, &current, Default::default());
        assert_eq!(out.deltas, vec![delta(&[1], 5, 40), delta(&[2], 2, 20)]);
    }

    #[test]
    fn unchanged_stacks_are_skipped() {
        let previous = snapshot(&[(&[1], 10, 100)]);
        let current = snapshot(&[(&[1], 10, 100)]);
        let out = compute_deltas(&previous, &current, Default::default());
        assert!(out.deltas.is_empty());
    }

    #[test]
    fn negative_delta_policies() {
        let previous = snapshot(&[(&[1], 10, 100), (&[2], 5, 50)]);
        let current = snapshot(&[(&[1], 12, 40), (&[2], 1, 10)]);

        let clamp = compute_deltas(&previous, &current, NegativeDeltaPolicy::Clamp);
        assert_eq!(clamp.deltas, vec![delta(&[1], 2, 0)]);
        assert_eq!(clamp.regressed, 2);

        let drop = compute_deltas(&previous, &current, NegativeDeltaPolicy::Drop);
        assert!(drop.deltas.is_empty());
        assert_eq!(drop.regressed, 2);

        let pass = compute_deltas(&previous, &current, NegativeDeltaPolicy::PassThrough);
        assert_eq!(pass.deltas, vec![delta(&[1], 2, -60), delta(&[2], -4, -40)]);
    }

    #[test]
    fn policy_names() {
        let policy: NegativeDeltaPolicy = serde_json::from_str(r#""pass_through""#).unwrap();
        assert_eq!(policy, NegativeDeltaPolicy::PassThrough);
    }
}
