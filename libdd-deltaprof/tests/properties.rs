// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod common;

use common::*;
use libdd_deltaprof::{ContentionRegistry, DeltaProfiler, StackTrace};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// One round of contention: `(site, count, delay)` events followed by a
/// profile.
type Round = Vec<(u8, i64, i64)>;

fn rounds() -> impl Strategy<Value = Vec<Round>> {
    let event = (0u8..6, 0i64..10, 0i64..10_000);
    prop::collection::vec(prop::collection::vec(event, 0..12), 1..8)
}

/// Sites share a root frame and differ in the leaf, plus a reversed variant,
/// so that stacks overlap without being equal.
fn stack(site: u8) -> StackTrace {
    let leaf = u64::from(site / 2) + 0x100;
    if site % 2 == 0 {
        StackTrace::from([leaf, 0x1])
    } else {
        StackTrace::from([0x1, leaf])
    }
}

proptest! {
    #[test]
    fn each_profile_reports_exactly_its_round(rounds in rounds()) {
        let registry = Arc::new(ContentionRegistry::new());
        let renderer = Arc::new(RecordingRenderer::default());
        let profiler = DeltaProfiler::block(registry.clone()).with_renderer(renderer.clone());

        for round in &rounds {
            let mut expected: HashMap<StackTrace, (i64, i64)> = HashMap::new();
            for &(site, count, delay) in round {
                registry.record(stack(site), count, delay);
                let e = expected.entry(stack(site)).or_default();
                e.0 += count;
                e.1 += delay;
            }
            expected.retain(|_, v| *v != (0, 0));

            profiler.profile(&mut Vec::new()).unwrap();
            let samples = renderer.last();

            for pair in samples.windows(2) {
                prop_assert!(pair[0].nanos >= pair[1].nanos);
            }
            prop_assert_eq!(by_stack(&samples), expected);
            prop_assert!(samples.iter().all(|s| s.count >= 0 && s.nanos >= 0));
        }
    }

    #[test]
    fn profiles_sum_to_the_cumulative_totals(rounds in rounds(), fraction_pow in 0u32..4) {
        // Powers of two keep the scaling exact.
        let fraction = 1.0 / f64::from(1u32 << fraction_pow);
        let registry = Arc::new(ContentionRegistry::new());
        registry.set_sampling_fraction(fraction);
        let renderer = Arc::new(RecordingRenderer::default());
        let profiler = DeltaProfiler::mutex(registry.clone()).with_renderer(renderer.clone());

        let (mut count, mut delay) = (0i64, 0i64);
        for round in &rounds {
            for &(site, c, d) in round {
                registry.record(stack(site), c, d);
                count += c;
                delay += d;
            }
            profiler.profile(&mut Vec::new()).unwrap();
        }

        let scale = 1i64 << fraction_pow;
        let profiles = renderer.profiles();
        let total_count: i64 = profiles.iter().flatten().map(|s| s.count).sum();
        let total_delay: i64 = profiles.iter().flatten().map(|s| s.nanos).sum();
        prop_assert_eq!(total_count, count * scale);
        prop_assert_eq!(total_delay, delay * scale);
    }
}
