// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Common test utilities for the delta profiler tests

#![allow(dead_code)]

use libdd_deltaprof::{
    DeltaProfileError, DeltaSample, ProfileWindow, Renderer, SampleLabels, StackTrace,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;

/// Keeps every rendered profile instead of encoding it.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    profiles: Mutex<Vec<Vec<DeltaSample>>>,
}

impl RecordingRenderer {
    pub fn profiles(&self) -> Vec<Vec<DeltaSample>> {
        self.profiles.lock().clone()
    }

    pub fn last(&self) -> Vec<DeltaSample> {
        self.profiles.lock().last().cloned().unwrap_or_default()
    }
}

impl Renderer for RecordingRenderer {
    fn render<W: Write>(
        &self,
        sink: &mut W,
        samples: &[DeltaSample],
        labels: SampleLabels<'_>,
        _window: ProfileWindow,
    ) -> Result<(), DeltaProfileError> {
        writeln!(sink, "{} {}", labels.count, labels.value)?;
        self.profiles.lock().push(samples.to_vec());
        Ok(())
    }
}

/// Shorthand for a sample with a single-frame stack.
pub fn sample(address: u64, count: i64, nanos: i64) -> DeltaSample {
    DeltaSample {
        stack: StackTrace::from([address]),
        count,
        nanos,
    }
}

/// Per-stack `(count, nanos)` of a profile.
pub fn by_stack(samples: &[DeltaSample]) -> HashMap<StackTrace, (i64, i64)> {
    samples
        .iter()
        .map(|s| (s.stack.clone(), (s.count, s.nanos)))
        .collect()
}

pub fn assert_heaviest_first(samples: &[DeltaSample]) {
    for pair in samples.windows(2) {
        assert!(
            pair[0].nanos >= pair[1].nanos,
            "samples out of order: {pair:?}"
        );
    }
}
