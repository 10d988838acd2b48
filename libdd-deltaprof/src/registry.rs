// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{
    AcquireError, ContentionRecord, ContentionSource, ReadOutcome, SamplingFraction, StackTrace,
    Totals, NANOS_PER_SECOND,
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// An in-process cumulative contention table for one profile class.
///
/// Instrumented code reports contention events with [`record`], and delta
/// profilers read the totals back through [`ContentionSource`]. The registry
/// does not decide which events get recorded; whoever calls [`record`] owns
/// that, and publishes the fraction of events they keep with
/// [`set_sampling_fraction`].
///
/// Records are reported in the order their stacks were first seen.
///
/// [`record`]: ContentionRegistry::record
/// [`set_sampling_fraction`]: ContentionRegistry::set_sampling_fraction
#[derive(Debug)]
pub struct ContentionRegistry {
    table: Mutex<FxIndexMap<StackTrace, Totals>>,
    fraction_bits: AtomicU64,
    ticks_per_second: u64,
    enabled: AtomicBool,
}

impl Default for ContentionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentionRegistry {
    /// Creates a registry whose delays are measured in nanoseconds and which
    /// records every event.
    pub fn new() -> Self {
        Self::with_tick_rate(NANOS_PER_SECOND)
    }

    /// Creates a registry whose delays are measured in ticks of the given
    /// rate, e.g. a CPU cycle counter. A rate of zero is treated as one.
    pub fn with_tick_rate(ticks_per_second: u64) -> Self {
        Self {
            table: Mutex::new(FxIndexMap::default()),
            fraction_bits: AtomicU64::new(1.0f64.to_bits()),
            ticks_per_second: ticks_per_second.max(1),
            enabled: AtomicBool::new(true),
        }
    }

    /// Adds `count` events totalling `cycles` ticks of delay to `stack`.
    /// Totals saturate instead of wrapping.
    pub fn record(&self, stack: impl Into<StackTrace>, count: i64, cycles: i64) {
        let mut table = self.table.lock();
        let totals = table.entry(stack.into()).or_default();
        totals.count = totals.count.saturating_add(count);
        totals.cycles = totals.cycles.saturating_add(cycles);
    }

    /// Sets the fraction of events the instrumentation records. This is the
    /// only way to change it; profilers only read it.
    pub fn set_sampling_fraction(&self, fraction: f64) {
        self.fraction_bits.store(fraction.to_bits(), Ordering::Relaxed);
    }

    /// Makes reads fail with [`AcquireError::Unavailable`] until re-enabled.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Forgets every total, as if the process had restarted its counters.
    pub fn reset(&self) {
        self.table.lock().clear();
    }

    /// Number of distinct stacks currently held.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContentionSource for ContentionRegistry {
    fn read(&self, buf: &mut [ContentionRecord]) -> Result<ReadOutcome, AcquireError> {
        if !self.enabled.load(Ordering::Relaxed) {
            return Err(AcquireError::unavailable("contention registry is disabled"));
        }
        let table = self.table.lock();
        let available = table.len();
        if buf.len() < available {
            return Ok(ReadOutcome {
                available,
                complete: false,
            });
        }
        for (slot, (stack, totals)) in buf.iter_mut().zip(table.iter()) {
            slot.stack.clone_from(stack);
            slot.count = totals.count;
            slot.cycles = totals.cycles;
        }
        Ok(ReadOutcome {
            available,
            complete: true,
        })
    }

    fn ticks_per_second(&self) -> u64 {
        self.ticks_per_second
    }
}

impl SamplingFraction for ContentionRegistry {
    fn sampling_fraction(&self) -> f64 {
        f64::from_bits(self.fraction_bits.load(Ordering::Relaxed))
    }
}
