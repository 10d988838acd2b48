// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{
    acquire_snapshot, compute_deltas, AcquireStrategy, Compression, ContentionScaler,
    ContentionSource, DeltaProfileError, DeltaSample, Deltas, FractionScaler,
    NegativeDeltaPolicy, PprofRenderer, ProfileWindow, Renderer, SampleLabels, SamplingFraction,
    Snapshot, Unsampled, NANOS_PER_SECOND,
};
use parking_lot::Mutex;
use serde::Deserialize;
use std::io::Write;
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{debug, warn};

/// Knobs shared by both profile classes.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct ProfilerOptions {
    pub acquire: AcquireStrategy,
    pub negative_deltas: NegativeDeltaPolicy,
    /// Only used by the default pprof renderer.
    pub compression: Compression,
}

#[derive(Debug, Default)]
struct DeltaState {
    previous: Snapshot,
    taken_at: Option<Instant>,
}

/// A stateful profiler that turns a runtime's cumulative contention table
/// into profiles of only what happened since the previous call.
///
/// Each call to [`profile`](DeltaProfiler::profile) reads the table, diffs it
/// against the table read by the previous call, remembers the new table, and
/// renders the difference with the heaviest stacks first. The first call
/// diffs against nothing, so it renders the cumulative totals.
///
/// Calls on one profiler are serialized by an internal lock, so it can be
/// shared between threads. Separate profilers don't share any state.
///
/// ```
/// use libdd_deltaprof::{ContentionRegistry, DeltaProfiler};
/// use std::sync::Arc;
///
/// let registry = Arc::new(ContentionRegistry::new());
/// let profiler = DeltaProfiler::mutex(registry.clone());
///
/// registry.record([0x1000, 0x2000], 1, 1_500);
/// let mut pprof = Vec::new();
/// profiler.profile(&mut pprof).unwrap();
/// ```
pub struct DeltaProfiler<S, C, R = PprofRenderer> {
    source: S,
    scaler: C,
    renderer: R,
    acquire: AcquireStrategy,
    negative_deltas: NegativeDeltaPolicy,
    state: Mutex<DeltaState>,
}

/// Mutex contention, corrected by the runtime's sampling fraction.
pub type MutexProfiler<RT> = DeltaProfiler<Arc<RT>, FractionScaler<Arc<RT>>>;

/// Blocking events, reported as recorded.
pub type BlockProfiler<S> = DeltaProfiler<S, Unsampled>;

impl<RT> DeltaProfiler<Arc<RT>, FractionScaler<Arc<RT>>>
where
    RT: ContentionSource + SamplingFraction + ?Sized,
{
    /// Creates a profiler for mutex contention. Deltas are divided by the
    /// runtime's sampling fraction, read at every profile.
    pub fn mutex(runtime: Arc<RT>) -> Self {
        Self::mutex_with_options(runtime, ProfilerOptions::default())
    }

    pub fn mutex_with_options(runtime: Arc<RT>, options: ProfilerOptions) -> Self {
        let scaler = FractionScaler::new(runtime.clone());
        Self::new(
            runtime,
            scaler,
            PprofRenderer::new(options.compression),
            options,
        )
    }
}

impl<S: ContentionSource> DeltaProfiler<S, Unsampled> {
    /// Creates a profiler for blocking events. The blocking profile's
    /// sampling can't be undone reliably, so deltas are not scaled.
    pub fn block(source: S) -> Self {
        Self::block_with_options(source, ProfilerOptions::default())
    }

    pub fn block_with_options(source: S, options: ProfilerOptions) -> Self {
        Self::new(
            source,
            Unsampled,
            PprofRenderer::new(options.compression),
            options,
        )
    }
}

impl<S, C, R> DeltaProfiler<S, C, R> {
    pub fn new(source: S, scaler: C, renderer: R, options: ProfilerOptions) -> Self {
        Self {
            source,
            scaler,
            renderer,
            acquire: options.acquire,
            negative_deltas: options.negative_deltas,
            state: Mutex::new(DeltaState::default()),
        }
    }

    /// Replaces the renderer, keeping everything else including the state
    /// of previous profiles.
    pub fn with_renderer<R2>(self, renderer: R2) -> DeltaProfiler<S, C, R2> {
        DeltaProfiler {
            source: self.source,
            scaler: self.scaler,
            renderer,
            acquire: self.acquire,
            negative_deltas: self.negative_deltas,
            state: self.state,
        }
    }
}

impl<S, C, R> DeltaProfiler<S, C, R>
where
    S: ContentionSource,
    C: ContentionScaler,
    R: Renderer,
{
    /// Writes the activity since the previous call to `sink`.
    ///
    /// The remembered table is replaced before rendering, so if rendering
    /// fails, the activity it would have reported is lost rather than
    /// reported again by the next call. On error, discard whatever was
    /// written to `sink`.
    pub fn profile<W: Write>(&self, sink: &mut W) -> Result<(), DeltaProfileError> {
        let mut state = self.state.lock();

        let current = acquire_snapshot(&self.source, &self.acquire)?;
        let taken_at = Instant::now();
        let end = SystemTime::now();

        let Deltas { deltas, regressed } =
            compute_deltas(&state.previous, &current, self.negative_deltas);
        if regressed > 0 {
            warn!(
                regressed,
                policy = ?self.negative_deltas,
                "Contention totals decreased since the previous profile, were the counters reset?"
            );
        }

        let stacks = current.len();
        let duration = state.taken_at.map(|prev| taken_at.duration_since(prev));
        state.previous = current;
        state.taken_at = Some(taken_at);

        let scale = self.scaler.scale();
        let ticks_per_second = self.source.ticks_per_second();
        let mut samples: Vec<DeltaSample> = deltas
            .into_iter()
            .map(|delta| {
                let nanos = ticks_to_nanos(delta.cycles, ticks_per_second);
                let (count, nanos) = scale.apply(delta.count, nanos);
                DeltaSample {
                    stack: delta.stack,
                    count,
                    nanos,
                }
            })
            .collect();
        // Stable, so equal delays keep the runtime's order.
        samples.sort_by(|a, b| b.nanos.cmp(&a.nanos));

        debug!(
            stacks,
            samples = samples.len(),
            scale = scale.factor(),
            "Computed contention delta profile"
        );

        let window = ProfileWindow { end, duration };
        self.renderer
            .render(sink, &samples, SampleLabels::CONTENTION, window)
    }
}

/// Converts a delay in runtime ticks to nanoseconds, saturating at the
/// bounds of `i64`.
fn ticks_to_nanos(cycles: i64, ticks_per_second: u64) -> i64 {
    if ticks_per_second == NANOS_PER_SECOND {
        return cycles;
    }
    let nanos =
        i128::from(cycles) * i128::from(NANOS_PER_SECOND) / i128::from(ticks_per_second.max(1));
    nanos.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}
