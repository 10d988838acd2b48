// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The runtime capabilities a delta profiler reads from. They're injected
//! rather than global so that any runtime (or a fake one) can back a
//! profiler.

use crate::{AcquireError, ContentionRecord};
use std::sync::Arc;

/// Nanoseconds in a second, the tick rate of a runtime that reports delay in
/// nanoseconds directly.
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Result of one query against a [`ContentionSource`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReadOutcome {
    /// How many records the runtime currently holds.
    pub available: usize,
    /// Whether the buffer was large enough. When true, the first `available`
    /// entries of the buffer have been filled in.
    pub complete: bool,
}

/// A runtime's cumulative contention table for one profile class.
pub trait ContentionSource {
    /// Copies the current cumulative records into `buf`.
    ///
    /// If `buf` is too small, nothing is guaranteed about its contents and
    /// the outcome reports `complete: false` along with the number of records
    /// the runtime has right now. Passing an empty buffer is how callers
    /// probe for the size.
    fn read(&self, buf: &mut [ContentionRecord]) -> Result<ReadOutcome, AcquireError>;

    /// The rate of the runtime's tick counter that `cycles` is measured in.
    fn ticks_per_second(&self) -> u64 {
        NANOS_PER_SECOND
    }
}

/// Read-only access to the fraction of contention events a runtime records.
///
/// Implementations must not modify the fraction as a side effect of reading
/// it.
pub trait SamplingFraction {
    /// The probability that an event is recorded, in `(0, 1]` when sampling
    /// is enabled.
    fn sampling_fraction(&self) -> f64;
}

impl<T: ContentionSource + ?Sized> ContentionSource for Arc<T> {
    fn read(&self, buf: &mut [ContentionRecord]) -> Result<ReadOutcome, AcquireError> {
        (**self).read(buf)
    }

    fn ticks_per_second(&self) -> u64 {
        (**self).ticks_per_second()
    }
}

impl<T: ContentionSource + ?Sized> ContentionSource for &T {
    fn read(&self, buf: &mut [ContentionRecord]) -> Result<ReadOutcome, AcquireError> {
        (**self).read(buf)
    }

    fn ticks_per_second(&self) -> u64 {
        (**self).ticks_per_second()
    }
}

impl<T: SamplingFraction + ?Sized> SamplingFraction for Arc<T> {
    fn sampling_fraction(&self) -> f64 {
        (**self).sampling_fraction()
    }
}

impl<T: SamplingFraction + ?Sized> SamplingFraction for &T {
    fn sampling_fraction(&self) -> f64 {
        (**self).sampling_fraction()
    }
}
