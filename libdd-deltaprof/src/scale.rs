// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-class corrections applied to deltas before they're rendered.

use crate::SamplingFraction;
use tracing::warn;

/// A multiplier applied to both the count and the delay of every sample of
/// one profile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scale(f64);

impl Scale {
    pub const IDENTITY: Scale = Scale(1.0);

    pub fn factor(self) -> f64 {
        self.0
    }

    /// Scales a count and a delay. The identity scale is exact; any other
    /// scale rounds the count to the nearest integer and truncates the delay.
    #[inline]
    pub fn apply(self, count: i64, nanos: i64) -> (i64, i64) {
        if self == Self::IDENTITY {
            return (count, nanos);
        }
        (
            (count as f64 * self.0).round() as i64,
            (nanos as f64 * self.0) as i64,
        )
    }
}

/// Decides how the samples of a profile class are corrected.
pub trait ContentionScaler {
    /// Returns the scale for the profile about to be rendered. Called once
    /// per profile.
    fn scale(&self) -> Scale;
}

/// Leaves samples as they were recorded.
///
/// Blocking events are sampled in proportion to how long they blocked, which
/// can't be inverted from the recorded totals alone, so no attempt is made.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unsampled;

impl ContentionScaler for Unsampled {
    fn scale(&self) -> Scale {
        Scale::IDENTITY
    }
}

/// Projects samples up to an estimate of all events by dividing by the
/// runtime's current sampling fraction.
#[derive(Clone, Debug, Default)]
pub struct FractionScaler<F> {
    fraction: F,
}

impl<F: SamplingFraction> FractionScaler<F> {
    pub fn new(fraction: F) -> Self {
        Self { fraction }
    }
}

impl<F: SamplingFraction> ContentionScaler for FractionScaler<F> {
    fn scale(&self) -> Scale {
        let fraction = self.fraction.sampling_fraction();
        if fraction.is_finite() && fraction > 0.0 && fraction <= 1.0 {
            Scale(fraction.recip())
        } else {
            warn!(fraction, "Ignoring unusable sampling fraction, samples are not scaled");
            Scale::IDENTITY
        }
    }
}
