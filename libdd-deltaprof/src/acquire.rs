// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reads a complete cumulative record set from a [`ContentionSource`].
//!
//! The runtime's table can grow between the moment it reports its size and
//! the moment it's read, so reading is a loop: probe for the size, allocate
//! that plus a margin, and try again whenever the buffer turns out to be too
//! small.

use crate::{AcquireError, ContentionRecord, ContentionSource, Snapshot};
use serde::Deserialize;
use std::num::NonZeroU32;
use tracing::debug;

/// How the acquisition loop sizes its buffers and when it gives up.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct AcquireStrategy {
    /// Extra slots allocated on top of the last reported record count.
    pub growth_margin: usize,
    /// Upper bound on the number of sized reads. `None` retries until a read
    /// succeeds, which is fine in practice because the record set only grows
    /// while new contended call sites are discovered.
    pub max_attempts: Option<NonZeroU32>,
}

impl AcquireStrategy {
    pub const DEFAULT_GROWTH_MARGIN: usize = 50;

    pub fn new(growth_margin: usize, max_attempts: Option<NonZeroU32>) -> Self {
        Self {
            growth_margin,
            max_attempts,
        }
    }
}

impl Default for AcquireStrategy {
    fn default() -> Self {
        Self {
            growth_margin: Self::DEFAULT_GROWTH_MARGIN,
            max_attempts: None,
        }
    }
}

/// Reads the source's current records, retrying with bigger buffers until the
/// whole set fits. The returned records are exactly the ones the runtime
/// reported, in its order.
pub fn acquire_records<S>(
    source: &S,
    strategy: &AcquireStrategy,
) -> Result<Vec<ContentionRecord>, AcquireError>
where
    S: ContentionSource + ?Sized,
{
    let mut reported = source.read(&mut [])?.available;
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        if let Some(max) = strategy.max_attempts {
            if attempt > max.get() {
                return Err(AcquireError::TooManyAttempts {
                    attempts: max.get(),
                    last_reported: reported,
                });
            }
        }

        let capacity = reported.saturating_add(strategy.growth_margin);
        let mut records = vec![ContentionRecord::default(); capacity];
        let outcome = source.read(&mut records)?;
        if outcome.complete {
            records.truncate(outcome.available);
            if attempt > 1 {
                debug!(
                    attempts = attempt,
                    records = outcome.available,
                    "Acquired contention records after retrying"
                );
            }
            return Ok(records);
        }

        debug!(
            attempt,
            capacity,
            available = outcome.available,
            "Contention record buffer too small, retrying"
        );
        reported = outcome.available;
    }
}

/// Reads the source's current records and merges them by stack.
pub fn acquire_snapshot<S>(source: &S, strategy: &AcquireStrategy) -> Result<Snapshot, AcquireError>
where
    S: ContentionSource + ?Sized,
{
    let records = acquire_records(source, strategy)?;
    Ok(Snapshot::from_records(records))
}
