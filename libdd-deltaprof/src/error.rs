// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::borrow::Cow;
use std::io;

/// Errors raised while reading the runtime's cumulative contention table.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// The runtime cannot supply this profile class at all, e.g. it has been
    /// disabled or isn't supported on this platform.
    #[error("profile unavailable: {0}")]
    Unavailable(Cow<'static, str>),
    /// The record set kept growing past the configured number of probes.
    #[error("runtime record set still growing after {attempts} attempts (last reported {last_reported} records)")]
    TooManyAttempts { attempts: u32, last_reported: usize },
}

impl AcquireError {
    pub fn unavailable(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::Unavailable(reason.into())
    }
}

/// Represents errors that occur while producing a delta profile.
///
/// On any error, whatever was written to the sink so far must be discarded.
#[derive(Debug, thiserror::Error)]
pub enum DeltaProfileError {
    #[error(transparent)]
    Acquire(#[from] AcquireError),
    /// The profile couldn't be represented in the output format.
    #[error("failed to encode profile: {0}")]
    Encode(Cow<'static, str>),
    /// The sink or the compressor rejected a write.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DeltaProfileError {
    pub fn encode(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::Encode(reason.into())
    }
}
