// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! Delta profiles for blocking and mutex contention.
//!
//! Runtimes usually keep contention totals since the process started, keyed
//! by call stack. A [`DeltaProfiler`] reads those totals every time it's
//! asked for a profile and reports only the part accumulated since its
//! previous profile, as a pprof. Mutex profiles are also scaled up by the
//! runtime's sampling fraction.
//!
//! The runtime is reached through [`ContentionSource`] and
//! [`SamplingFraction`]. [`ContentionRegistry`] implements both for programs
//! that track their own contention.

mod acquire;
mod delta;
mod error;
mod profiler;
mod record;
mod registry;
mod render;
mod runtime;
mod scale;
mod snapshot;
mod symbolize;

pub mod pprof;

pub use acquire::*;
pub use delta::*;
pub use error::*;
pub use profiler::*;
pub use record::*;
pub use registry::*;
pub use render::*;
pub use runtime::*;
pub use scale::*;
pub use snapshot::*;
pub use symbolize::*;
