// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// The call stack where a contention event was recorded, as instruction
/// addresses. The leaf is at index 0.
///
/// Identity is structural: two stacks are the same site if and only if they
/// hold the same addresses in the same order.
#[derive(Clone, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StackTrace(Box<[u64]>);

impl StackTrace {
    pub fn new(addresses: impl Into<Box<[u64]>>) -> Self {
        Self(addresses.into())
    }

    #[inline]
    pub fn addresses(&self) -> &[u64] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

struct Hex(u64);

impl fmt::Debug for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|addr| Hex(*addr)))
            .finish()
    }
}

impl From<&[u64]> for StackTrace {
    fn from(addresses: &[u64]) -> Self {
        Self(addresses.into())
    }
}

impl<const N: usize> From<[u64; N]> for StackTrace {
    fn from(addresses: [u64; N]) -> Self {
        Self(Box::new(addresses))
    }
}

impl From<Vec<u64>> for StackTrace {
    fn from(addresses: Vec<u64>) -> Self {
        Self(addresses.into_boxed_slice())
    }
}

/// One entry of a runtime's cumulative contention table.
///
/// Both `count` and `cycles` are totals since the process started. `cycles`
/// is measured in the runtime's ticks, see
/// [`crate::ContentionSource::ticks_per_second`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ContentionRecord {
    pub stack: StackTrace,
    pub count: i64,
    pub cycles: i64,
}

impl ContentionRecord {
    pub fn new(stack: impl Into<StackTrace>, count: i64, cycles: i64) -> Self {
        Self {
            stack: stack.into(),
            count,
            cycles,
        }
    }
}

/// The incremental activity of one stack between two profiles, after the
/// profile class's scaling has been applied. This is what renderers receive.
#[derive(Clone, Debug, PartialEq)]
pub struct DeltaSample {
    pub stack: StackTrace,
    pub count: i64,
    pub nanos: i64,
}
