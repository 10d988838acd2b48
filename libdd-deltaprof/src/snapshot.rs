// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{ContentionRecord, StackTrace};
use indexmap::map::{Entry, IndexMap};
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Cumulative totals of one stack.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Totals {
    pub count: i64,
    pub cycles: i64,
}

/// The full cumulative state of one profile class at one point in time,
/// keyed by stack. Iteration follows the order in which the runtime reported
/// the stacks.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    totals: FxIndexMap<StackTrace, Totals>,
}

impl Snapshot {
    /// Builds a snapshot from raw records. Records for the same stack are
    /// merged by adding their totals.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ContentionRecord>,
    {
        let records = records.into_iter();
        let mut totals = FxIndexMap::default();
        totals.reserve(records.size_hint().0);
        for record in records {
            match totals.entry(record.stack) {
                Entry::Occupied(mut o) => {
                    let t: &mut Totals = o.get_mut();
                    t.count = t.count.saturating_add(record.count);
                    t.cycles = t.cycles.saturating_add(record.cycles);
                }
                Entry::Vacant(v) => {
                    v.insert(Totals {
                        count: record.count,
                        cycles: record.cycles,
                    });
                }
            }
        }
        Self { totals }
    }

    pub fn get(&self, stack: &StackTrace) -> Option<&Totals> {
        self.totals.get(stack)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&StackTrace, &Totals)> {
        self.totals.iter()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

impl FromIterator<ContentionRecord> for Snapshot {
    fn from_iter<T: IntoIterator<Item = ContentionRecord>>(iter: T) -> Self {
        Self::from_records(iter)
    }
}
