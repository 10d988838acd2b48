// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use rustc_hash::FxHashMap;
use std::sync::Arc;

/// The source position an address resolves to.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Frame {
    pub function: String,
    /// The mangled or otherwise raw name, if it differs from `function`.
    pub system_name: Option<String>,
    pub filename: String,
    pub line: i64,
}

/// Resolves instruction addresses to source positions for rendering.
///
/// Addresses that don't resolve are still rendered, just without a line, and
/// downstream tools can symbolize them later.
pub trait Symbolizer: Send + Sync {
    fn symbolize(&self, address: u64) -> Option<Frame>;
}

impl<T: Symbolizer + ?Sized> Symbolizer for Arc<T> {
    fn symbolize(&self, address: u64) -> Option<Frame> {
        (**self).symbolize(address)
    }
}

/// A symbolizer backed by a fixed table of pre-resolved addresses.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    frames: FxHashMap<u64, Frame>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: u64, frame: Frame) -> Option<Frame> {
        self.frames.insert(address, frame)
    }
}

impl FromIterator<(u64, Frame)> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = (u64, Frame)>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

impl Symbolizer for SymbolTable {
    fn symbolize(&self, address: u64) -> Option<Frame> {
        self.frames.get(&address).cloned()
    }
}
