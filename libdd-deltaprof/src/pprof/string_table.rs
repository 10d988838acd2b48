// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{Field, Value, WireType, NO_OPT_ZERO};
use crate::DeltaProfileError;
use indexmap::map::{Entry, IndexMap};
use rustc_hash::FxHasher;
use std::borrow::Cow;
use std::hash::BuildHasherDefault;
use std::io::{self, Write};

/// An index into the profile's string table. Offset 0 is the empty string.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct StringOffset(u32);

impl StringOffset {
    pub const ZERO: Self = Self(0);

    pub const fn new(offset: u32) -> Self {
        Self(offset)
    }
}

impl From<StringOffset> for i64 {
    fn from(offset: StringOffset) -> Self {
        i64::from(offset.0)
    }
}

impl Value for StringOffset {
    const WIRE_TYPE: WireType = WireType::Varint;

    fn proto_len(&self) -> u64 {
        u64::from(self.0).proto_len()
    }

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        u64::from(self.0).encode(writer)
    }
}

/// `Profile.string_table`
type StringEntry<'a> = Field<&'a str, 6, NO_OPT_ZERO>;

/// Interns strings to offsets, writing each string to the output the first
/// time it's seen so the table is emitted in offset order.
pub struct StringTable<'a> {
    // A map with () values for the entry API, which the set type lacks.
    map: IndexMap<Cow<'a, str>, (), BuildHasherDefault<FxHasher>>,
}

impl<'a> StringTable<'a> {
    /// Creates the table and writes the mandatory empty string at offset 0.
    pub fn new<W: Write>(writer: &mut W) -> io::Result<Self> {
        let mut map = IndexMap::with_hasher(Default::default());
        map.insert(Cow::Borrowed(""), ());
        StringEntry::from("").encode(writer)?;
        Ok(Self { map })
    }

    pub fn intern<W, S>(&mut self, writer: &mut W, s: S) -> Result<StringOffset, DeltaProfileError>
    where
        W: Write,
        S: Into<Cow<'a, str>>,
    {
        let len = self.map.len();
        match self.map.entry(s.into()) {
            Entry::Occupied(o) => Ok(StringOffset(offset_of(o.index())?)),
            Entry::Vacant(v) => {
                let offset = StringOffset(offset_of(len)?);
                StringEntry::from(v.key().as_ref()).encode(writer)?;
                v.insert(());
                Ok(offset)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn offset_of(index: usize) -> Result<u32, DeltaProfileError> {
    u32::try_from(index)
        .map_err(|_| DeltaProfileError::encode("string table exceeds u32::MAX entries"))
}
