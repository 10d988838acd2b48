// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{Field, StringOffset, Value, WireType, NO_OPT_ZERO, OPT_ZERO};
use std::io::{self, Write};

/// Describes the semantics and units of a value.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ValueType {
    pub r#type: Field<StringOffset, 1, OPT_ZERO>,
    pub unit: Field<StringOffset, 2, OPT_ZERO>,
}

impl ValueType {
    pub fn new(r#type: StringOffset, unit: StringOffset) -> Self {
        Self {
            r#type: r#type.into(),
            unit: unit.into(),
        }
    }
}

impl Value for ValueType {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn proto_len(&self) -> u64 {
        self.r#type.proto_len() + self.unit.proto_len()
    }

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.r#type.encode(writer)?;
        self.unit.encode(writer)
    }
}

/// A stack and the values recorded for it. Borrows slices because the fields
/// are walked twice, once for the length prefix and once to encode.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Sample<'a> {
    /// Leaf first.
    pub location_ids: Field<&'a [u64], 1, OPT_ZERO>,
    /// One per `Profile.sample_type`.
    pub values: Field<&'a [i64], 2, OPT_ZERO>,
}

impl<'a> Sample<'a> {
    pub fn new(location_ids: &'a [u64], values: &'a [i64]) -> Self {
        Self {
            location_ids: location_ids.into(),
            values: values.into(),
        }
    }
}

impl Value for Sample<'_> {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn proto_len(&self) -> u64 {
        self.location_ids.proto_len() + self.values.proto_len()
    }

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.location_ids.encode(writer)?;
        self.values.encode(writer)
    }
}

/// Source position of a location. Only one line per location is supported,
/// which means inlined frames aren't represented.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Line {
    pub function_id: Field<u64, 1, OPT_ZERO>,
    pub lineno: Field<i64, 2, OPT_ZERO>,
}

impl Value for Line {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn proto_len(&self) -> u64 {
        self.function_id.proto_len() + self.lineno.proto_len()
    }

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.function_id.encode(writer)?;
        self.lineno.encode(writer)
    }
}

/// An instruction address, optionally resolved to a line. Mappings aren't
/// emitted, so field 2 is never written.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Location {
    pub id: Field<u64, 1, NO_OPT_ZERO>,
    pub address: Field<u64, 3, OPT_ZERO>,
    pub line: Field<Line, 4, OPT_ZERO>,
}

impl Value for Location {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn proto_len(&self) -> u64 {
        self.id.proto_len()
            + self.address.proto_len()
            + self.line.proto_len()
    }

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.id.encode(writer)?;
        self.address.encode(writer)?;
        self.line.encode(writer)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Function {
    pub id: Field<u64, 1, NO_OPT_ZERO>,
    pub name: Field<StringOffset, 2, OPT_ZERO>,
    pub system_name: Field<StringOffset, 3, OPT_ZERO>,
    pub filename: Field<StringOffset, 4, OPT_ZERO>,
}

impl Value for Function {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn proto_len(&self) -> u64 {
        self.id.proto_len()
            + self.name.proto_len()
            + self.system_name.proto_len()
            + self.filename.proto_len()
    }

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.id.encode(writer)?;
        self.name.encode(writer)?;
        self.system_name.encode(writer)?;
        self.filename.encode(writer)
    }
}

// Top-level fields of `Profile`.
pub type SampleTypeField = Field<ValueType, 1, NO_OPT_ZERO>;
pub type SampleField<'a> = Field<Sample<'a>, 2, NO_OPT_ZERO>;
pub type LocationField = Field<Location, 4, NO_OPT_ZERO>;
pub type FunctionField = Field<Function, 5, NO_OPT_ZERO>;
pub type TimeNanosField = Field<i64, 9, OPT_ZERO>;
pub type DurationNanosField = Field<i64, 10, OPT_ZERO>;
pub type PeriodTypeField = Field<ValueType, 11, NO_OPT_ZERO>;
pub type PeriodField = Field<i64, 12, OPT_ZERO>;
