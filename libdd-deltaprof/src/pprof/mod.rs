// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Streaming protobuf encoding for the subset of [`profile.proto`] that
//! contention profiles need: value types, samples, locations with a single
//! line, functions, and the string table.
//!
//! A `Profile` message is never materialized. Its fields are written to the
//! output one at a time as they become known, which protobuf allows since
//! repeated fields may be split and interleaved freely.
//!
//! Encoding happens a byte at a time, so write into a buffer.
//!
//! [`profile.proto`]: https://github.com/google/pprof/blob/main/proto/profile.proto

mod messages;
mod string_table;
mod varint;

#[cfg(any(test, feature = "prost_impls"))]
pub mod prost_impls;

pub use messages::*;
pub use string_table::*;

use std::fmt::{Debug, Formatter};
use std::io::{self, Write};

/// The subset of protobuf wire types that the encoder emits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    LengthDelimited = 2,
}

/// Something that can be encoded as the payload of a protobuf field.
pub trait Value: Default + Eq {
    const WIRE_TYPE: WireType;

    /// Number of bytes [`Value::encode`] will write. For length-delimited
    /// values this excludes the length prefix.
    fn proto_len(&self) -> u64;

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()>;
}

/// Skip the field when it holds the default value.
pub const OPT_ZERO: bool = true;

/// Always write the field, even when it holds the default value. Used where
/// zero is meaningful or the field is required, like ids.
pub const NO_OPT_ZERO: bool = false;

/// A value together with its field number `N`. `O` selects whether default
/// values are omitted from the output.
#[derive(Copy, Clone, Default, Eq, PartialEq)]
#[repr(transparent)]
pub struct Field<T: Value, const N: u32, const O: bool> {
    pub value: T,
}

impl<T: Value, const N: u32, const O: bool> From<T> for Field<T, N, O> {
    fn from(value: T) -> Self {
        Field { value }
    }
}

impl<T: Value, const N: u32, const O: bool> Field<T, N, O> {
    #[inline]
    fn is_skipped(&self) -> bool {
        O && self.value == T::default()
    }

    /// Number of bytes the field takes including its tag and, for
    /// length-delimited values, the length prefix.
    pub fn proto_len(&self) -> u64 {
        if self.is_skipped() {
            return 0;
        }
        let payload = self.value.proto_len();
        let prefix = match T::WIRE_TYPE {
            WireType::LengthDelimited => payload.proto_len(),
            WireType::Varint => 0,
        };
        Tag::new(N, T::WIRE_TYPE).proto_len() + prefix + payload
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.is_skipped() {
            return Ok(());
        }
        Tag::new(N, T::WIRE_TYPE).encode(writer)?;
        if T::WIRE_TYPE == WireType::LengthDelimited {
            self.value.proto_len().encode(writer)?;
        }
        self.value.encode(writer)
    }
}

impl<T: Debug + Value, const N: u32, const O: bool> Debug for Field<T, N, O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("number", &N)
            .field("value", &self.value)
            .finish()
    }
}

const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// The key of a field: its number shifted left by three, or'd with the wire
/// type.
#[derive(Copy, Clone, Debug)]
pub struct Tag(u32);

impl Tag {
    #[cfg_attr(debug_assertions, track_caller)]
    #[inline]
    pub const fn new(field: u32, wire_type: WireType) -> Self {
        debug_assert!(field >= 1 && field <= MAX_FIELD_NUMBER);
        Self((field << 3) | wire_type as u32)
    }

    #[inline]
    pub fn proto_len(self) -> u64 {
        u64::from(self.0).proto_len()
    }

    #[inline]
    pub fn encode<W: Write>(self, writer: &mut W) -> io::Result<()> {
        u64::from(self.0).encode(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_optimized_fields_are_omitted() {
        let skipped = Field::<u64, 3, OPT_ZERO>::from(0);
        let kept = Field::<u64, 3, NO_OPT_ZERO>::from(0);
        assert_eq!(skipped.proto_len(), 0);
        assert_eq!(kept.proto_len(), 2);

        let mut buffer = Vec::new();
        skipped.encode(&mut buffer).unwrap();
        assert!(buffer.is_empty());
        kept.encode(&mut buffer).unwrap();
        assert_eq!(buffer, [3 << 3, 0]);
    }

    #[test]
    fn length_delimited_fields_are_prefixed() {
        let field = Field::<&str, 6, NO_OPT_ZERO>::from("delay");
        let mut buffer = Vec::new();
        field.encode(&mut buffer).unwrap();
        assert_eq!(buffer.len() as u64, field.proto_len());
        assert_eq!(&buffer[..2], &[(6 << 3) | 2, 5]);
        assert_eq!(&buffer[2..], b"delay");
    }
}
