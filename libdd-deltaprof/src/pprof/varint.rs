// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{Value, WireType};
use std::io::{self, Write};

impl Value for u64 {
    const WIRE_TYPE: WireType = WireType::Varint;

    #[inline]
    fn proto_len(&self) -> u64 {
        // Seven payload bits per byte; zero still takes one byte.
        let bits = 64 - (self | 1).leading_zeros();
        u64::from(bits.div_ceil(7))
    }

    /// Least significant group first, high bit set on all but the last byte.
    #[inline]
    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut value = *self;
        while value >= 0x80 {
            writer.write_all(&[(value as u8 & 0x7F) | 0x80])?;
            value >>= 7;
        }
        writer.write_all(&[value as u8])
    }
}

/// `int64` fields are varints of the two's complement bits, so negative
/// numbers always take ten bytes.
impl Value for i64 {
    const WIRE_TYPE: WireType = WireType::Varint;

    #[inline]
    fn proto_len(&self) -> u64 {
        (*self as u64).proto_len()
    }

    #[inline]
    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        (*self as u64).encode(writer)
    }
}

/// Packed repeated `uint64`.
impl Value for &'_ [u64] {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn proto_len(&self) -> u64 {
        self.iter().map(Value::proto_len).sum()
    }

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.iter().try_for_each(|v| v.encode(writer))
    }
}

/// Packed repeated `int64`.
impl Value for &'_ [i64] {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn proto_len(&self) -> u64 {
        self.iter().map(Value::proto_len).sum()
    }

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.iter().try_for_each(|v| v.encode(writer))
    }
}

impl Value for &'_ str {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    fn proto_len(&self) -> u64 {
        self.len() as u64
    }

    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.as_bytes())
    }
}
