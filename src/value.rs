//! The `TypedValue` capability: how a [`crate::tag::Tag`]'s name or content
//! exposes itself as one or more text-renderable entries.
//!
//! This module only defines the contract. A concrete implementation lives in
//! [`crate::bxml_value`]; a decoder that parses raw BinXML bytes into typed
//! values is out of scope here and is expected to provide its own
//! `TypedValue` impl.

use crate::err::ValueError;

/// The logical type carried by a value. Mirrors the reference crate's
/// `BinXMLValueType` for the subset this crate models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Null,
    Utf16Str,
    AnsiStr,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Real32,
    Real64,
    Bool,
    Binary,
    Guid,
    Sid,
    HexInt32,
    HexInt64,
    FileTime,
    SysTime,
    Utf16StrArray,
    AnsiStrArray,
    Int8Array,
    UInt8Array,
    Int16Array,
    UInt16Array,
    Int32Array,
    UInt32Array,
    Int64Array,
    UInt64Array,
    Real32Array,
    Real64Array,
    BoolArray,
    GuidArray,
    SidArray,
    HexInt32Array,
    HexInt64Array,
    FileTimeArray,
    SysTimeArray,
}

impl ValueType {
    /// `true` for the two timestamp types, which the serializer renders with
    /// a trailing `Z`.
    pub fn is_timestamp(self) -> bool {
        matches!(self, ValueType::FileTime | ValueType::SysTime)
            || matches!(self, ValueType::FileTimeArray | ValueType::SysTimeArray)
    }
}

/// A name or value attached to a [`crate::tag::Tag`].
///
/// A value holds one or more entries (`entry_count() >= 1`); scalars report
/// one entry, array variants report their length. Each entry can be rendered
/// as UTF-8 or UTF-16 text, always with a trailing NUL code unit included in
/// both the reported size and the written length — this lets the serializer
/// reuse the NUL slot for whatever character follows (see
/// [`crate::serialize::rewind_one`]).
pub trait TypedValue {
    /// The logical type of this value.
    fn value_type(&self) -> ValueType;

    /// Number of entries packed into this value. Always `>= 1`.
    fn entry_count(&self) -> usize;

    /// Size, in `u8` code units, of entry `i` rendered as text, including a
    /// trailing NUL.
    fn utf8_len(&self, i: usize) -> Result<usize, ValueError>;

    /// Size, in `u16` code units, of entry `i` rendered as text, including a
    /// trailing NUL.
    fn utf16_len(&self, i: usize) -> Result<usize, ValueError>;

    /// Write the text rendering of entry `i` into `buf`, starting at index
    /// 0. `buf` is exactly `utf8_len(i)` bytes long. Returns the number of
    /// bytes written, including the trailing NUL.
    fn write_utf8(&self, i: usize, buf: &mut [u8]) -> Result<usize, ValueError>;

    /// Write the text rendering of entry `i` into `buf`, starting at index
    /// 0. `buf` is exactly `utf16_len(i)` units long. Returns the number of
    /// units written, including the trailing NUL.
    fn write_utf16(&self, i: usize, buf: &mut [u16]) -> Result<usize, ValueError>;
}

/// A search key used by [`crate::tag::TagArena::find_attribute`] and
/// [`crate::tag::TagArena::find_child`].
#[derive(Debug, Clone, Copy)]
pub enum NameNeedle<'a> {
    Utf8(&'a str),
    Utf16(&'a [u16]),
}
