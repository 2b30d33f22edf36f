//! The two-pass size/emit serializer.
//!
//! `size_of` and `write_into` share one traversal (`emit_tag`) parameterized
//! over a `Sink`: a `SizeSink` only counts code units, a `WriteSink` writes
//! them into a caller buffer with bounds checks. This guarantees the two
//! passes agree on the exact byte count by construction, rather than
//! maintaining two independently hand-written size/write functions in
//! lockstep — the single recursive traversal plays the role the reference
//! crate gives `ir_xml.rs`'s `render_element`, but generalized over the
//! code-unit type the way `value_render.rs`'s `ValueRenderer` generalizes
//! over JSON/XML output.

pub mod xml_convenience;

use crate::config::SerializerConfig;
use crate::err::{SerializeError, SerializeResult, TagError};
use crate::tag::{CDataTag, NodeTag, PiTag, Tag, TagArena, TagId};
use crate::value::TypedValue;

/// A code-unit type the serializer can emit into: `u8` for UTF-8, `u16` for
/// UTF-16. Bridges to the per-entry sizing/writing primitives on
/// [`TypedValue`], which are themselves encoding-specific.
pub trait CodeUnit: Copy + Default + PartialEq {
    fn ascii(byte: u8) -> Self;
    fn value_len(value: &dyn TypedValue, i: usize) -> crate::err::ValueResult<usize>;
    fn write_value(
        value: &dyn TypedValue,
        i: usize,
        buf: &mut [Self],
    ) -> crate::err::ValueResult<usize>;
}

impl CodeUnit for u8 {
    fn ascii(byte: u8) -> Self {
        byte
    }
    fn value_len(value: &dyn TypedValue, i: usize) -> crate::err::ValueResult<usize> {
        value.utf8_len(i)
    }
    fn write_value(
        value: &dyn TypedValue,
        i: usize,
        buf: &mut [Self],
    ) -> crate::err::ValueResult<usize> {
        value.write_utf8(i, buf)
    }
}

impl CodeUnit for u16 {
    fn ascii(byte: u8) -> Self {
        u16::from(byte)
    }
    fn value_len(value: &dyn TypedValue, i: usize) -> crate::err::ValueResult<usize> {
        value.utf16_len(i)
    }
    fn write_value(
        value: &dyn TypedValue,
        i: usize,
        buf: &mut [Self],
    ) -> crate::err::ValueResult<usize> {
        value.write_utf16(i, buf)
    }
}

/// Receives code units as `emit_tag` walks a tag tree. `SizeSink` only
/// counts; `WriteSink` writes into a caller buffer.
trait Sink<U: CodeUnit> {
    fn write_unit(&mut self, unit: U) -> SerializeResult<()>;

    fn write_ascii(&mut self, byte: u8) -> SerializeResult<()> {
        self.write_unit(U::ascii(byte))
    }

    /// Copy the text rendering of entry `i` of `value`, including its
    /// trailing NUL. Callers follow up with [`Self::rewind_one`] unless the
    /// NUL is meant to survive as the buffer's final unit.
    fn copy_value(&mut self, value: &dyn TypedValue, i: usize) -> SerializeResult<()>;

    /// Un-write the last unit, reusing its slot for whatever comes next.
    /// This is the "copy then rewind" idiom: every copy primitive reports a
    /// trailing NUL in its length, and the caller decides whether to keep
    /// that NUL (only ever true for the tag's very final terminator) or
    /// rewind over it to make room for the next character.
    fn rewind_one(&mut self);
}

struct SizeSink {
    total: usize,
}

impl<U: CodeUnit> Sink<U> for SizeSink {
    fn write_unit(&mut self, _unit: U) -> SerializeResult<()> {
        self.total += 1;
        Ok(())
    }

    fn copy_value(&mut self, value: &dyn TypedValue, i: usize) -> SerializeResult<()> {
        self.total += U::value_len(value, i)?;
        Ok(())
    }

    fn rewind_one(&mut self) {
        self.total -= 1;
    }
}

struct WriteSink<'a, U> {
    buf: &'a mut [U],
    pos: usize,
}

impl<U: CodeUnit> Sink<U> for WriteSink<'_, U> {
    fn write_unit(&mut self, unit: U) -> SerializeResult<()> {
        let slot = self
            .buf
            .get_mut(self.pos)
            .ok_or(SerializeError::BufferTooSmall {
                needed: self.pos + 1,
                available: self.buf.len(),
            })?;
        *slot = unit;
        self.pos += 1;
        Ok(())
    }

    fn copy_value(&mut self, value: &dyn TypedValue, i: usize) -> SerializeResult<()> {
        let len = U::value_len(value, i)?;
        let end = self.pos + len;
        let slice = self
            .buf
            .get_mut(self.pos..end)
            .ok_or(SerializeError::BufferTooSmall {
                needed: end,
                available: self.buf.len(),
            })?;
        let written = U::write_value(value, i, slice)?;
        self.pos += written;
        Ok(())
    }

    fn rewind_one(&mut self) {
        self.pos -= 1;
    }
}

fn write_indent<U: CodeUnit, S: Sink<U>>(
    sink: &mut S,
    level: usize,
    cfg: &SerializerConfig,
) -> SerializeResult<()> {
    for _ in 0..(level * cfg.indent_width) {
        sink.write_ascii(b' ')?;
    }
    Ok(())
}

fn emit_tag<U: CodeUnit, S: Sink<U>>(
    arena: &TagArena,
    id: TagId,
    level: usize,
    cfg: &SerializerConfig,
    sink: &mut S,
) -> SerializeResult<()> {
    write_indent(sink, level, cfg)?;
    sink.write_ascii(b'<')?;

    let tag = arena.get(id).map_err(SerializeError::from)?;
    match tag {
        Tag::Node(n) => emit_node_body(arena, id, n, level, cfg, sink)?,
        Tag::CData(c) => emit_cdata_body(c, sink)?,
        Tag::Pi(p) => emit_pi_body(p, sink)?,
    }

    sink.write_ascii(b'>')?;
    sink.write_ascii(b'\n')?;
    sink.write_unit(U::default())?;
    Ok(())
}

fn emit_node_body<U: CodeUnit, S: Sink<U>>(
    arena: &TagArena,
    id: TagId,
    n: &NodeTag,
    level: usize,
    cfg: &SerializerConfig,
    sink: &mut S,
) -> SerializeResult<()> {
    let name = n.name.as_deref().ok_or(TagError::MissingName(id))?;
    sink.copy_value(name, 0)?;
    sink.rewind_one();

    for &attr_id in &n.attributes {
        let attr_tag = arena.get(attr_id).map_err(SerializeError::from)?;
        let attr = attr_tag.as_node().ok_or(SerializeError::from(TagError::WrongKind {
            expected: "Node",
            op: "emit attribute",
        }))?;
        let a_name = attr.name.as_deref().ok_or(TagError::MissingName(attr_id))?;
        let a_value = attr
            .value
            .as_deref()
            .ok_or(TagError::AttributeMissingValue)?;

        sink.write_ascii(b' ')?;
        sink.copy_value(a_name, 0)?;
        sink.rewind_one();
        sink.write_ascii(b'=')?;
        sink.write_ascii(b'"')?;
        sink.copy_value(a_value, 0)?;
        sink.rewind_one();
        if a_value.value_type().is_timestamp() {
            sink.write_ascii(b'Z')?;
        }
        sink.write_ascii(b'"')?;
    }

    if let Some(value) = n.value.as_deref() {
        let entry_count = value.entry_count();
        let mut value_size = 0usize;
        for i in 0..entry_count {
            let sz = U::value_len(value, i)?;
            if sz > 1 {
                value_size += sz - 1;
                if value.value_type().is_timestamp() {
                    value_size += 1;
                }
            }
        }

        if value_size > 0 {
            sink.write_ascii(b'>')?;
            for i in 0..entry_count {
                let sz = U::value_len(value, i)?;
                if sz > 1 {
                    sink.copy_value(value, i)?;
                    sink.rewind_one();
                    if value.value_type().is_timestamp() {
                        sink.write_ascii(b'Z')?;
                    }
                }
            }
            sink.write_ascii(b'<')?;
            sink.write_ascii(b'/')?;
            sink.copy_value(name, 0)?;
            sink.rewind_one();
        } else {
            sink.write_ascii(b'/')?;
        }
    } else if !n.children.is_empty() {
        sink.write_ascii(b'>')?;
        sink.write_ascii(b'\n')?;
        for &child in &n.children {
            emit_tag::<U, S>(arena, child, level + 1, cfg, sink)?;
            sink.rewind_one();
        }
        write_indent(sink, level, cfg)?;
        sink.write_ascii(b'<')?;
        sink.write_ascii(b'/')?;
        sink.copy_value(name, 0)?;
        sink.rewind_one();
    } else {
        sink.write_ascii(b'/')?;
    }

    Ok(())
}

fn emit_cdata_body<U: CodeUnit, S: Sink<U>>(c: &CDataTag, sink: &mut S) -> SerializeResult<()> {
    for byte in b"![CDATA[" {
        sink.write_ascii(*byte)?;
    }
    sink.copy_value(c.value.as_ref(), 0)?;
    sink.rewind_one();
    sink.write_ascii(b']')?;
    sink.write_ascii(b']')?;
    Ok(())
}

fn emit_pi_body<U: CodeUnit, S: Sink<U>>(p: &PiTag, sink: &mut S) -> SerializeResult<()> {
    sink.write_ascii(b'?')?;
    sink.copy_value(p.name.as_ref(), 0)?;
    sink.rewind_one();
    sink.write_ascii(b' ')?;
    sink.copy_value(p.value.as_ref(), 0)?;
    sink.rewind_one();
    sink.write_ascii(b'?')?;
    Ok(())
}

/// Compute the exact output size of the subtree rooted at `id`, in `U` code
/// units, including the terminating NUL.
pub fn size_of<U: CodeUnit>(
    arena: &TagArena,
    id: TagId,
    level: usize,
    cfg: &SerializerConfig,
) -> SerializeResult<usize> {
    let mut sink = SizeSink { total: 0 };
    emit_tag::<U, _>(arena, id, level, cfg, &mut sink)?;
    Ok(sink.total)
}

/// Write the subtree rooted at `id` into `out` as `U` code units, returning
/// the number written (including the terminating NUL). Fails with
/// `SerializeError::BufferTooSmall` without writing past `out.len()`.
pub fn write_into<U: CodeUnit>(
    arena: &TagArena,
    id: TagId,
    level: usize,
    cfg: &SerializerConfig,
    out: &mut [U],
) -> SerializeResult<usize> {
    let mut sink = WriteSink { buf: out, pos: 0 };
    emit_tag::<U, _>(arena, id, level, cfg, &mut sink)?;
    Ok(sink.pos)
}
