//! A streaming convenience layer on top of the two-pass ABI, modeled
//! directly on the reference crate's `xml_output.rs`: a thin adapter that
//! walks a tag tree and writes `quick_xml` events through a `Writer`.
//!
//! This never replaces `size_of`/`write_into` — it is an alternate output
//! path for callers who want an escaped, `std::io::Write`-backed rendering
//! and don't need the exact pre-computed buffer size the core ABI provides.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesEnd, BytesPI, BytesStart, BytesText, Event};

use crate::config::SerializerConfig;
use crate::err::{SerializeResult, TagError};
use crate::tag::{CDataTag, NodeTag, PiTag, Tag, TagArena, TagId};
use crate::value::TypedValue;

/// Render `id`'s subtree as an XML string.
pub fn to_xml_string(
    arena: &TagArena,
    id: TagId,
    level: usize,
    cfg: &SerializerConfig,
) -> SerializeResult<String> {
    let mut buf = Vec::new();
    write_xml(arena, id, level, cfg, &mut buf)?;
    Ok(String::from_utf8(buf).expect("quick-xml events are only ever built from UTF-8 text"))
}

/// Stream `id`'s subtree as XML into `target`.
pub fn write_xml<W: Write>(
    arena: &TagArena,
    id: TagId,
    level: usize,
    cfg: &SerializerConfig,
    target: W,
) -> SerializeResult<()> {
    let mut writer = Writer::new(target);
    write_tag(arena, id, level, cfg, &mut writer)
}

fn indent<W: Write>(writer: &mut Writer<W>, level: usize, cfg: &SerializerConfig) -> SerializeResult<()> {
    let spaces = " ".repeat(level * cfg.indent_width);
    writer.get_mut().write_all(spaces.as_bytes())?;
    Ok(())
}

fn write_tag<W: Write>(
    arena: &TagArena,
    id: TagId,
    level: usize,
    cfg: &SerializerConfig,
    writer: &mut Writer<W>,
) -> SerializeResult<()> {
    let tag = arena.get(id)?;
    match tag {
        Tag::Node(n) => write_node(arena, id, n, level, cfg, writer),
        Tag::CData(c) => write_cdata(c, level, cfg, writer),
        Tag::Pi(p) => write_pi(p, level, cfg, writer),
    }
}

fn render_first_entry(value: &dyn TypedValue, cfg: &SerializerConfig) -> SerializeResult<String> {
    let len = value.utf8_len(0)?;
    let mut buf = vec![0u8; len];
    value.write_utf8(0, &mut buf)?;
    buf.pop(); // drop the trailing NUL; quick-xml events are plain text
    let mut text = String::from_utf8(buf).expect("TypedValue entries are valid UTF-8 text");
    if value.value_type().is_timestamp() {
        text.push('Z');
    }
    let _ = cfg; // escaping is handled by the BytesText/Attribute constructors below
    Ok(text)
}

fn write_node<W: Write>(
    arena: &TagArena,
    id: TagId,
    n: &NodeTag,
    level: usize,
    cfg: &SerializerConfig,
    writer: &mut Writer<W>,
) -> SerializeResult<()> {
    let name_value = n.name.as_deref().ok_or(TagError::MissingName(id))?;
    let name = render_first_entry(name_value, cfg)?;

    indent(writer, level, cfg)?;
    let mut start = BytesStart::new(name.as_str());
    for &attr_id in &n.attributes {
        let attr_tag = arena.get(attr_id)?;
        let attr = attr_tag.as_node().ok_or(TagError::WrongKind {
            expected: "Node",
            op: "write_xml attribute",
        })?;
        let a_name_value = attr.name.as_deref().ok_or(TagError::MissingName(attr_id))?;
        let a_value = attr.value.as_deref().ok_or(TagError::AttributeMissingValue)?;
        let a_name = render_first_entry(a_name_value, cfg)?;
        let a_text = render_first_entry(a_value, cfg)?;
        let attr = if cfg.escape_text {
            Attribute::from((a_name.as_str(), a_text.as_str()))
        } else {
            Attribute::from((a_name.as_bytes(), a_text.as_bytes()))
        };
        start.push_attribute(attr);
    }

    if let Some(value) = n.value.as_deref() {
        let entry_count = value.entry_count();
        let mut qualifying = Vec::new();
        for i in 0..entry_count {
            let len = value.utf8_len(i)?;
            if len <= 1 {
                continue;
            }
            let mut buf = vec![0u8; len];
            value.write_utf8(i, &mut buf)?;
            buf.pop();
            let mut text = String::from_utf8(buf).expect("TypedValue entries are valid UTF-8 text");
            if value.value_type().is_timestamp() {
                text.push('Z');
            }
            qualifying.push(text);
        }

        if qualifying.is_empty() {
            writer.write_event(Event::Empty(start))?;
        } else {
            writer.write_event(Event::Start(start))?;
            for text in qualifying {
                let event = if cfg.escape_text {
                    Event::Text(BytesText::new(&text))
                } else {
                    Event::Text(BytesText::from_escaped(text))
                };
                writer.write_event(event)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        }
    } else if !n.children.is_empty() {
        writer.write_event(Event::Start(start))?;
        writer.get_mut().write_all(b"\n")?;
        for &child in &n.children {
            write_tag(arena, child, level + 1, cfg, writer)?;
        }
        indent(writer, level, cfg)?;
        writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    } else {
        writer.write_event(Event::Empty(start))?;
    }
    writer.get_mut().write_all(b"\n")?;
    Ok(())
}

fn write_cdata<W: Write>(
    c: &CDataTag,
    level: usize,
    cfg: &SerializerConfig,
    writer: &mut Writer<W>,
) -> SerializeResult<()> {
    let text = render_first_entry(c.value.as_ref(), cfg)?;
    indent(writer, level, cfg)?;
    writer.write_event(Event::CData(BytesCData::new(&text)))?;
    writer.get_mut().write_all(b"\n")?;
    Ok(())
}

fn write_pi<W: Write>(
    p: &PiTag,
    level: usize,
    cfg: &SerializerConfig,
    writer: &mut Writer<W>,
) -> SerializeResult<()> {
    let name = render_first_entry(p.name.as_ref(), cfg)?;
    let value = render_first_entry(p.value.as_ref(), cfg)?;
    let concat = format!("{name} {value}");
    indent(writer, level, cfg)?;
    writer.write_event(Event::PI(BytesPI::new(concat.as_str())))?;
    writer.get_mut().write_all(b"\n")?;
    Ok(())
}
