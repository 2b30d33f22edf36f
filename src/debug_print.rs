//! Diagnostic rendering of a tag tree, independent of the two-pass ABI: no
//! size pass, no buffer, just an unbuffered walk that writes through `log`'s
//! `trace!` macro (mirroring the reference crate's
//! `trace!("visit_open_start_element: {:?}", element)` style in
//! `xml_output.rs`) or, for tests, a caller-supplied `fmt::Write` sink.

use std::fmt::Write as FmtWrite;

use log::trace;

use crate::err::{SerializeResult, TagError};
use crate::tag::{CDataTag, NodeTag, PiTag, Tag, TagArena, TagId};
use crate::value::TypedValue;

impl TagArena {
    /// Write a line-per-tag debug rendering of `id`'s subtree into `sink`.
    /// Each line shows the tag kind, its name (if any), and its own value
    /// (if any); children are shown indented two spaces per level.
    pub fn debug_print(
        &self,
        id: TagId,
        level: usize,
        sink: &mut dyn FmtWrite,
    ) -> SerializeResult<()> {
        let tag = self.get(id)?;
        let indent = "  ".repeat(level);
        match tag {
            Tag::Node(n) => self.debug_print_node(id, n, level, &indent, sink)?,
            Tag::CData(c) => debug_print_cdata(c, &indent, sink)?,
            Tag::Pi(p) => debug_print_pi(p, &indent, sink)?,
        }
        Ok(())
    }

    fn debug_print_node(
        &self,
        id: TagId,
        n: &NodeTag,
        level: usize,
        indent: &str,
        sink: &mut dyn FmtWrite,
    ) -> SerializeResult<()> {
        let name = render_name(n.name.as_deref())?;
        trace!("debug_print: Node {:?} name={}", id, name);
        writeln!(sink, "{indent}<{name}")?;

        for &attr_id in &n.attributes {
            let attr = self.get(attr_id)?.as_node().ok_or(TagError::WrongKind {
                expected: "Node",
                op: "debug_print attribute",
            })?;
            let a_name = render_name(attr.name.as_deref())?;
            let a_value = render_value(attr.value.as_deref())?;
            writeln!(sink, "{indent}  @{a_name}={a_value:?}")?;
        }

        if let Some(value) = n.value.as_deref() {
            let rendered = render_value(Some(value))?;
            writeln!(sink, "{indent}  = {rendered:?}")?;
        }

        for &child in &n.children {
            self.debug_print(child, level + 1, sink)?;
        }

        writeln!(sink, "{indent}</{name}>")?;
        Ok(())
    }
}

fn debug_print_cdata(c: &CDataTag, indent: &str, sink: &mut dyn FmtWrite) -> SerializeResult<()> {
    let value = render_value(Some(c.value.as_ref()))?;
    trace!("debug_print: CData");
    writeln!(sink, "{indent}<![CDATA[{value:?}]]>")?;
    Ok(())
}

fn debug_print_pi(p: &PiTag, indent: &str, sink: &mut dyn FmtWrite) -> SerializeResult<()> {
    let name = render_name(Some(p.name.as_ref()))?;
    let value = render_value(Some(p.value.as_ref()))?;
    trace!("debug_print: PI name={}", name);
    writeln!(sink, "{indent}<?{name} {value}?>")?;
    Ok(())
}

fn render_name(name: Option<&dyn TypedValue>) -> SerializeResult<String> {
    let Some(name) = name else {
        return Ok(String::from("?"));
    };
    render_value(Some(name))
}

fn render_value(value: Option<&dyn TypedValue>) -> SerializeResult<String> {
    let Some(value) = value else {
        return Ok(String::new());
    };
    let len = value.utf8_len(0).map_err(TagError::from)?;
    let mut buf = vec![0u8; len];
    value.write_utf8(0, &mut buf).map_err(TagError::from)?;
    buf.pop();
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bxml_value::BxmlValue;
    use crate::tag::TagBuilder;

    fn utf16str(s: &str) -> Box<dyn TypedValue> {
        Box::new(BxmlValue::Utf16Str(s.to_string()))
    }

    #[test]
    fn prints_node_with_attribute_and_value() {
        crate::ensure_env_logger_initialized();
        let mut arena = TagArena::new();
        let root = TagBuilder::node(utf16str("Data"))
            .attribute(utf16str("Name"), utf16str("Id"))
            .value(utf16str("42"))
            .finish(&mut arena)
            .unwrap();
        let mut out = String::new();
        arena.debug_print(root, 0, &mut out).unwrap();
        assert!(out.contains("<Data"));
        assert!(out.contains("@Name=\"Id\""));
        assert!(out.contains("= \"42\""));
        assert!(out.contains("</Data>"));
    }

    #[test]
    fn prints_nested_children_indented() {
        crate::ensure_env_logger_initialized();
        let mut arena = TagArena::new();
        let child = TagBuilder::node(utf16str("B")).finish(&mut arena).unwrap();
        let root = TagBuilder::node(utf16str("A"))
            .child(child)
            .finish(&mut arena)
            .unwrap();
        let mut out = String::new();
        arena.debug_print(root, 0, &mut out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "<A>");
        assert_eq!(lines[1], "  <B>");
        assert_eq!(lines[2], "  </B>");
        assert_eq!(lines[3], "</A>");
    }

    #[test]
    fn reinserting_a_child_under_two_parents_fails() {
        let mut arena = TagArena::new();
        let child = TagBuilder::node(utf16str("B")).finish(&mut arena).unwrap();
        let _first_parent = TagBuilder::node(utf16str("A"))
            .child(child)
            .finish(&mut arena)
            .unwrap();
        let err = TagBuilder::node(utf16str("A2"))
            .child(child)
            .finish(&mut arena)
            .unwrap_err();
        assert!(matches!(err, TagError::AlreadyOwned(id) if id == child));
    }
}
