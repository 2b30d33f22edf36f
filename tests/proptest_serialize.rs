//! Property-based checks of the two-pass ABI over randomly generated tag
//! trees (SPEC_FULL.md §8, invariants 1-5 and 9).

use evtx_bxml::bxml_value::BxmlValue;
use evtx_bxml::config::SerializerConfig;
use evtx_bxml::serialize::{size_of, write_into};
use evtx_bxml::tag::{TagArena, TagBuilder, TagId};
use evtx_bxml::value::TypedValue;
use proptest::prelude::*;

/// Either plain text or a FILETIME/SYSTEMTIME-ish timestamp, so generated
/// trees exercise both the ordinary string path and the trailing-`Z`
/// rendering path.
#[derive(Debug, Clone)]
enum ValueSpec {
    Text(String),
    Time(String),
}

#[derive(Debug, Clone)]
enum TreeSpec {
    Leaf {
        name: String,
        attrs: Vec<(String, ValueSpec)>,
        text: Option<ValueSpec>,
    },
    Parent {
        name: String,
        attrs: Vec<(String, ValueSpec)>,
        children: Vec<TreeSpec>,
    },
}

fn ident() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9]{0,7}".prop_map(|s| s.to_string())
}

fn text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ]{0,12}".prop_map(|s| s.to_string())
}

/// An RFC 3339 instant, formatted so it parses cleanly as a `jiff::Timestamp`.
fn timestamp() -> impl Strategy<Value = String> {
    (1990i32..2030, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60).prop_map(
        |(year, month, day, hour, min, sec)| {
            format!("{year:04}-{month:02}-{day:02}T{hour:02}:{min:02}:{sec:02}Z")
        },
    )
}

fn value_spec() -> impl Strategy<Value = ValueSpec> {
    prop_oneof![
        text().prop_map(ValueSpec::Text),
        timestamp().prop_map(ValueSpec::Time),
    ]
}

fn attrs() -> impl Strategy<Value = Vec<(String, ValueSpec)>> {
    prop::collection::vec((ident(), value_spec()), 0..3)
}

fn tree_spec() -> impl Strategy<Value = TreeSpec> {
    let leaf = (ident(), attrs(), proptest::option::of(value_spec()))
        .prop_map(|(name, attrs, text)| TreeSpec::Leaf { name, attrs, text });

    leaf.prop_recursive(3, 16, 3, |inner| {
        (ident(), attrs(), prop::collection::vec(inner, 0..3))
            .prop_map(|(name, attrs, children)| TreeSpec::Parent {
                name,
                attrs,
                children,
            })
    })
}

fn value_of(spec: &ValueSpec) -> Box<dyn TypedValue> {
    match spec {
        ValueSpec::Text(s) => Box::new(BxmlValue::Utf16Str(s.clone())),
        // Alternate FILETIME/SysTime so both timestamp-typed variants get
        // exercised across a proptest run.
        ValueSpec::Time(s) => {
            let tm: jiff::Timestamp = s
                .parse()
                .expect("timestamp() only generates valid RFC3339 instants");
            if s.len() % 2 == 0 {
                Box::new(BxmlValue::FileTime(tm))
            } else {
                Box::new(BxmlValue::SysTime(tm))
            }
        }
    }
}

/// Renders the same "YYYY-MM-DD HH:MM:SS.nnnnnnnnnZ" text the serializer is
/// expected to produce for a FILETIME/SYSTEMTIME value, independent of the
/// crate's own (private) datetime formatting routine.
fn expected_timestamp_text(spec: &ValueSpec) -> Option<String> {
    let ValueSpec::Time(s) = spec else {
        return None;
    };
    let tm: jiff::Timestamp = s.parse().unwrap();
    let dt = jiff::tz::Offset::UTC.to_datetime(tm);
    Some(format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:09}Z",
        dt.year(),
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.subsec_nanosecond()
    ))
}

/// The attribute and child name order a single built node should appear
/// with in the rendered output, recorded as the tree is built so it can be
/// compared against what the `TreeSpec` actually asked for.
struct OrderMarks {
    attr_names: Vec<String>,
    child_names: Vec<String>,
}

/// Turns `name` into a globally unique marker so its position in the
/// rendered text can be found unambiguously later.
fn mark(name: &str, counter: &mut usize) -> String {
    let unique = format!("{name}_{counter}");
    *counter += 1;
    unique
}

fn build(
    arena: &mut TagArena,
    spec: &TreeSpec,
    counter: &mut usize,
    marks: &mut Vec<OrderMarks>,
) -> (TagId, String) {
    match spec {
        TreeSpec::Leaf { name, attrs, text } => {
            let unique_name = mark(name, counter);
            let mut attr_names = Vec::new();
            let mut builder = TagBuilder::node(utf16(&unique_name));
            for (k, v) in attrs {
                let unique_attr = mark(k, counter);
                attr_names.push(unique_attr.clone());
                builder = builder.attribute(utf16(&unique_attr), value_of(v));
            }
            if let Some(text) = text {
                builder = builder.value(value_of(text));
            }
            marks.push(OrderMarks {
                attr_names,
                child_names: Vec::new(),
            });
            (builder.finish(arena).unwrap(), unique_name)
        }
        TreeSpec::Parent {
            name,
            attrs,
            children,
        } => {
            let built_children: Vec<(TagId, String)> = children
                .iter()
                .map(|c| build(arena, c, counter, marks))
                .collect();
            let child_names: Vec<String> = built_children.iter().map(|(_, n)| n.clone()).collect();

            let unique_name = mark(name, counter);
            let mut attr_names = Vec::new();
            let mut builder = TagBuilder::node(utf16(&unique_name));
            for (k, v) in attrs {
                let unique_attr = mark(k, counter);
                attr_names.push(unique_attr.clone());
                builder = builder.attribute(utf16(&unique_attr), value_of(v));
            }
            for (id, _) in built_children {
                builder = builder.child(id);
            }
            marks.push(OrderMarks {
                attr_names,
                child_names,
            });
            (builder.finish(arena).unwrap(), unique_name)
        }
    }
}

fn utf16(s: &str) -> Box<dyn TypedValue> {
    Box::new(BxmlValue::Utf16Str(s.to_string()))
}

/// Asserts that, for every node recorded in `marks`, its attribute names
/// appear in the rendered text in the same order they were inserted, and
/// likewise for its children (invariant 5). Names are unique per `mark`, so
/// a plain `find` on each gives an unambiguous position.
fn assert_order_preserved(text: &str, marks: &[OrderMarks]) {
    for entry in marks {
        let mut last_pos = 0usize;
        for name in entry.attr_names.iter().chain(entry.child_names.iter()) {
            let pos = text
                .find(name.as_str())
                .expect("every marked name must appear in the rendered output");
            assert!(
                pos >= last_pos,
                "expected {name:?} to appear at or after position {last_pos}, found at {pos}"
            );
            last_pos = pos;
        }
    }
}

/// Every `ValueSpec` appearing anywhere in `spec` (attribute values and leaf
/// text), used by the invariant-9 check below.
fn spec_values(spec: &TreeSpec) -> Vec<ValueSpec> {
    let mut out = Vec::new();
    collect_values(spec, &mut out);
    out
}

fn collect_values(spec: &TreeSpec, out: &mut Vec<ValueSpec>) {
    match spec {
        TreeSpec::Leaf { attrs, text, .. } => {
            out.extend(attrs.iter().map(|(_, v)| v.clone()));
            if let Some(text) = text {
                out.push(text.clone());
            }
        }
        TreeSpec::Parent {
            attrs, children, ..
        } => {
            out.extend(attrs.iter().map(|(_, v)| v.clone()));
            for child in children {
                collect_values(child, out);
            }
        }
    }
}

proptest! {
    #[test]
    fn size_and_write_agree_for_random_trees(spec in tree_spec(), level in 0usize..3) {
        let mut arena = TagArena::new();
        let mut counter = 0usize;
        let mut marks = Vec::new();
        let (root, _) = build(&mut arena, &spec, &mut counter, &mut marks);
        let cfg = SerializerConfig::default();

        let size = size_of::<u8>(&arena, root, level, &cfg).unwrap();
        let mut buf = vec![0u8; size];
        let written = write_into::<u8>(&arena, root, level, &cfg, &mut buf).unwrap();
        prop_assert_eq!(written, size);

        // Invariant 2/3: an undersized buffer always fails without a panic,
        // an exactly-sized one always succeeds (already checked above).
        if size > 0 {
            let mut short = vec![0u8; size - 1];
            prop_assert!(write_into::<u8>(&arena, root, level, &cfg, &mut short).is_err());
        }

        // Invariant 4: repeating the call is pure.
        let mut buf2 = vec![0u8; size];
        write_into::<u8>(&arena, root, level, &cfg, &mut buf2).unwrap();
        prop_assert_eq!(&buf, &buf2);

        // Same check holds for the u16 instantiation.
        let size16 = size_of::<u16>(&arena, root, level, &cfg).unwrap();
        let mut buf16 = vec![0u16; size16];
        let written16 = write_into::<u16>(&arena, root, level, &cfg, &mut buf16).unwrap();
        prop_assert_eq!(written16, size16);

        let text = String::from_utf8(buf).unwrap();

        // Invariant 5: attribute/child order in the output matches the
        // order the tree was built in.
        assert_order_preserved(&text, &marks);

        // Invariant 9: every FILETIME/SYSTEMTIME entry renders with a
        // trailing `Z` right after its nanosecond digits.
        for value in spec_values(&spec) {
            if let Some(expected) = expected_timestamp_text(&value) {
                prop_assert!(
                    text.contains(&expected),
                    "expected timestamp rendering {expected:?} in output, got {text:?}"
                );
            }
        }
    }
}
