//! The Tag tree: an arena of nodes addressed by index, mirroring the
//! reference crate's `IrArena`/`ElementId` pattern but owning plain Rust
//! values instead of borrowing from a parsed byte buffer.

use std::collections::HashSet;

use crate::err::{TagError, TagResult};
use crate::value::{NameNeedle, TypedValue, ValueType};

/// An index into a [`TagArena`]. Opaque outside this crate except for
/// equality/ordering, matching the reference crate's `ElementId = usize`
/// newtype-free style, but wrapped here so a `TagId` from one arena can
/// never be mistaken for a raw index into something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagId(usize);

impl TagId {
    fn index(self) -> usize {
        self.0
    }
}

/// A Node tag: an XML element. `attributes` and `children` are themselves
/// `TagId`s pointing at Node-kind tags (attributes) or arbitrary tags
/// (children).
pub struct NodeTag {
    pub name: Option<Box<dyn TypedValue>>,
    pub value: Option<Box<dyn TypedValue>>,
    pub attributes: Vec<TagId>,
    pub children: Vec<TagId>,
}

/// A CData tag: a `<![CDATA[ ... ]]>` payload. Has no name, attributes, or
/// children by construction.
pub struct CDataTag {
    pub value: Box<dyn TypedValue>,
}

/// A processing-instruction tag: `<?target body?>`.
pub struct PiTag {
    pub name: Box<dyn TypedValue>,
    pub value: Box<dyn TypedValue>,
}

/// A single node in the tree. The three kinds are distinct variants rather
/// than a shared struct with a kind discriminant, so a CData tag simply has
/// no attribute/children fields to misuse.
pub enum Tag {
    Node(NodeTag),
    CData(CDataTag),
    Pi(PiTag),
}

impl Tag {
    /// The kind name, used in `TagError::WrongKind` messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Tag::Node(_) => "Node",
            Tag::CData(_) => "CData",
            Tag::Pi(_) => "Pi",
        }
    }

    pub fn as_node(&self) -> Option<&NodeTag> {
        match self {
            Tag::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut NodeTag> {
        match self {
            Tag::Node(n) => Some(n),
            _ => None,
        }
    }

    /// The tag's own name, if it has one (Node and Pi; CData never does).
    pub fn name(&self) -> Option<&dyn TypedValue> {
        match self {
            Tag::Node(n) => n.name.as_deref(),
            Tag::CData(_) => None,
            Tag::Pi(p) => Some(p.name.as_ref()),
        }
    }

    /// The tag's own value/content, if any.
    pub fn value(&self) -> Option<&dyn TypedValue> {
        match self {
            Tag::Node(n) => n.value.as_deref(),
            Tag::CData(c) => Some(c.value.as_ref()),
            Tag::Pi(p) => Some(p.value.as_ref()),
        }
    }
}

/// Owns every `Tag` in a tree (or forest). Dropping the arena drops every
/// tag it owns in one pass — there is no per-node free bookkeeping and no
/// possibility of a use-after-free, unlike the bottom-up manual free the
/// reference C source performs.
#[derive(Default)]
pub struct TagArena {
    tags: Vec<Tag>,
    /// Ids already referenced as someone's attribute or child. Checked by
    /// [`Self::append_attribute`], [`Self::append_child`], and
    /// [`TagBuilder::finish`] so a tag can never end up owned by two
    /// parents.
    owned: HashSet<TagId>,
}

impl TagArena {
    pub fn new() -> Self {
        TagArena {
            tags: Vec::new(),
            owned: HashSet::new(),
        }
    }

    /// Record `id` as owned, failing if it is already spoken for.
    fn claim(&mut self, id: TagId) -> TagResult<()> {
        if !self.owned.insert(id) {
            return Err(TagError::AlreadyOwned(id));
        }
        Ok(())
    }

    /// Insert a fully-built tag and return its id. Used by [`TagBuilder::finish`];
    /// exposed directly for callers assembling tags without the builder.
    pub fn insert(&mut self, tag: Tag) -> TagId {
        let id = TagId(self.tags.len());
        self.tags.push(tag);
        id
    }

    pub fn get(&self, id: TagId) -> TagResult<&Tag> {
        self.tags.get(id.index()).ok_or(TagError::InvalidTagId(id))
    }

    pub fn get_mut(&mut self, id: TagId) -> TagResult<&mut Tag> {
        self.tags
            .get_mut(id.index())
            .ok_or(TagError::InvalidTagId(id))
    }

    fn require_node_mut(&mut self, id: TagId, op: &'static str) -> TagResult<&mut NodeTag> {
        let tag = self.get_mut(id)?;
        tag.as_node_mut().ok_or(TagError::WrongKind {
            expected: "Node",
            op,
        })
    }

    /// Append `attr_id` to `parent`'s attribute list. `parent` must be a
    /// Node tag, and `attr_id` must itself name a Node tag (the attribute's
    /// name/value pair).
    pub fn append_attribute(&mut self, parent: TagId, attr_id: TagId) -> TagResult<()> {
        let attr_is_node = self.get(attr_id)?.as_node().is_some();
        if !attr_is_node {
            return Err(TagError::WrongKind {
                expected: "Node",
                op: "append_attribute (attribute tag)",
            });
        }
        if self.get(parent)?.as_node().is_none() {
            return Err(TagError::WrongKind {
                expected: "Node",
                op: "append_attribute",
            });
        }
        self.claim(attr_id)?;
        let node = self.require_node_mut(parent, "append_attribute")?;
        node.attributes.push(attr_id);
        Ok(())
    }

    /// Append `child_id` to `parent`'s child list. `parent` must be a Node
    /// tag; the child may be any kind.
    pub fn append_child(&mut self, parent: TagId, child_id: TagId) -> TagResult<()> {
        if self.get(parent)?.as_node().is_none() {
            return Err(TagError::WrongKind {
                expected: "Node",
                op: "append_child",
            });
        }
        self.claim(child_id)?;
        let node = self.require_node_mut(parent, "append_child")?;
        node.children.push(child_id);
        Ok(())
    }

    /// Search `parent`'s attributes for one whose name case-insensitively
    /// matches `needle`.
    pub fn find_attribute(&self, parent: TagId, needle: &NameNeedle<'_>) -> TagResult<Option<TagId>> {
        let node = self
            .get(parent)?
            .as_node()
            .ok_or(TagError::WrongKind {
                expected: "Node",
                op: "find_attribute",
            })?;
        self.find_by_name(&node.attributes, needle)
    }

    /// Search `parent`'s children for one whose name case-insensitively
    /// matches `needle`.
    pub fn find_child(&self, parent: TagId, needle: &NameNeedle<'_>) -> TagResult<Option<TagId>> {
        let node = self
            .get(parent)?
            .as_node()
            .ok_or(TagError::WrongKind {
                expected: "Node",
                op: "find_child",
            })?;
        self.find_by_name(&node.children, needle)
    }

    fn find_by_name(&self, candidates: &[TagId], needle: &NameNeedle<'_>) -> TagResult<Option<TagId>> {
        for &id in candidates {
            let tag = self.get(id)?;
            let Some(name) = tag.name() else {
                continue;
            };
            if name_matches(name, needle)? {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}

/// Compares a stored name against a search needle per the case-insensitive,
/// trailing-NUL-trimmed matching rules: the stored name must be a UTF-16
/// string value; both streams are folded to Unicode uppercase code point by
/// code point and compared for exact, simultaneous exhaustion.
fn name_matches(name: &dyn TypedValue, needle: &NameNeedle<'_>) -> TagResult<bool> {
    if name.value_type() != ValueType::Utf16Str {
        return Err(TagError::UnsupportedNameType {
            found: name.value_type(),
        });
    }

    let len = name.utf16_len(0)?;
    let mut buf = vec![0u16; len];
    name.write_utf16(0, &mut buf)?;
    // write_utf16 includes a trailing NUL; trim exactly one if present.
    if buf.last() == Some(&0) {
        buf.pop();
    }
    let stored = char::decode_utf16(buf.iter().copied()).filter_map(Result::ok);

    match needle {
        NameNeedle::Utf8(s) => Ok(iters_eq(fold_chars(stored), fold_chars(s.chars()))),
        NameNeedle::Utf16(units) => {
            let mut units = units.to_vec();
            if units.last() == Some(&0) {
                units.pop();
            }
            let needle_chars = char::decode_utf16(units.into_iter()).filter_map(Result::ok);
            Ok(iters_eq(fold_chars(stored), fold_chars(needle_chars)))
        }
    }
}

fn fold_chars(chars: impl Iterator<Item = char>) -> impl Iterator<Item = char> {
    chars.flat_map(char::to_uppercase)
}

fn iters_eq(mut a: impl Iterator<Item = char>, mut b: impl Iterator<Item = char>) -> bool {
    loop {
        match (a.next(), b.next()) {
            (Some(x), Some(y)) => {
                if x != y {
                    return false;
                }
            }
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Builds a single tag (and, for attributes added via [`Self::attribute`],
/// the attribute's backing Node tags) and inserts it into an arena.
pub enum TagBuilder {
    Node {
        name: Option<Box<dyn TypedValue>>,
        value: Option<Box<dyn TypedValue>>,
        attributes: Vec<(Box<dyn TypedValue>, Box<dyn TypedValue>)>,
        children: Vec<TagId>,
    },
    CData {
        value: Box<dyn TypedValue>,
    },
    Pi {
        name: Box<dyn TypedValue>,
        value: Box<dyn TypedValue>,
    },
}

impl TagBuilder {
    pub fn node(name: Box<dyn TypedValue>) -> Self {
        TagBuilder::Node {
            name: Some(name),
            value: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn cdata(value: Box<dyn TypedValue>) -> Self {
        TagBuilder::CData { value }
    }

    pub fn pi(name: Box<dyn TypedValue>, value: Box<dyn TypedValue>) -> Self {
        TagBuilder::Pi { name, value }
    }

    /// Set this Node's content value. Per the "value wins over children"
    /// invariant, a tag with a value set renders its text content and
    /// ignores any children appended via [`Self::child`].
    pub fn value(mut self, value: Box<dyn TypedValue>) -> Self {
        if let TagBuilder::Node { value: slot, .. } = &mut self {
            *slot = Some(value);
        }
        self
    }

    /// Append an attribute name/value pair. Only valid on a Node builder;
    /// ignored (a no-op) otherwise, since `TagBuilder` has no fallible
    /// builder-chain surface — callers build CData/Pi tags without
    /// attributes by construction.
    pub fn attribute(mut self, name: Box<dyn TypedValue>, value: Box<dyn TypedValue>) -> Self {
        if let TagBuilder::Node { attributes, .. } = &mut self {
            attributes.push((name, value));
        }
        self
    }

    /// Append an already-inserted tag as a child. Only valid on a Node
    /// builder. Whether `id` is already owned elsewhere isn't known until
    /// the arena is consulted, so this is checked in [`Self::finish`]
    /// instead of here.
    pub fn child(mut self, id: TagId) -> Self {
        if let TagBuilder::Node { children, .. } = &mut self {
            children.push(id);
        }
        self
    }

    /// Insert the built tag (and any attribute tags it owns) into `arena`,
    /// returning the new tag's id. Fails with `TagError::AlreadyOwned` if
    /// any id passed to [`Self::child`] is already attached elsewhere in
    /// the arena — this is the point where ownership of caller-supplied
    /// children is actually established, so it's also where the check
    /// lives.
    pub fn finish(self, arena: &mut TagArena) -> TagResult<TagId> {
        match self {
            TagBuilder::Node {
                name,
                value,
                attributes,
                children,
            } => {
                let mut attribute_ids = Vec::with_capacity(attributes.len());
                for (name, value) in attributes {
                    let id = arena.insert(Tag::Node(NodeTag {
                        name: Some(name),
                        value: Some(value),
                        attributes: Vec::new(),
                        children: Vec::new(),
                    }));
                    // Freshly minted ids can never already be owned.
                    arena.owned.insert(id);
                    attribute_ids.push(id);
                }
                for &id in &children {
                    arena.claim(id)?;
                }
                Ok(arena.insert(Tag::Node(NodeTag {
                    name,
                    value,
                    attributes: attribute_ids,
                    children,
                })))
            }
            TagBuilder::CData { value } => Ok(arena.insert(Tag::CData(CDataTag { value }))),
            TagBuilder::Pi { name, value } => Ok(arena.insert(Tag::Pi(PiTag { name, value }))),
        }
    }
}
