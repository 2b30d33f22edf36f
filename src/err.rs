use thiserror::Error;

use crate::tag::TagId;
use crate::value::ValueType;

/// Errors raised while building or navigating a [`crate::tag::TagArena`].
#[derive(Debug, Error)]
pub enum TagError {
    #[error("tag {0:?} is not present in the arena")]
    InvalidTagId(TagId),

    #[error("expected a tag of kind `{expected}` for `{op}`")]
    WrongKind {
        expected: &'static str,
        op: &'static str,
    },

    #[error("name lookup requires a UTF-16 string name, found `{found:?}`")]
    UnsupportedNameType { found: ValueType },

    #[error("attribute tag has no value set")]
    AttributeMissingValue,

    #[error("tag {0:?} is a Node/Pi but has no name set")]
    MissingName(TagId),

    #[error("tag {0:?} is already owned as an attribute or child of another tag")]
    AlreadyOwned(TagId),

    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Errors a [`crate::value::TypedValue`] implementation may report when asked
/// for a size or text rendering of one of its entries.
#[derive(Debug, Error)]
pub enum ValueError {
    #[error("entry index {index} out of range (value has {entry_count} entries)")]
    EntryOutOfRange { index: usize, entry_count: usize },

    #[error("value of type `{found:?}` cannot be used where a name is required")]
    WrongType { found: ValueType },

    #[error("failed to copy entry {index} text into the destination buffer")]
    CopyFailed { index: usize },
}

/// Errors raised by the two-pass size/emit serializer and its convenience
/// wrappers.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("output buffer too small: need at least {needed} code units, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error(transparent)]
    Tag(#[from] TagError),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("debug sink rejected a write")]
    Fmt(#[from] std::fmt::Error),

    #[error("writing XML failed")]
    Xml(#[from] quick_xml::Error),

    #[error("writing to the underlying sink failed")]
    Io(#[from] std::io::Error),
}

pub type TagResult<T> = Result<T, TagError>;
pub type ValueResult<T> = Result<T, ValueError>;
pub type SerializeResult<T> = Result<T, SerializeError>;
