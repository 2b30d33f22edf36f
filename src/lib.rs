//! A Tag tree data model and two-pass XML serializer for Windows Event Log
//! (EVTX) Binary XML (BXML) records.
//!
//! This crate owns the decoded side of the pipeline: an arena of [`Tag`]
//! values built up by a caller (typically a BXML byte-stream decoder, which
//! is out of scope here) and a size-then-write serializer that renders a
//! tag tree back out as well-formed XML text, in UTF-8 or UTF-16.
//!
//! - [`tag`] — the arena ([`TagArena`]), the tag kinds ([`Tag`], [`NodeTag`],
//!   [`CDataTag`], [`PiTag`]), and [`TagBuilder`] for assembling one.
//! - [`value`] — the [`TypedValue`] contract a tag's name/value fields
//!   implement.
//! - [`bxml_value`] — [`BxmlValue`], a concrete `TypedValue` covering the
//!   BXML scalar and array value types.
//! - [`serialize`] — the two-pass `size_of`/`write_into` ABI, plus an
//!   optional `quick-xml`-backed convenience layer in
//!   [`serialize::xml_convenience`].
//! - [`config`] — [`SerializerConfig`], the serializer's formatting knobs.
//! - [`err`] — the crate's `thiserror`-derived error taxonomy.
//! - [`debug_print`] — an unbuffered diagnostic rendering via `log::trace!`.

pub mod bxml_value;
pub mod config;
pub mod debug_print;
pub mod err;
pub mod serialize;
pub mod tag;
pub mod value;

pub use bxml_value::BxmlValue;
pub use config::SerializerConfig;
pub use err::{SerializeError, SerializeResult, TagError, TagResult, ValueError, ValueResult};
pub use serialize::{CodeUnit, size_of, write_into};
pub use tag::{CDataTag, NodeTag, PiTag, Tag, TagArena, TagBuilder, TagId};
pub use value::{NameNeedle, TypedValue, ValueType};

#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

/// Tests run concurrently; `env_logger::init()` panics if called more than
/// once per process, so tests that want logging go through this instead.
#[cfg(test)]
pub(crate) fn ensure_env_logger_initialized() {
    LOGGER_INIT.call_once(|| {
        let _ = env_logger::try_init();
    });
}
