//! transit-pack writes structured values in a self-describing format that any reader sharing the
//! same tag vocabulary can reconstruct, without a schema. It goes over two wire syntaxes: JSON
//! text and MessagePack binary.
//!
//! Beyond what JSON and msgpack carry natively, it provides:
//!
//! - Rich value types, each under a short tag: arbitrary-precision integers and decimals,
//!     characters, keywords, symbols, binary blobs, UUIDs, URIs, instants, sets, ratios, links,
//!     and arrays of primitive elements.
//! - Caller-defined types. Wrap a value with [`Value::ext`] and register a [`Handler`] for its
//!     exact type; the handler decides the tag and the representation.
//! - Unambiguous strings. A string that happens to look like a tag or a cache code is escaped,
//!     so a reader never mistakes it for one.
//! - A per-message string cache. Repeated map keys and tags are replaced by short codes after
//!     their first appearance. Every message starts with a fresh cache, so messages never depend
//!     on one another.
//! - A verbose text form for humans: no cache codes, every tagged value spelled out as a map,
//!     and instants as ISO-8601 text.
//!
//! Writing is a single call:
//!
//! ```
//! use transit_pack::*;
//!
//! let value = Value::map(vec![
//!     (Value::keyword("name"), Value::from("transit")),
//!     (Value::keyword("tags"), Value::Set(vec![Value::from(1), Value::from(2)])),
//! ]);
//! let out = to_vec(&value, Format::TextCompact).unwrap();
//! assert_eq!(out, br#"{"~:name":"transit","~:tags":["~#set",1,2]}"#);
//! ```
//!
//! Lookup is by exact type only. A handler registered for one type is never used for another,
//! and values with no handler of their own fall to the catch-all entry under [`TypeKey::Any`],
//! which by default refuses them with [`Error::UnregisteredType`].

mod depth_tracking;
mod emitter;
mod error;
mod integer;
mod marker;
mod registry;
mod timestamp;
mod types;
mod value;
mod writer;

pub mod backend;
pub mod cache;
pub mod handler;

#[cfg(test)]
mod testing;

pub use self::cache::WriteCache;
pub use self::error::{Error, Result, WriteError};
pub use self::handler::Handler;
pub use self::integer::Integer;
pub use self::registry::HandlerRegistry;
pub use self::timestamp::Timestamp;
pub use self::types::*;
pub use self::value::{Ext, Extension, TypeKey, Value};
pub use self::writer::{
    create_writer, to_vec, to_vec_with, Format, UnknownFormat, Writer, WriterOptions, MAX_DEPTH,
};
