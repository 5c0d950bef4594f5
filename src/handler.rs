//! Handlers turn a value into a tag and a representation.
//!
//! A handler is bound to exactly one [`TypeKey`][crate::TypeKey] in a
//! [`HandlerRegistry`][crate::HandlerRegistry]. The tag names the value's semantic type on the
//! wire; the representation is another [`Value`] built only from types that can already be
//! written. Handlers for scalar extension types also provide a string form, which is what ends up
//! on the wire whenever a string is required (map keys, or a backend that prefers strings).
//!
//! To add a type of your own, wrap it with [`Value::ext`] and register a handler under
//! [`TypeKey::of`][crate::TypeKey::of]:
//!
//! ```
//! use std::borrow::Cow;
//! use std::sync::Arc;
//! use transit_pack::*;
//!
//! #[derive(Debug)]
//! struct Point { x: i64, y: i64 }
//!
//! #[derive(Debug)]
//! struct PointHandler;
//!
//! impl Handler for PointHandler {
//!     fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
//!         Ok(Cow::Borrowed("point"))
//!     }
//!
//!     fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
//!         let p = v.downcast_ext::<Point>().ok_or_else(|| handler::mismatch("point", v))?;
//!         Ok(Cow::Owned(Value::Array(vec![p.x.into(), p.y.into()])))
//!     }
//! }
//!
//! let mut options = WriterOptions::default();
//! options.custom_handlers.push((TypeKey::of::<Point>(), Arc::new(PointHandler)));
//! let out = to_vec_with(&Value::ext(Point { x: 1, y: 2 }), options).unwrap();
//! assert_eq!(out, br#"["~#point",1,2]"#);
//! ```

use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{Error, Result};
use crate::types::LinkRender;
use crate::value::Value;

/// Tag for null.
pub const TAG_NULL: &str = "_";
/// Tag for booleans.
pub const TAG_BOOL: &str = "?";
/// Tag for strings.
pub const TAG_STRING: &str = "s";
/// Tag for bounded integers.
pub const TAG_INT: &str = "i";
/// Tag for floating-point numbers.
pub const TAG_FLOAT: &str = "d";
pub const TAG_BIG_INT: &str = "n";
pub const TAG_DECIMAL: &str = "f";
pub const TAG_CHAR: &str = "c";
pub const TAG_KEYWORD: &str = ":";
pub const TAG_SYMBOL: &str = "$";
pub const TAG_BINARY: &str = "b";
pub const TAG_UUID: &str = "u";
pub const TAG_URI: &str = "r";
/// Compact instant: milliseconds since the epoch.
pub const TAG_TIME: &str = "m";
/// Verbose instant: ISO-8601 text.
pub const TAG_VERBOSE_TIME: &str = "t";
/// Non-finite floats in the text backend.
pub const TAG_SPECIAL_NUMBER: &str = "z";
pub const TAG_QUOTE: &str = "'";
pub const TAG_MAP: &str = "map";
pub const TAG_CMAP: &str = "cmap";
pub const TAG_ARRAY: &str = "array";
pub const TAG_SET: &str = "set";
pub const TAG_RATIO: &str = "ratio";
pub const TAG_LINK: &str = "link";
pub const TAG_SHORTS: &str = "shorts";
pub const TAG_INTS: &str = "ints";
pub const TAG_LONGS: &str = "longs";
pub const TAG_FLOATS: &str = "floats";
pub const TAG_DOUBLES: &str = "doubles";
pub const TAG_BOOLS: &str = "bools";
pub const TAG_CHARS: &str = "chars";

/// True for the tags the backends write as native primitives.
pub fn is_ground_tag(tag: &str) -> bool {
    matches!(tag, TAG_NULL | TAG_BOOL | TAG_STRING | TAG_INT | TAG_FLOAT)
}

/// Encoding strategy for one exact value type.
pub trait Handler: Debug + Send + Sync {
    /// The wire tag for this value.
    fn tag<'a>(&self, v: &'a Value) -> Result<Cow<'a, str>>;

    /// The value to write in place of `v`, built from already-encodable types.
    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>>;

    /// Text form for scalar extension types, used wherever a string must be written instead of
    /// the representation.
    fn string_rep(&self, _v: &Value) -> Option<String> {
        None
    }

    /// Alternate handler for verbose output, if this type reads differently there.
    fn verbose_handler(&self) -> Option<Arc<dyn Handler>> {
        None
    }
}

/// Error for a handler handed a value it wasn't written for. Usually means the handler was
/// registered under the wrong key.
pub fn mismatch(handler: &str, v: &Value) -> Error {
    Error::MalformedHandlerOutput(format!(
        "{} handler can't encode a value of type {}",
        handler,
        v.type_name()
    ))
}

#[derive(Debug)]
pub struct NullHandler;

impl Handler for NullHandler {
    fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(TAG_NULL))
    }

    fn rep<'a>(&self, _: &'a Value) -> Result<Cow<'a, Value>> {
        Ok(Cow::Owned(Value::Null))
    }

    fn string_rep(&self, _: &Value) -> Option<String> {
        Some(String::new())
    }
}

#[derive(Debug)]
pub struct BoolHandler;

impl Handler for BoolHandler {
    fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(TAG_BOOL))
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        match v {
            Value::Bool(_) => Ok(Cow::Borrowed(v)),
            _ => Err(mismatch("bool", v)),
        }
    }

    fn string_rep(&self, v: &Value) -> Option<String> {
        match v {
            Value::Bool(true) => Some("t".to_string()),
            Value::Bool(false) => Some("f".to_string()),
            _ => None,
        }
    }
}

/// Strings go out as themselves. The emitter adds the escape for strings that look like tags.
#[derive(Debug)]
pub struct StringHandler;

impl Handler for StringHandler {
    fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(TAG_STRING))
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        match v {
            Value::Str(_) => Ok(Cow::Borrowed(v)),
            _ => Err(mismatch("string", v)),
        }
    }

    fn string_rep(&self, v: &Value) -> Option<String> {
        v.as_str().map(|s| s.to_string())
    }
}

#[derive(Debug)]
pub struct IntegerHandler;

impl Handler for IntegerHandler {
    fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(TAG_INT))
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        match v {
            Value::Int(_) => Ok(Cow::Borrowed(v)),
            _ => Err(mismatch("integer", v)),
        }
    }

    fn string_rep(&self, v: &Value) -> Option<String> {
        v.as_int().map(|i| i.to_string())
    }
}

/// Both float widths share this handler.
#[derive(Debug)]
pub struct FloatHandler;

impl Handler for FloatHandler {
    fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(TAG_FLOAT))
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        match v {
            Value::F32(_) | Value::F64(_) => Ok(Cow::Borrowed(v)),
            _ => Err(mismatch("float", v)),
        }
    }

    fn string_rep(&self, v: &Value) -> Option<String> {
        match *v {
            Value::F32(f) => Some(f.to_string()),
            Value::F64(f) => Some(f.to_string()),
            _ => None,
        }
    }
}

/// Handler for every type whose representation is just its text: big integers, decimals, chars,
/// keywords, symbols, URIs and UUIDs.
#[derive(Debug)]
pub struct ToStringHandler {
    tag: &'static str,
}

impl ToStringHandler {
    pub fn new(tag: &'static str) -> Self {
        Self { tag }
    }
}

impl Handler for ToStringHandler {
    fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(self.tag))
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        self.string_rep(v)
            .map(|s| Cow::Owned(Value::Str(s)))
            .ok_or_else(|| mismatch(self.tag, v))
    }

    fn string_rep(&self, v: &Value) -> Option<String> {
        match v {
            Value::BigInt(n) => Some(n.to_string()),
            Value::Decimal(d) => Some(d.to_string()),
            Value::Char(c) => Some(c.to_string()),
            Value::Keyword(k) => Some(k.as_str().to_string()),
            Value::Symbol(s) => Some(s.as_str().to_string()),
            Value::Uri(u) => Some(u.as_str().to_string()),
            Value::Uuid(u) => Some(u.hyphenated().to_string()),
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

/// Binary blobs, as base64 text.
#[derive(Debug)]
pub struct BinaryHandler;

impl Handler for BinaryHandler {
    fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(TAG_BINARY))
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        self.string_rep(v)
            .map(|s| Cow::Owned(Value::Str(s)))
            .ok_or_else(|| mismatch("binary", v))
    }

    fn string_rep(&self, v: &Value) -> Option<String> {
        match v {
            Value::Bin(bytes) => Some(STANDARD.encode(bytes)),
            _ => None,
        }
    }
}

/// Generic ordered maps. Whether the map goes out natively or as `cmap` depends on its keys,
/// which the emitter decides.
#[derive(Debug)]
pub struct MapHandler;

impl Handler for MapHandler {
    fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(TAG_MAP))
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        match v {
            Value::Map(_) => Ok(Cow::Borrowed(v)),
            _ => Err(mismatch("map", v)),
        }
    }
}

#[derive(Debug)]
pub struct ArrayHandler;

impl Handler for ArrayHandler {
    fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(TAG_ARRAY))
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        match v {
            Value::Array(_) => Ok(Cow::Borrowed(v)),
            _ => Err(mismatch("array", v)),
        }
    }
}

/// Arrays of one primitive element type. Each element type has its own tag. The value is its own
/// representation; the emitter writes the elements one at a time.
#[derive(Debug)]
pub struct PrimitiveArrayHandler {
    tag: &'static str,
}

impl PrimitiveArrayHandler {
    pub fn new(tag: &'static str) -> Self {
        Self { tag }
    }
}

impl Handler for PrimitiveArrayHandler {
    fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(self.tag))
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        match v {
            Value::Shorts(_)
            | Value::Ints(_)
            | Value::Longs(_)
            | Value::Floats(_)
            | Value::Doubles(_)
            | Value::Bools(_)
            | Value::Chars(_) => Ok(Cow::Borrowed(v)),
            _ => Err(mismatch(self.tag, v)),
        }
    }
}

/// Sets are written in place as a tagged sequence, like the primitive arrays.
#[derive(Debug)]
pub struct SetHandler;

impl Handler for SetHandler {
    fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(TAG_SET))
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        match v {
            Value::Set(_) => Ok(Cow::Borrowed(v)),
            _ => Err(mismatch("set", v)),
        }
    }
}

/// Instants as milliseconds since the epoch. Reads as ISO-8601 text in verbose output.
#[derive(Debug)]
pub struct TimeHandler;

impl Handler for TimeHandler {
    fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(TAG_TIME))
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        match v {
            Value::Timestamp(t) => Ok(Cow::Owned(Value::from(t.timestamp_millis()))),
            _ => Err(mismatch("time", v)),
        }
    }

    fn string_rep(&self, v: &Value) -> Option<String> {
        match v {
            Value::Timestamp(t) => Some(t.timestamp_millis().to_string()),
            _ => None,
        }
    }

    fn verbose_handler(&self) -> Option<Arc<dyn Handler>> {
        Some(Arc::new(VerboseTimeHandler))
    }
}

#[derive(Debug)]
pub struct VerboseTimeHandler;

impl Handler for VerboseTimeHandler {
    fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(TAG_VERBOSE_TIME))
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        match v {
            Value::Timestamp(t) => t.to_iso8601().map(|s| Cow::Owned(Value::Str(s))).ok_or_else(
                || {
                    Error::MalformedHandlerOutput(format!(
                        "timestamp out of calendar range ({})",
                        t
                    ))
                },
            ),
            _ => Err(mismatch("verbose time", v)),
        }
    }

    fn string_rep(&self, v: &Value) -> Option<String> {
        match v {
            Value::Timestamp(t) => t.to_iso8601(),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct RatioHandler;

impl Handler for RatioHandler {
    fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(TAG_RATIO))
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        match v {
            Value::Ratio(r) => Ok(Cow::Owned(Value::Array(vec![
                Value::BigInt(r.numerator().clone()),
                Value::BigInt(r.denominator().clone()),
            ]))),
            _ => Err(mismatch("ratio", v)),
        }
    }
}

#[derive(Debug)]
pub struct LinkHandler;

impl Handler for LinkHandler {
    fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(TAG_LINK))
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        let link = match v {
            Value::Link(link) => link,
            _ => return Err(mismatch("link", v)),
        };
        let mut map = vec![
            (Value::from("href"), Value::Uri(link.href.clone())),
            (Value::from("rel"), Value::from(link.rel.as_str())),
        ];
        if let Some(ref name) = link.name {
            map.push((Value::from("name"), Value::from(name.as_str())));
        }
        if let Some(ref prompt) = link.prompt {
            map.push((Value::from("prompt"), Value::from(prompt.as_str())));
        }
        if let Some(render) = link.render {
            map.push((Value::from("render"), Value::from(LinkRender::as_str(&render))));
        }
        Ok(Cow::Owned(Value::Map(map)))
    }
}

/// Quoted values go out bare; the emitter never wraps them.
#[derive(Debug)]
pub struct QuoteHandler;

impl Handler for QuoteHandler {
    fn tag<'a>(&self, _: &'a Value) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(TAG_QUOTE))
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        match v {
            Value::Quote(inner) => Ok(Cow::Borrowed(&**inner)),
            _ => Err(mismatch("quote", v)),
        }
    }
}

#[derive(Debug)]
pub struct TaggedValueHandler;

impl Handler for TaggedValueHandler {
    fn tag<'a>(&self, v: &'a Value) -> Result<Cow<'a, str>> {
        match v {
            Value::Tagged(t) => Ok(Cow::Borrowed(t.tag.as_str())),
            _ => Err(mismatch("tagged value", v)),
        }
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        match v {
            Value::Tagged(t) => Ok(Cow::Borrowed(&*t.rep)),
            _ => Err(mismatch("tagged value", v)),
        }
    }

    fn string_rep(&self, v: &Value) -> Option<String> {
        match v {
            Value::Tagged(t) => t.rep.as_str().map(|s| s.to_string()),
            _ => None,
        }
    }
}

/// Default catch-all. Refuses everything, naming the type that had no handler.
#[derive(Debug)]
pub struct UnsupportedHandler;

impl Handler for UnsupportedHandler {
    fn tag<'a>(&self, v: &'a Value) -> Result<Cow<'a, str>> {
        Err(Error::UnregisteredType(v.type_name().to_string()))
    }

    fn rep<'a>(&self, v: &'a Value) -> Result<Cow<'a, Value>> {
        Err(Error::UnregisteredType(v.type_name().to_string()))
    }
}
