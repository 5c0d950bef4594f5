//! The recursive write protocol.
//!
//! Every value goes through the same steps: find its handler, ask it for a tag and a
//! representation, then write either a native token (ground tags, arrays, maps) or an extension
//! form. Extension forms are `~<tag><text>` strings for scalar tags that have a text form, and a
//! tagged wrapper around the representation otherwise:
//!
//! - compact, sequence representation: `["~#tag", e1, e2, ...]`
//! - compact, anything else: `{"~#tag": rep}`
//! - verbose: always `{"~#tag": rep}`
//!
//! Strings that reach the wire pass through the [`WriteCache`] on their way out.

use std::borrow::{Borrow, Cow};
use std::sync::Arc;

use crate::backend::Backend;
use crate::cache::{WriteCache, ESC, ESC_TAG, RESERVED, SUB};
use crate::depth_tracking::DepthTracker;
use crate::error::{Error, Result};
use crate::handler::*;
use crate::registry::HandlerRegistry;
use crate::value::{TypeKey, Value};
use crate::Integer;

const ESC_STR: &str = "~";

/// Prefix a plain string that would otherwise read as a tag, cache code, or reserved form.
pub fn escape(s: &str) -> Cow<'_, str> {
    match s.chars().next() {
        Some(ESC) | Some(SUB) | Some(RESERVED) => Cow::Owned(format!("{}{}", ESC, s)),
        _ => Cow::Borrowed(s),
    }
}

fn single_char(tag: &str) -> bool {
    let mut chars = tag.chars();
    chars.next().is_some() && chars.next().is_none()
}

#[derive(Debug)]
pub struct Emitter<B: Backend> {
    backend: B,
    registry: HandlerRegistry,
    verbose: bool,
    depth: DepthTracker,
}

impl<B: Backend> Emitter<B> {
    /// Build an emitter. A verbose emitter should be handed a registry from
    /// [`HandlerRegistry::verbose_view`] and a disabled cache.
    pub fn new(backend: B, registry: HandlerRegistry, verbose: bool, max_depth: usize) -> Self {
        Self {
            backend,
            registry,
            verbose,
            depth: DepthTracker::new(max_depth),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Drop state left behind by a write that failed partway.
    pub fn reset(&mut self) {
        self.depth.reset();
        self.backend.reset();
    }

    /// Write one value.
    pub fn emit(&mut self, v: &Value, as_map_key: bool, cache: &mut WriteCache) -> Result<()> {
        self.marshal(v, as_map_key, cache)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.backend.flush()?;
        Ok(())
    }

    fn marshal(&mut self, v: &Value, as_map_key: bool, cache: &mut WriteCache) -> Result<()> {
        self.depth.enter()?;
        let result = self.marshal_inner(v, as_map_key, cache);
        self.depth.leave();
        result
    }

    fn marshal_inner(&mut self, v: &Value, as_map_key: bool, cache: &mut WriteCache) -> Result<()> {
        let handler = Arc::clone(self.registry.lookup(v)?);
        let tag = handler.tag(v)?;
        let rep = handler.rep(v)?;

        // Explicitly tagged values never collapse into a ground token, whatever their tag.
        if v.type_key() == TypeKey::Tagged {
            return self.emit_encoded(&tag, &*handler, v, &rep, as_map_key, cache);
        }

        match &*tag {
            TAG_NULL => self.emit_null(as_map_key, cache),
            TAG_STRING => match *rep {
                Value::Str(ref s) => self.emit_string("", "", &escape(s), as_map_key, cache),
                _ => Err(bad_rep(&tag, &rep)),
            },
            TAG_BOOL => match *rep {
                Value::Bool(b) => self.emit_bool(b, as_map_key, cache),
                _ => Err(bad_rep(&tag, &rep)),
            },
            TAG_INT => match *rep {
                Value::Int(i) => self.emit_int(i, as_map_key, cache),
                _ => Err(bad_rep(&tag, &rep)),
            },
            TAG_FLOAT => match *rep {
                Value::F32(f) => self.emit_f32(f, as_map_key, cache),
                Value::F64(f) => self.emit_f64(f, as_map_key, cache),
                _ => Err(bad_rep(&tag, &rep)),
            },
            TAG_QUOTE => self.marshal(&rep, as_map_key, cache),
            TAG_ARRAY => match *rep {
                Value::Array(ref items) => self.emit_array(items, as_map_key, cache),
                _ => Err(bad_rep(&tag, &rep)),
            },
            TAG_MAP => match *rep {
                Value::Map(ref entries) => self.emit_map(entries, as_map_key, cache),
                _ => Err(bad_rep(&tag, &rep)),
            },
            _ => self.emit_encoded(&tag, &*handler, v, &rep, as_map_key, cache),
        }
    }

    // An extension value counts as two nesting levels, itself and its representation, whichever
    // form it takes on the wire.
    fn emit_encoded(
        &mut self,
        tag: &str,
        handler: &dyn Handler,
        v: &Value,
        rep: &Value,
        as_map_key: bool,
        cache: &mut WriteCache,
    ) -> Result<()> {
        self.depth.enter()?;
        let result = self.emit_encoded_inner(tag, handler, v, rep, as_map_key, cache);
        self.depth.leave();
        result
    }

    fn emit_encoded_inner(
        &mut self,
        tag: &str,
        handler: &dyn Handler,
        v: &Value,
        rep: &Value,
        as_map_key: bool,
        cache: &mut WriteCache,
    ) -> Result<()> {
        if single_char(tag) {
            if let Value::Str(ref s) = *rep {
                return self.emit_string(ESC_STR, tag, s, as_map_key, cache);
            }
            if self.backend.prefers_strings() || as_map_key {
                if let Some(s) = handler.string_rep(v) {
                    return self.emit_string(ESC_STR, tag, &s, as_map_key, cache);
                }
            }
        }
        if as_map_key {
            return Err(Error::MalformedHandlerOutput(format!(
                "{} value tagged '{}' can't be used as a map key",
                v.type_name(),
                tag
            )));
        }
        self.emit_tagged(tag, rep, cache)
    }

    fn emit_tagged(&mut self, tag: &str, rep: &Value, cache: &mut WriteCache) -> Result<()> {
        match (tag, rep) {
            (_, Value::Array(items)) if !self.verbose => {
                self.emit_tagged_seq(tag, items.len(), items, cache)
            }
            (TAG_SET, Value::Set(items)) => self.emit_tagged_seq(tag, items.len(), items, cache),
            (TAG_SHORTS, Value::Shorts(items)) => self.emit_primitives(tag, items, cache),
            (TAG_INTS, Value::Ints(items)) => self.emit_primitives(tag, items, cache),
            (TAG_LONGS, Value::Longs(items)) => self.emit_primitives(tag, items, cache),
            (TAG_FLOATS, Value::Floats(items)) => self.emit_primitives(tag, items, cache),
            (TAG_DOUBLES, Value::Doubles(items)) => self.emit_primitives(tag, items, cache),
            (TAG_BOOLS, Value::Bools(items)) => self.emit_primitives(tag, items, cache),
            (TAG_CHARS, Value::Chars(items)) => self.emit_primitives(tag, items, cache),
            _ => {
                self.backend.begin_map(1)?;
                self.emit_string(ESC_TAG, tag, "", true, cache)?;
                self.marshal_inner(rep, false, cache)?;
                self.backend.end_map()?;
                Ok(())
            }
        }
    }

    fn emit_primitives<T>(&mut self, tag: &str, items: &[T], cache: &mut WriteCache) -> Result<()>
    where
        T: Copy + Into<Value>,
    {
        let values = items.iter().map(|&x| -> Value { x.into() });
        self.emit_tagged_seq(tag, items.len(), values, cache)
    }

    // Writes a tagged sequence without building it as a `Value` first.
    fn emit_tagged_seq<I>(
        &mut self,
        tag: &str,
        len: usize,
        items: I,
        cache: &mut WriteCache,
    ) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Borrow<Value>,
    {
        if self.verbose {
            self.backend.begin_map(1)?;
            self.emit_string(ESC_TAG, tag, "", true, cache)?;
            self.backend.begin_array(len)?;
            for item in items {
                self.marshal(item.borrow(), false, cache)?;
            }
            self.backend.end_array()?;
            self.backend.end_map()?;
        } else {
            self.backend.begin_array(len + 1)?;
            self.emit_string(ESC_TAG, tag, "", false, cache)?;
            for item in items {
                self.marshal(item.borrow(), false, cache)?;
            }
            self.backend.end_array()?;
        }
        Ok(())
    }

    fn emit_string(
        &mut self,
        prefix: &str,
        tag: &str,
        s: &str,
        as_map_key: bool,
        cache: &mut WriteCache,
    ) -> Result<()> {
        let joined;
        let full = if prefix.is_empty() && tag.is_empty() {
            s
        } else {
            joined = format!("{}{}{}", prefix, tag, s);
            joined.as_str()
        };
        let out = cache.cache_write(full, as_map_key);
        self.backend.write_str(out)?;
        Ok(())
    }

    fn emit_null(&mut self, as_map_key: bool, cache: &mut WriteCache) -> Result<()> {
        if as_map_key {
            self.emit_string(ESC_STR, TAG_NULL, "", true, cache)
        } else {
            self.backend.write_null()?;
            Ok(())
        }
    }

    fn emit_bool(&mut self, v: bool, as_map_key: bool, cache: &mut WriteCache) -> Result<()> {
        if as_map_key {
            self.emit_string(ESC_STR, TAG_BOOL, if v { "t" } else { "f" }, true, cache)
        } else {
            self.backend.write_bool(v)?;
            Ok(())
        }
    }

    fn emit_int(&mut self, v: Integer, as_map_key: bool, cache: &mut WriteCache) -> Result<()> {
        if as_map_key || !self.backend.fits_native_int(v) {
            self.emit_string(ESC_STR, TAG_INT, &v.to_string(), as_map_key, cache)
        } else {
            self.backend.write_int(v)?;
            Ok(())
        }
    }

    fn emit_f32(&mut self, v: f32, as_map_key: bool, cache: &mut WriteCache) -> Result<()> {
        if as_map_key || !self.backend.fits_native_float(v as f64) {
            self.emit_float_string(v as f64, &v.to_string(), as_map_key, cache)
        } else {
            self.backend.write_f32(v)?;
            Ok(())
        }
    }

    fn emit_f64(&mut self, v: f64, as_map_key: bool, cache: &mut WriteCache) -> Result<()> {
        if as_map_key || !self.backend.fits_native_float(v) {
            self.emit_float_string(v, &v.to_string(), as_map_key, cache)
        } else {
            self.backend.write_f64(v)?;
            Ok(())
        }
    }

    fn emit_float_string(
        &mut self,
        v: f64,
        text: &str,
        as_map_key: bool,
        cache: &mut WriteCache,
    ) -> Result<()> {
        if v.is_nan() {
            self.emit_string(ESC_STR, TAG_SPECIAL_NUMBER, "NaN", as_map_key, cache)
        } else if v.is_infinite() {
            let text = if v > 0.0 { "INF" } else { "-INF" };
            self.emit_string(ESC_STR, TAG_SPECIAL_NUMBER, text, as_map_key, cache)
        } else {
            self.emit_string(ESC_STR, TAG_FLOAT, text, as_map_key, cache)
        }
    }

    fn emit_array(
        &mut self,
        items: &[Value],
        as_map_key: bool,
        cache: &mut WriteCache,
    ) -> Result<()> {
        if as_map_key {
            return Err(Error::MalformedHandlerOutput(
                "an array can't be used as a map key".to_string(),
            ));
        }
        self.backend.begin_array(items.len())?;
        for item in items {
            self.marshal(item, false, cache)?;
        }
        self.backend.end_array()?;
        Ok(())
    }

    fn emit_map(
        &mut self,
        entries: &[(Value, Value)],
        as_map_key: bool,
        cache: &mut WriteCache,
    ) -> Result<()> {
        if as_map_key {
            return Err(Error::MalformedHandlerOutput(
                "a map can't be used as a map key".to_string(),
            ));
        }
        let mut stringable = true;
        for (key, _) in entries {
            if !self.is_stringable_key(key, &mut self.depth.clone())? {
                stringable = false;
                break;
            }
        }
        if stringable {
            self.backend.begin_map(entries.len())?;
            for (key, val) in entries {
                self.marshal(key, true, cache)?;
                self.marshal(val, false, cache)?;
            }
            self.backend.end_map()?;
            Ok(())
        } else {
            let flat = entries.iter().flat_map(|(k, v)| [k, v]);
            self.emit_tagged_seq(TAG_CMAP, entries.len() * 2, flat, cache)
        }
    }

    // A key can go in a native map if it ends up as a string: a ground scalar, or a
    // single-character tag with a text form. Quotes are looked through.
    fn is_stringable_key(&self, key: &Value, depth: &mut DepthTracker) -> Result<bool> {
        depth.enter()?;
        let handler = self.registry.lookup(key)?;
        let tag = handler.tag(key)?;
        let explicit = key.type_key() == TypeKey::Tagged;
        if tag == TAG_QUOTE && !explicit {
            let rep = handler.rep(key)?;
            return self.is_stringable_key(&rep, depth);
        }
        if !single_char(&tag) {
            return Ok(false);
        }
        if (is_ground_tag(&tag) && !explicit) || handler.string_rep(key).is_some() {
            return Ok(true);
        }
        Ok(matches!(*handler.rep(key)?, Value::Str(_)))
    }
}

fn bad_rep(tag: &str, rep: &Value) -> Error {
    Error::MalformedHandlerOutput(format!(
        "tag '{}' needs a different representation than {}",
        tag,
        rep.type_name()
    ))
}
