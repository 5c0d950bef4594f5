//! Wire backends. The emitter drives one of these token by token; a backend only knows how to
//! put primitives, arrays and maps on its sink, never anything about tags or caching.

use std::io;

use crate::Integer;

mod json;
mod msgpack;

pub use self::json::JsonBackend;
pub use self::msgpack::MsgpackBackend;

/// Token sink for one wire syntax.
pub trait Backend {
    /// True if scalar extension values should be written as `~`-prefixed strings even outside
    /// map keys.
    fn prefers_strings(&self) -> bool;

    /// True if the integer can be written as a native number without a reader losing precision.
    fn fits_native_int(&self, v: Integer) -> bool;

    /// True if the float can be written as a native number.
    fn fits_native_float(&self, v: f64) -> bool;

    fn write_null(&mut self) -> io::Result<()>;
    fn write_bool(&mut self, v: bool) -> io::Result<()>;
    fn write_int(&mut self, v: Integer) -> io::Result<()>;
    fn write_f32(&mut self, v: f32) -> io::Result<()>;
    fn write_f64(&mut self, v: f64) -> io::Result<()>;
    fn write_str(&mut self, v: &str) -> io::Result<()>;

    /// Open an array that will hold exactly `len` values.
    fn begin_array(&mut self, len: usize) -> io::Result<()>;
    fn end_array(&mut self) -> io::Result<()>;

    /// Open a map that will hold exactly `len` key/value pairs.
    fn begin_map(&mut self, len: usize) -> io::Result<()>;
    fn end_map(&mut self) -> io::Result<()>;

    /// Forget any open containers left behind by a failed write.
    fn reset(&mut self);

    fn flush(&mut self) -> io::Result<()>;
}

/// The backend picked at runtime by [`Format`][crate::Format].
#[derive(Debug)]
pub(crate) enum FormatBackend<W: io::Write> {
    Json(JsonBackend<W>),
    Msgpack(MsgpackBackend<W>),
}

macro_rules! dispatch {
    ($self: ident, $b: ident => $e: expr) => {
        match $self {
            FormatBackend::Json($b) => $e,
            FormatBackend::Msgpack($b) => $e,
        }
    };
}

impl<W: io::Write> FormatBackend<W> {
    pub(crate) fn get_ref(&self) -> &W {
        dispatch!(self, b => b.get_ref())
    }

    pub(crate) fn get_mut(&mut self) -> &mut W {
        dispatch!(self, b => b.get_mut())
    }

    pub(crate) fn into_inner(self) -> W {
        dispatch!(self, b => b.into_inner())
    }
}

impl<W: io::Write> Backend for FormatBackend<W> {
    fn prefers_strings(&self) -> bool {
        dispatch!(self, b => b.prefers_strings())
    }

    fn fits_native_int(&self, v: Integer) -> bool {
        dispatch!(self, b => b.fits_native_int(v))
    }

    fn fits_native_float(&self, v: f64) -> bool {
        dispatch!(self, b => b.fits_native_float(v))
    }

    fn write_null(&mut self) -> io::Result<()> {
        dispatch!(self, b => b.write_null())
    }

    fn write_bool(&mut self, v: bool) -> io::Result<()> {
        dispatch!(self, b => b.write_bool(v))
    }

    fn write_int(&mut self, v: Integer) -> io::Result<()> {
        dispatch!(self, b => b.write_int(v))
    }

    fn write_f32(&mut self, v: f32) -> io::Result<()> {
        dispatch!(self, b => b.write_f32(v))
    }

    fn write_f64(&mut self, v: f64) -> io::Result<()> {
        dispatch!(self, b => b.write_f64(v))
    }

    fn write_str(&mut self, v: &str) -> io::Result<()> {
        dispatch!(self, b => b.write_str(v))
    }

    fn begin_array(&mut self, len: usize) -> io::Result<()> {
        dispatch!(self, b => b.begin_array(len))
    }

    fn end_array(&mut self) -> io::Result<()> {
        dispatch!(self, b => b.end_array())
    }

    fn begin_map(&mut self, len: usize) -> io::Result<()> {
        dispatch!(self, b => b.begin_map(len))
    }

    fn end_map(&mut self) -> io::Result<()> {
        dispatch!(self, b => b.end_map())
    }

    fn reset(&mut self) {
        dispatch!(self, b => b.reset())
    }

    fn flush(&mut self) -> io::Result<()> {
        dispatch!(self, b => b.flush())
    }
}
