use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};

use super::Backend;
use crate::integer::{self, Integer};
use crate::marker::Marker;

/// MessagePack binary backend. Always picks the shortest encoding for lengths and integers.
#[derive(Debug)]
pub struct MsgpackBackend<W: Write> {
    output: W,
}

impl<W: Write> MsgpackBackend<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }

    pub fn get_ref(&self) -> &W {
        &self.output
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn into_inner(self) -> W {
        self.output
    }

    fn marker(&mut self, marker: Marker) -> io::Result<()> {
        self.output.write_u8(marker.into())
    }

    // Shared by arrays and maps: fix form up to 15, then 16- and 32-bit lengths.
    fn container_len(
        &mut self,
        len: usize,
        fix: fn(u8) -> Marker,
        m16: Marker,
        m32: Marker,
    ) -> io::Result<()> {
        if len <= 15 {
            self.marker(fix(len as u8))
        } else if len <= u16::MAX as usize {
            self.marker(m16)?;
            self.output.write_u16::<BigEndian>(len as u16)
        } else if len <= u32::MAX as usize {
            self.marker(m32)?;
            self.output.write_u32::<BigEndian>(len as u32)
        } else {
            Err(too_long(len))
        }
    }
}

fn too_long(len: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("length {} doesn't fit in a msgpack header", len),
    )
}

impl<W: Write> Backend for MsgpackBackend<W> {
    fn prefers_strings(&self) -> bool {
        false
    }

    fn fits_native_int(&self, _v: Integer) -> bool {
        true
    }

    fn fits_native_float(&self, _v: f64) -> bool {
        true
    }

    fn write_null(&mut self) -> io::Result<()> {
        self.marker(Marker::Nil)
    }

    fn write_bool(&mut self, v: bool) -> io::Result<()> {
        self.marker(if v { Marker::True } else { Marker::False })
    }

    fn write_int(&mut self, v: Integer) -> io::Result<()> {
        match integer::get_int_internal(&v) {
            integer::IntPriv::PosInt(v) => {
                if v <= 127 {
                    self.marker(Marker::PosFixInt(v as u8))
                } else if v <= u8::MAX as u64 {
                    self.marker(Marker::UInt8)?;
                    self.output.write_u8(v as u8)
                } else if v <= u16::MAX as u64 {
                    self.marker(Marker::UInt16)?;
                    self.output.write_u16::<BigEndian>(v as u16)
                } else if v <= u32::MAX as u64 {
                    self.marker(Marker::UInt32)?;
                    self.output.write_u32::<BigEndian>(v as u32)
                } else {
                    self.marker(Marker::UInt64)?;
                    self.output.write_u64::<BigEndian>(v)
                }
            }
            integer::IntPriv::NegInt(v) => {
                if v >= -32 {
                    self.marker(Marker::NegFixInt(v as i8))
                } else if v >= i8::MIN as i64 {
                    self.marker(Marker::Int8)?;
                    self.output.write_i8(v as i8)
                } else if v >= i16::MIN as i64 {
                    self.marker(Marker::Int16)?;
                    self.output.write_i16::<BigEndian>(v as i16)
                } else if v >= i32::MIN as i64 {
                    self.marker(Marker::Int32)?;
                    self.output.write_i32::<BigEndian>(v as i32)
                } else {
                    self.marker(Marker::Int64)?;
                    self.output.write_i64::<BigEndian>(v)
                }
            }
        }
    }

    fn write_f32(&mut self, v: f32) -> io::Result<()> {
        self.marker(Marker::F32)?;
        self.output.write_f32::<BigEndian>(v)
    }

    fn write_f64(&mut self, v: f64) -> io::Result<()> {
        self.marker(Marker::F64)?;
        self.output.write_f64::<BigEndian>(v)
    }

    fn write_str(&mut self, v: &str) -> io::Result<()> {
        let len = v.len();
        if len <= 31 {
            self.marker(Marker::FixStr(len as u8))?;
        } else if len <= u8::MAX as usize {
            self.marker(Marker::Str8)?;
            self.output.write_u8(len as u8)?;
        } else if len <= u16::MAX as usize {
            self.marker(Marker::Str16)?;
            self.output.write_u16::<BigEndian>(len as u16)?;
        } else if len <= u32::MAX as usize {
            self.marker(Marker::Str32)?;
            self.output.write_u32::<BigEndian>(len as u32)?;
        } else {
            return Err(too_long(len));
        }
        self.output.write_all(v.as_bytes())
    }

    fn begin_array(&mut self, len: usize) -> io::Result<()> {
        self.container_len(len, Marker::FixArray, Marker::Array16, Marker::Array32)
    }

    fn end_array(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn begin_map(&mut self, len: usize) -> io::Result<()> {
        self.container_len(len, Marker::FixMap, Marker::Map16, Marker::Map32)
    }

    fn end_map(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn reset(&mut self) {}

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}
