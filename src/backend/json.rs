use std::io::{self, Write};

use super::Backend;
use crate::Integer;

#[derive(Clone, Copy, Debug, PartialEq)]
enum ContainerType {
    Array,
    Map,
}

#[derive(Clone, Debug)]
struct EncodingLevel {
    container_type: ContainerType,
    child_count: usize,
}

/// JSON text backend. Writes compact JSON with no whitespace inside values; consecutive
/// top-level values are separated by one space.
#[derive(Debug)]
pub struct JsonBackend<W: Write> {
    output: W,
    containers: Vec<EncodingLevel>,
    top_level_count: usize,
}

impl<W: Write> JsonBackend<W> {
    pub fn new(output: W) -> Self {
        Self {
            output,
            containers: Vec::new(),
            top_level_count: 0,
        }
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

    // Writes whatever has to come between the previous token and this value: nothing, a space
    // between top-level values, `,` between elements and entries, or `:` after a map key.
    fn write_space_before_value(&mut self) -> io::Result<()> {
        match self.containers.last_mut() {
            None => {
                if self.top_level_count > 0 {
                    self.output.write_all(b" ")?;
                }
                self.top_level_count += 1;
            }
            Some(level) => {
                let delimiter: &[u8] = match level.container_type {
                    ContainerType::Array if level.child_count > 0 => b",",
                    ContainerType::Map if level.child_count % 2 == 1 => b":",
                    ContainerType::Map if level.child_count > 0 => b",",
                    _ => b"",
                };
                self.output.write_all(delimiter)?;
                level.child_count += 1;
            }
        }
        Ok(())
    }

    fn step_in(&mut self, container_type: ContainerType) -> io::Result<()> {
        self.write_space_before_value()?;
        self.output.write_all(match container_type {
            ContainerType::Array => b"[",
            ContainerType::Map => b"{",
        })?;
        self.containers.push(EncodingLevel {
            container_type,
            child_count: 0,
        });
        Ok(())
    }

    fn step_out(&mut self, container_type: ContainerType) -> io::Result<()> {
        match self.containers.pop() {
            Some(level) if level.container_type == container_type => (),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "closed a container that wasn't open",
                ))
            }
        }
        self.output.write_all(match container_type {
            ContainerType::Array => b"]",
            ContainerType::Map => b"}",
        })
    }
}

impl<W: Write> Backend for JsonBackend<W> {
    fn prefers_strings(&self) -> bool {
        true
    }

    fn fits_native_int(&self, v: Integer) -> bool {
        v.is_text_safe()
    }

    fn fits_native_float(&self, v: f64) -> bool {
        v.is_finite()
    }

    fn write_null(&mut self) -> io::Result<()> {
        self.write_space_before_value()?;
        self.output.write_all(b"null")
    }

    fn write_bool(&mut self, v: bool) -> io::Result<()> {
        self.write_space_before_value()?;
        let token: &[u8] = if v { b"true" } else { b"false" };
        self.output.write_all(token)
    }

    fn write_int(&mut self, v: Integer) -> io::Result<()> {
        self.write_space_before_value()?;
        write!(self.output, "{}", v)
    }

    fn write_f32(&mut self, v: f32) -> io::Result<()> {
        self.write_space_before_value()?;
        serde_json::to_writer(&mut self.output, &v).map_err(io::Error::from)
    }

    fn write_f64(&mut self, v: f64) -> io::Result<()> {
        self.write_space_before_value()?;
        serde_json::to_writer(&mut self.output, &v).map_err(io::Error::from)
    }

    fn write_str(&mut self, v: &str) -> io::Result<()> {
        self.write_space_before_value()?;
        serde_json::to_writer(&mut self.output, v).map_err(io::Error::from)
    }

    fn begin_array(&mut self, _len: usize) -> io::Result<()> {
        self.step_in(ContainerType::Array)
    }

    fn end_array(&mut self) -> io::Result<()> {
        self.step_out(ContainerType::Array)
    }

    fn begin_map(&mut self, _len: usize) -> io::Result<()> {
        self.step_in(ContainerType::Map)
    }

    fn end_map(&mut self) -> io::Result<()> {
        self.step_out(ContainerType::Map)
    }

    fn reset(&mut self) {
        self.containers.clear();
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}
