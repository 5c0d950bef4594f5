//! Reference reader for the tests. Reads both wire formats back into [`Value`]s, resolving cache
//! codes the same way any conforming reader would: every string is read once, in document order,
//! and cacheable strings are remembered in the order they first show up.

use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use byteorder::{BigEndian, ReadBytesExt};
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use uuid::Uuid;

use crate::cache::{code_to_index, is_cacheable, ESC_TAG};
use crate::marker::Marker;
use crate::types::*;
use crate::{Integer, Timestamp, Value};

/// Wire-level tree, before any tags or codes are interpreted.
#[derive(Clone, Debug, PartialEq)]
enum Raw {
    Null,
    Bool(bool),
    Int(Integer),
    F32(f32),
    F64(f64),
    Str(String),
    Array(Vec<Raw>),
    Map(Vec<(Raw, Raw)>),
}

/// Read every top-level value from a JSON stream.
pub fn read_json(bytes: &[u8]) -> Vec<Value> {
    serde_json::Deserializer::from_slice(bytes)
        .into_iter::<serde_json::Value>()
        .map(|v| Decoder::default().decode(&from_json(v.unwrap()), false))
        .collect()
}

/// Read every top-level value from a msgpack stream.
pub fn read_msgpack(mut bytes: &[u8]) -> Vec<Value> {
    let mut out = Vec::new();
    while !bytes.is_empty() {
        let raw = from_msgpack(&mut bytes);
        out.push(Decoder::default().decode(&raw, false));
    }
    out
}

fn from_json(v: serde_json::Value) -> Raw {
    use serde_json::Value as J;
    match v {
        J::Null => Raw::Null,
        J::Bool(b) => Raw::Bool(b),
        J::Number(n) => {
            if let Some(u) = n.as_u64() {
                Raw::Int(Integer::from(u))
            } else if let Some(i) = n.as_i64() {
                Raw::Int(Integer::from(i))
            } else {
                Raw::F64(n.as_f64().unwrap())
            }
        }
        J::String(s) => Raw::Str(s),
        J::Array(items) => Raw::Array(items.into_iter().map(from_json).collect()),
        J::Object(map) => Raw::Map(
            map.into_iter()
                .map(|(k, v)| (Raw::Str(k), from_json(v)))
                .collect(),
        ),
    }
}

fn str_of(rd: &mut &[u8], len: usize) -> Raw {
    let bytes = *rd;
    let (s, rest) = bytes.split_at(len);
    *rd = rest;
    Raw::Str(String::from_utf8(s.to_vec()).unwrap())
}

fn array_of(rd: &mut &[u8], len: usize) -> Raw {
    Raw::Array((0..len).map(|_| from_msgpack(rd)).collect())
}

fn map_of(rd: &mut &[u8], len: usize) -> Raw {
    Raw::Map((0..len).map(|_| (from_msgpack(rd), from_msgpack(rd))).collect())
}

fn from_msgpack(rd: &mut &[u8]) -> Raw {
    let marker = Marker::from_u8(rd.read_u8().unwrap());
    match marker {
        Marker::Nil => Raw::Null,
        Marker::True => Raw::Bool(true),
        Marker::False => Raw::Bool(false),
        Marker::PosFixInt(v) => Raw::Int(Integer::from(v)),
        Marker::NegFixInt(v) => Raw::Int(Integer::from(v)),
        Marker::UInt8 => Raw::Int(Integer::from(rd.read_u8().unwrap())),
        Marker::UInt16 => Raw::Int(Integer::from(rd.read_u16::<BigEndian>().unwrap())),
        Marker::UInt32 => Raw::Int(Integer::from(rd.read_u32::<BigEndian>().unwrap())),
        Marker::UInt64 => Raw::Int(Integer::from(rd.read_u64::<BigEndian>().unwrap())),
        Marker::Int8 => Raw::Int(Integer::from(rd.read_i8().unwrap())),
        Marker::Int16 => Raw::Int(Integer::from(rd.read_i16::<BigEndian>().unwrap())),
        Marker::Int32 => Raw::Int(Integer::from(rd.read_i32::<BigEndian>().unwrap())),
        Marker::Int64 => Raw::Int(Integer::from(rd.read_i64::<BigEndian>().unwrap())),
        Marker::F32 => Raw::F32(rd.read_f32::<BigEndian>().unwrap()),
        Marker::F64 => Raw::F64(rd.read_f64::<BigEndian>().unwrap()),
        Marker::FixStr(len) => str_of(rd, len as usize),
        Marker::Str8 => {
            let len = rd.read_u8().unwrap() as usize;
            str_of(rd, len)
        }
        Marker::Str16 => {
            let len = rd.read_u16::<BigEndian>().unwrap() as usize;
            str_of(rd, len)
        }
        Marker::Str32 => {
            let len = rd.read_u32::<BigEndian>().unwrap() as usize;
            str_of(rd, len)
        }
        Marker::FixArray(len) => array_of(rd, len as usize),
        Marker::Array16 => {
            let len = rd.read_u16::<BigEndian>().unwrap() as usize;
            array_of(rd, len)
        }
        Marker::Array32 => {
            let len = rd.read_u32::<BigEndian>().unwrap() as usize;
            array_of(rd, len)
        }
        Marker::FixMap(len) => map_of(rd, len as usize),
        Marker::Map16 => {
            let len = rd.read_u16::<BigEndian>().unwrap() as usize;
            map_of(rd, len)
        }
        Marker::Map32 => {
            let len = rd.read_u32::<BigEndian>().unwrap() as usize;
            map_of(rd, len)
        }
        other => panic!("writer never emits {:?}", other),
    }
}

#[derive(Default)]
struct Decoder {
    cache: Vec<String>,
}

impl Decoder {
    // Resolve a cache code, or remember a cacheable string for later codes.
    fn read_str(&mut self, s: &str, as_map_key: bool) -> String {
        if let Some(index) = code_to_index(s) {
            return self.cache[index].clone();
        }
        if is_cacheable(s, as_map_key) && self.cache.len() < crate::cache::MAX_CACHE_ENTRIES {
            self.cache.push(s.to_string());
        }
        s.to_string()
    }

    fn decode(&mut self, raw: &Raw, as_map_key: bool) -> Value {
        match raw {
            Raw::Null => Value::Null,
            Raw::Bool(b) => Value::Bool(*b),
            Raw::Int(i) => Value::Int(*i),
            Raw::F32(f) => Value::F32(*f),
            Raw::F64(f) => Value::F64(*f),
            Raw::Str(s) => {
                let s = self.read_str(s, as_map_key);
                parse_str(&s)
            }
            Raw::Array(items) => {
                let mut items = items.iter();
                let mut out = Vec::new();
                if let Some(first) = items.next() {
                    if let Raw::Str(s) = first {
                        let s = self.read_str(s, false);
                        if let Some(tag) = s.strip_prefix(ESC_TAG) {
                            let rest = items.map(|item| self.decode(item, false)).collect();
                            return decode_tagged(tag, Value::Array(rest));
                        }
                        out.push(parse_str(&s));
                    } else {
                        out.push(self.decode(first, false));
                    }
                }
                out.extend(items.map(|item| self.decode(item, false)));
                Value::Array(out)
            }
            Raw::Map(entries) => {
                if let [(Raw::Str(k), v)] = entries.as_slice() {
                    let k = self.read_str(k, true);
                    if let Some(tag) = k.strip_prefix(ESC_TAG) {
                        let rep = self.decode(v, false);
                        return decode_tagged(tag, rep);
                    }
                    let key = parse_str(&k);
                    let val = self.decode(v, false);
                    return Value::Map(vec![(key, val)]);
                }
                Value::Map(
                    entries
                        .iter()
                        .map(|(k, v)| {
                            let key = self.decode(k, true);
                            (key, self.decode(v, false))
                        })
                        .collect(),
                )
            }
        }
    }
}

fn parse_str(s: &str) -> Value {
    let mut chars = s.chars();
    if chars.next() != Some('~') {
        return Value::from(s);
    }
    let tag = match chars.next() {
        Some(tag) => tag,
        None => return Value::from(s),
    };
    let body = chars.as_str();
    match tag {
        '~' | '^' | '`' => Value::from(&s[1..]),
        '_' => Value::Null,
        '?' => Value::Bool(body == "t"),
        'i' => match (body.parse::<u64>(), body.parse::<i64>()) {
            (Ok(u), _) => Value::from(u),
            (_, Ok(i)) => Value::from(i),
            _ => Value::BigInt(BigInt::from_str(body).unwrap()),
        },
        'd' => Value::F64(body.parse().unwrap()),
        'z' => Value::F64(match body {
            "NaN" => f64::NAN,
            "INF" => f64::INFINITY,
            "-INF" => f64::NEG_INFINITY,
            other => panic!("unknown special number {}", other),
        }),
        'n' => Value::BigInt(BigInt::from_str(body).unwrap()),
        'f' => Value::Decimal(parse_decimal(body)),
        'c' => Value::Char(body.chars().next().unwrap()),
        ':' => Value::keyword(body),
        '$' => Value::symbol(body),
        'b' => Value::Bin(STANDARD.decode(body).unwrap()),
        'u' => Value::Uuid(Uuid::parse_str(body).unwrap()),
        'r' => Value::uri(body),
        'm' => Value::Timestamp(Timestamp::from_millis(body.parse().unwrap())),
        't' => {
            let dt = DateTime::parse_from_rfc3339(body).unwrap();
            Value::Timestamp(Timestamp::from(dt.with_timezone(&Utc)))
        }
        other => Value::tagged(other.to_string(), body),
    }
}

fn parse_decimal(s: &str) -> Decimal {
    let (mantissa, exp) = match s.split_once('E') {
        Some((m, e)) => (m, e.trim_start_matches('+').parse::<i64>().unwrap()),
        None => (s, 0),
    };
    let (digits, scale) = match mantissa.split_once('.') {
        Some((int_part, frac)) => (format!("{}{}", int_part, frac), frac.len() as i64),
        None => (mantissa.to_string(), 0),
    };
    Decimal::new(BigInt::from_str(&digits).unwrap(), exp - scale)
}

fn into_items(rep: Value) -> Vec<Value> {
    match rep {
        Value::Array(items) => items,
        other => panic!("expected a sequence, got {:?}", other),
    }
}

fn decode_tagged(tag: &str, rep: Value) -> Value {
    let int = |v: &Value| v.as_int().unwrap().as_i64().unwrap();
    let float = |v: &Value| match *v {
        Value::F32(f) => f as f64,
        Value::F64(f) => f,
        _ => panic!("expected a float, got {:?}", v),
    };
    match tag {
        "set" => Value::Set(into_items(rep)),
        "cmap" => {
            let items = into_items(rep);
            Value::Map(
                items
                    .chunks(2)
                    .map(|pair| (pair[0].clone(), pair[1].clone()))
                    .collect(),
            )
        }
        "ratio" => {
            let mut items = into_items(rep).into_iter();
            let (n, d) = match (items.next(), items.next()) {
                (Some(Value::BigInt(n)), Some(Value::BigInt(d))) => (n, d),
                other => panic!("bad ratio {:?}", other),
            };
            Value::from(Ratio::new(n, d).unwrap())
        }
        "link" => {
            let field = |name: &str| {
                rep.as_map()
                    .unwrap()
                    .iter()
                    .find(|(k, _)| k.as_str() == Some(name))
                    .map(|(_, v)| v.clone())
            };
            let href = match field("href") {
                Some(Value::Uri(u)) => u,
                other => panic!("bad link href {:?}", other),
            };
            let rel = field("rel").unwrap();
            let mut link = Link::new(href, rel.as_str().unwrap());
            if let Some(name) = field("name") {
                link = link.with_name(name.as_str().unwrap());
            }
            if let Some(prompt) = field("prompt") {
                link = link.with_prompt(prompt.as_str().unwrap());
            }
            if let Some(render) = field("render") {
                link = link.with_render(match render.as_str().unwrap() {
                    "image" => LinkRender::Image,
                    _ => LinkRender::Link,
                });
            }
            Value::from(link)
        }
        "shorts" => Value::Shorts(into_items(rep).iter().map(|v| int(v) as i16).collect()),
        "ints" => Value::Ints(into_items(rep).iter().map(|v| int(v) as i32).collect()),
        "longs" => Value::Longs(into_items(rep).iter().map(int).collect()),
        "floats" => Value::Floats(into_items(rep).iter().map(|v| float(v) as f32).collect()),
        "doubles" => Value::Doubles(into_items(rep).iter().map(float).collect()),
        "bools" => Value::Bools(
            into_items(rep)
                .iter()
                .map(|v| matches!(v, Value::Bool(true)))
                .collect(),
        ),
        "chars" => Value::Chars(
            into_items(rep)
                .iter()
                .map(|v| match v {
                    Value::Char(c) => *c,
                    other => panic!("expected a char, got {:?}", other),
                })
                .collect(),
        ),
        "m" => Value::Timestamp(Timestamp::from_millis(int(&rep))),
        _ => Value::tagged(tag, rep),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_resolve_in_order() {
        let out = read_json(br#"[{"name":1},{"^0":["~:kw","^1"]}] "plain""#);
        assert_eq!(
            out,
            vec![
                Value::Array(vec![
                    Value::map(vec![(Value::from("name"), Value::from(1))]),
                    Value::map(vec![(
                        Value::from("name"),
                        Value::Array(vec![Value::keyword("kw"), Value::keyword("kw")])
                    )]),
                ]),
                Value::from("plain"),
            ]
        );
    }

    #[test]
    fn decimals() {
        assert_eq!(parse_decimal("123.45"), Decimal::new(12345, -2));
        assert_eq!(parse_decimal("1E+3"), Decimal::new(1, 3));
        assert_eq!(parse_decimal("-1.5E-9"), Decimal::new(-15, -10));
    }
}
