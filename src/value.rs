use std::any::{Any, TypeId};
use std::fmt::{self, Debug};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use uuid::Uuid;

use crate::types::*;
use crate::{Integer, Timestamp};

/// A value that can be handed to a [`Writer`][crate::Writer].
///
/// Each variant is its own exact type as far as handler lookup is concerned (see [`TypeKey`]).
/// Maps keep their entries in insertion order and may use any value as a key. Caller-defined
/// types ride in [`Value::Ext`] and need a handler registered under their own key.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Str(String),
    Int(Integer),
    BigInt(BigInt),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Char(char),
    Keyword(Keyword),
    Symbol(Symbol),
    Bin(Vec<u8>),
    Uuid(Uuid),
    Uri(Uri),
    Map(Vec<(Value, Value)>),
    Array(Vec<Value>),
    Shorts(Vec<i16>),
    Ints(Vec<i32>),
    Longs(Vec<i64>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
    Bools(Vec<bool>),
    Chars(Vec<char>),
    Set(Vec<Value>),
    Timestamp(Timestamp),
    Ratio(Ratio),
    Link(Box<Link>),
    Quote(Box<Value>),
    Tagged(TaggedValue),
    Ext(Ext),
}

/// Exact type identity used to look up handlers.
///
/// There is no notion of a parent type: a key only ever matches values of exactly that type.
/// [`TypeKey::Any`] is the designated catch-all entry, consulted when nothing else matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Null,
    Bool,
    Str,
    Int,
    BigInt,
    F32,
    F64,
    Decimal,
    Char,
    Keyword,
    Symbol,
    Bin,
    Uuid,
    Uri,
    Map,
    Array,
    Shorts,
    Ints,
    Longs,
    Floats,
    Doubles,
    Bools,
    Chars,
    Set,
    Timestamp,
    Ratio,
    Link,
    Quote,
    Tagged,
    Ext(TypeId),
    Any,
}

impl TypeKey {
    /// Key for a caller-defined extension type.
    pub fn of<T: Any>() -> TypeKey {
        TypeKey::Ext(TypeId::of::<T>())
    }
}

/// A caller-defined type that can be carried in a [`Value`]. Implemented for every suitable type;
/// there is nothing to write by hand.
pub trait Extension: Any + Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Debug + Send + Sync> Extension for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Shared holder for an extension value. Two holders are equal only if they point at the same
/// value.
#[derive(Clone)]
pub struct Ext(Arc<dyn Extension>);

impl Ext {
    pub fn new<T: Extension>(v: T) -> Self {
        Ext(Arc::new(v))
    }

    fn inner(&self) -> &dyn Extension {
        &*self.0
    }

    pub fn type_id(&self) -> TypeId {
        self.inner().as_any().type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.inner().type_name()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner().as_any().downcast_ref::<T>()
    }
}

impl Debug for Ext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Debug::fmt(self.inner(), f)
    }
}

impl PartialEq for Ext {
    fn eq(&self, other: &Ext) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Value {
    /// Wrap a caller-defined value.
    pub fn ext<T: Extension>(v: T) -> Value {
        Value::Ext(Ext::new(v))
    }

    /// Make a map from key/value pairs, keeping their order.
    pub fn map<K, V, I>(entries: I) -> Value
    where
        K: Into<Value>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn keyword<S: Into<String>>(name: S) -> Value {
        Value::Keyword(Keyword::new(name))
    }

    pub fn symbol<S: Into<String>>(name: S) -> Value {
        Value::Symbol(Symbol::new(name))
    }

    pub fn uri<S: Into<String>>(uri: S) -> Value {
        Value::Uri(Uri::new(uri))
    }

    pub fn quote<V: Into<Value>>(v: V) -> Value {
        Value::Quote(Box::new(v.into()))
    }

    pub fn tagged<T: Into<String>, V: Into<Value>>(tag: T, rep: V) -> Value {
        Value::Tagged(TaggedValue::new(tag, rep))
    }

    /// The exact type of this value, for handler lookup.
    pub fn type_key(&self) -> TypeKey {
        match self {
            Value::Null => TypeKey::Null,
            Value::Bool(_) => TypeKey::Bool,
            Value::Str(_) => TypeKey::Str,
            Value::Int(_) => TypeKey::Int,
            Value::BigInt(_) => TypeKey::BigInt,
            Value::F32(_) => TypeKey::F32,
            Value::F64(_) => TypeKey::F64,
            Value::Decimal(_) => TypeKey::Decimal,
            Value::Char(_) => TypeKey::Char,
            Value::Keyword(_) => TypeKey::Keyword,
            Value::Symbol(_) => TypeKey::Symbol,
            Value::Bin(_) => TypeKey::Bin,
            Value::Uuid(_) => TypeKey::Uuid,
            Value::Uri(_) => TypeKey::Uri,
            Value::Map(_) => TypeKey::Map,
            Value::Array(_) => TypeKey::Array,
            Value::Shorts(_) => TypeKey::Shorts,
            Value::Ints(_) => TypeKey::Ints,
            Value::Longs(_) => TypeKey::Longs,
            Value::Floats(_) => TypeKey::Floats,
            Value::Doubles(_) => TypeKey::Doubles,
            Value::Bools(_) => TypeKey::Bools,
            Value::Chars(_) => TypeKey::Chars,
            Value::Set(_) => TypeKey::Set,
            Value::Timestamp(_) => TypeKey::Timestamp,
            Value::Ratio(_) => TypeKey::Ratio,
            Value::Link(_) => TypeKey::Link,
            Value::Quote(_) => TypeKey::Quote,
            Value::Tagged(_) => TypeKey::Tagged,
            Value::Ext(ext) => TypeKey::Ext(ext.type_id()),
        }
    }

    /// Human-readable name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Str(_) => "Str",
            Value::Int(_) => "Int",
            Value::BigInt(_) => "BigInt",
            Value::F32(_) => "F32",
            Value::F64(_) => "F64",
            Value::Decimal(_) => "Decimal",
            Value::Char(_) => "Char",
            Value::Keyword(_) => "Keyword",
            Value::Symbol(_) => "Symbol",
            Value::Bin(_) => "Bin",
            Value::Uuid(_) => "Uuid",
            Value::Uri(_) => "Uri",
            Value::Map(_) => "Map",
            Value::Array(_) => "Array",
            Value::Shorts(_) => "Shorts",
            Value::Ints(_) => "Ints",
            Value::Longs(_) => "Longs",
            Value::Floats(_) => "Floats",
            Value::Doubles(_) => "Doubles",
            Value::Bools(_) => "Bools",
            Value::Chars(_) => "Chars",
            Value::Set(_) => "Set",
            Value::Timestamp(_) => "Timestamp",
            Value::Ratio(_) => "Ratio",
            Value::Link(_) => "Link",
            Value::Quote(_) => "Quote",
            Value::Tagged(_) => "Tagged",
            Value::Ext(ext) => ext.type_name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::Str(ref val) = *self {
            Some(val.as_str())
        } else {
            None
        }
    }

    pub fn as_int(&self) -> Option<Integer> {
        if let Value::Int(val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        if let Value::Array(ref array) = *self {
            Some(array)
        } else {
            None
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        if let Value::Map(ref map) = *self {
            Some(map)
        } else {
            None
        }
    }

    /// Borrow the caller-defined value inside, if it is of type `T`.
    pub fn downcast_ext<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Ext(ext) => ext.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! impl_from_int {
    ($($t: ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(Integer::from(v))
                }
            }
        )*
    };
}

impl_from_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl From<Integer> for Value {
    fn from(v: Integer) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Value::BigInt(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<Keyword> for Value {
    fn from(v: Keyword) -> Self {
        Value::Keyword(v)
    }
}

impl From<Symbol> for Value {
    fn from(v: Symbol) -> Self {
        Value::Symbol(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<Uri> for Value {
    fn from(v: Uri) -> Self {
        Value::Uri(v)
    }
}

impl From<Timestamp> for Value {
    fn from(v: Timestamp) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(Timestamp::from(v))
    }
}

impl From<Ratio> for Value {
    fn from(v: Ratio) -> Self {
        Value::Ratio(v)
    }
}

impl From<Link> for Value {
    fn from(v: Link) -> Self {
        Value::Link(Box::new(v))
    }
}

impl From<TaggedValue> for Value {
    fn from(v: TaggedValue) -> Self {
        Value::Tagged(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
