use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::handler::*;
use crate::value::{TypeKey, Value};

/// Table from exact value type to [`Handler`].
///
/// Lookup only ever matches a value's own [`TypeKey`]. If there is no entry for it, the entry
/// under [`TypeKey::Any`] handles the value, and if that is missing too the lookup fails with
/// [`Error::UnregisteredType`]. Cloning a registry is cheap; the handlers themselves are shared.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TypeKey, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    /// A registry with no entries at all, not even a catch-all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in handlers: every [`Value`] variant except [`Value::Ext`], plus a catch-all
    /// that refuses unknown extension types.
    pub fn default_handlers() -> Self {
        let integer: Arc<dyn Handler> = Arc::new(IntegerHandler);
        let float: Arc<dyn Handler> = Arc::new(FloatHandler);

        let mut reg = Self::empty();
        reg.insert(TypeKey::Null, Arc::new(NullHandler));
        reg.insert(TypeKey::Bool, Arc::new(BoolHandler));
        reg.insert(TypeKey::Str, Arc::new(StringHandler));
        reg.insert(TypeKey::Int, integer);
        reg.insert(TypeKey::BigInt, Arc::new(ToStringHandler::new(TAG_BIG_INT)));
        reg.insert(TypeKey::F32, float.clone());
        reg.insert(TypeKey::F64, float);
        reg.insert(TypeKey::Decimal, Arc::new(ToStringHandler::new(TAG_DECIMAL)));
        reg.insert(TypeKey::Char, Arc::new(ToStringHandler::new(TAG_CHAR)));
        reg.insert(TypeKey::Keyword, Arc::new(ToStringHandler::new(TAG_KEYWORD)));
        reg.insert(TypeKey::Symbol, Arc::new(ToStringHandler::new(TAG_SYMBOL)));
        reg.insert(TypeKey::Bin, Arc::new(BinaryHandler));
        reg.insert(TypeKey::Uuid, Arc::new(ToStringHandler::new(TAG_UUID)));
        reg.insert(TypeKey::Uri, Arc::new(ToStringHandler::new(TAG_URI)));
        reg.insert(TypeKey::Map, Arc::new(MapHandler));
        reg.insert(TypeKey::Array, Arc::new(ArrayHandler));
        reg.insert(TypeKey::Shorts, Arc::new(PrimitiveArrayHandler::new(TAG_SHORTS)));
        reg.insert(TypeKey::Ints, Arc::new(PrimitiveArrayHandler::new(TAG_INTS)));
        reg.insert(TypeKey::Longs, Arc::new(PrimitiveArrayHandler::new(TAG_LONGS)));
        reg.insert(TypeKey::Floats, Arc::new(PrimitiveArrayHandler::new(TAG_FLOATS)));
        reg.insert(TypeKey::Doubles, Arc::new(PrimitiveArrayHandler::new(TAG_DOUBLES)));
        reg.insert(TypeKey::Bools, Arc::new(PrimitiveArrayHandler::new(TAG_BOOLS)));
        reg.insert(TypeKey::Chars, Arc::new(PrimitiveArrayHandler::new(TAG_CHARS)));
        reg.insert(TypeKey::Set, Arc::new(SetHandler));
        reg.insert(TypeKey::Timestamp, Arc::new(TimeHandler));
        reg.insert(TypeKey::Ratio, Arc::new(RatioHandler));
        reg.insert(TypeKey::Link, Arc::new(LinkHandler));
        reg.insert(TypeKey::Quote, Arc::new(QuoteHandler));
        reg.insert(TypeKey::Tagged, Arc::new(TaggedValueHandler));
        reg.insert(TypeKey::Any, Arc::new(UnsupportedHandler));
        reg
    }

    /// Bind a handler to a type, returning whatever was bound before.
    pub fn insert(&mut self, key: TypeKey, handler: Arc<dyn Handler>) -> Option<Arc<dyn Handler>> {
        self.handlers.insert(key, handler)
    }

    pub fn remove(&mut self, key: TypeKey) -> Option<Arc<dyn Handler>> {
        self.handlers.remove(&key)
    }

    /// Overlay entries onto this registry. Later entries replace earlier ones with the same key.
    pub fn merge<I>(&mut self, custom: I)
    where
        I: IntoIterator<Item = (TypeKey, Arc<dyn Handler>)>,
    {
        for (key, handler) in custom {
            self.handlers.insert(key, handler);
        }
    }

    /// A copy of this registry with each handler's verbose alternate swapped in where one exists.
    pub fn verbose_view(&self) -> HandlerRegistry {
        let handlers = self
            .handlers
            .iter()
            .map(|(key, handler)| {
                let handler = handler.verbose_handler().unwrap_or_else(|| handler.clone());
                (*key, handler)
            })
            .collect();
        HandlerRegistry { handlers }
    }

    /// The handler bound to exactly this key.
    pub fn get(&self, key: TypeKey) -> Option<&Arc<dyn Handler>> {
        self.handlers.get(&key)
    }

    pub fn contains(&self, key: TypeKey) -> bool {
        self.handlers.contains_key(&key)
    }

    /// The handler for a value: the one bound to its exact type, else the catch-all.
    pub fn lookup(&self, v: &Value) -> Result<&Arc<dyn Handler>> {
        self.handlers
            .get(&v.type_key())
            .or_else(|| self.handlers.get(&TypeKey::Any))
            .ok_or_else(|| Error::UnregisteredType(v.type_name().to_string()))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.handlers.iter()).finish()
    }
}
