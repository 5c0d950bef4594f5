use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use educe::Educe;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::backend::{FormatBackend, JsonBackend, MsgpackBackend};
use crate::cache::WriteCache;
use crate::emitter::Emitter;
use crate::error::WriteError;
use crate::handler::Handler;
use crate::registry::HandlerRegistry;
use crate::value::{TypeKey, Value};

/// Default limit on how deeply values may nest.
pub const MAX_DEPTH: usize = 512;

/// Wire format a [`Writer`] produces.
#[derive(Educe, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[educe(Default)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    /// JSON text with the string cache on.
    #[educe(Default)]
    TextCompact,
    /// JSON text for humans: no cache codes, every tagged value in map form, ISO-8601 instants.
    TextVerbose,
    /// MessagePack with the string cache on.
    Binary,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::TextCompact => "text-compact",
            Format::TextVerbose => "text-verbose",
            Format::Binary => "binary",
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Format::TextVerbose)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A format name that isn't one of `text-compact`, `text-verbose`, or `binary`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownFormat(pub String);

impl fmt::Display for UnknownFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Unknown wire format \"{}\"", self.0)
    }
}

impl std::error::Error for UnknownFormat {}

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text-compact" => Ok(Format::TextCompact),
            "text-verbose" => Ok(Format::TextVerbose),
            "binary" => Ok(Format::Binary),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Options for [`create_writer`].
#[derive(Educe, Clone, Debug)]
#[educe(Default)]
pub struct WriterOptions {
    pub format: Format,
    /// Handlers laid over the built-in ones. Later entries win over earlier ones with the same
    /// key, and all of them win over the built-ins.
    pub custom_handlers: Vec<(TypeKey, Arc<dyn Handler>)>,
    /// Base table to start from instead of [`HandlerRegistry::default_handlers`]. Build it once
    /// and clone it into each writer's options; the handlers are shared, not copied.
    pub registry: Option<HandlerRegistry>,
    /// How deeply values may nest before a write is refused. Every array, map or ground value
    /// is one level. A tagged value is two, its wrapper and its representation, in every format.
    #[educe(Default(expression = MAX_DEPTH))]
    pub max_depth: usize,
}

impl WriterOptions {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Add one custom handler.
    pub fn handler(mut self, key: TypeKey, handler: Arc<dyn Handler>) -> Self {
        self.custom_handlers.push((key, handler));
        self
    }

    /// Start from a prebuilt handler table.
    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }
}

/// Writes values to a byte sink, one complete message per [`write`][Writer::write] call.
///
/// Each write starts with an empty string cache, so messages never depend on one another. The
/// sink is flushed at the end of every write and is never closed; get it back with
/// [`into_inner`][Writer::into_inner]. A writer is meant for one thread at a time.
#[derive(Debug)]
pub struct Writer<W: Write> {
    format: Format,
    emitter: Emitter<FormatBackend<W>>,
    cache: WriteCache,
}

impl<W: Write> Writer<W> {
    pub fn new(output: W, options: WriterOptions) -> Self {
        let format = options.format;
        let mut registry = options
            .registry
            .unwrap_or_else(HandlerRegistry::default_handlers);
        registry.merge(options.custom_handlers);
        if format.is_verbose() {
            registry = registry.verbose_view();
        }
        debug!(
            "writer: format {}, {} handlers, max depth {}",
            format,
            registry.len(),
            options.max_depth
        );
        let backend = match format {
            Format::TextCompact | Format::TextVerbose => {
                FormatBackend::Json(JsonBackend::new(output))
            }
            Format::Binary => FormatBackend::Msgpack(MsgpackBackend::new(output)),
        };
        Self {
            format,
            emitter: Emitter::new(backend, registry, format.is_verbose(), options.max_depth),
            cache: WriteCache::new(!format.is_verbose()),
        }
    }

    /// Write one value as a complete message and flush the sink.
    ///
    /// On failure, whatever reached the sink before the failure stays there.
    pub fn write(&mut self, v: &Value) -> Result<(), WriteError> {
        trace!("write: {} as {}", v.type_name(), self.format);
        self.emitter.reset();
        let cache = self.cache.init();
        self.emitter.emit(v, false, cache)?;
        self.emitter.flush()?;
        Ok(())
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn get_ref(&self) -> &W {
        self.emitter.backend().get_ref()
    }

    /// Direct access to the sink. Writing to it between messages will corrupt the stream for
    /// any reader.
    pub fn get_mut(&mut self) -> &mut W {
        self.emitter.backend_mut().get_mut()
    }

    pub fn into_inner(self) -> W {
        self.emitter.into_backend().into_inner()
    }
}

/// Create a writer over `sink`.
pub fn create_writer<W: Write>(sink: W, options: WriterOptions) -> Writer<W> {
    Writer::new(sink, options)
}

/// Encode one value into a new byte vector.
pub fn to_vec(v: &Value, format: Format) -> Result<Vec<u8>, WriteError> {
    to_vec_with(v, WriterOptions::new(format))
}

pub fn to_vec_with(v: &Value, options: WriterOptions) -> Result<Vec<u8>, WriteError> {
    let mut writer = Writer::new(Vec::new(), options);
    writer.write(v)?;
    Ok(writer.into_inner())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cache::code_to_index;
    use crate::error::Error;
    use crate::testing::{read_json, read_msgpack};
    use crate::types::*;
    use crate::{Integer, Timestamp};
    use num_bigint::BigInt;
    use rand::{distributions::Alphanumeric, Rng};
    use std::borrow::Cow;
    use std::io;
    use uuid::Uuid;

    const ALL: [Format; 3] = [Format::TextCompact, Format::TextVerbose, Format::Binary];

    fn read(format: Format, bytes: &[u8]) -> Vec<Value> {
        match format {
            Format::Binary => read_msgpack(bytes),
            _ => read_json(bytes),
        }
    }

    fn roundtrip(v: &Value) {
        for format in ALL {
            let bytes = to_vec(v, format).unwrap();
            let decoded = read(format, &bytes);
            assert_eq!(decoded, vec![v.clone()], "{} roundtrip of {:?}", format, v);
        }
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    fn sample() -> Value {
        Value::map(vec![
            (Value::from("name"), Value::from("transit")),
            (Value::from("count"), Value::from(42)),
            (Value::from("big"), Value::from(u64::MAX)),
            (Value::from("neg"), Value::from(i64::MIN)),
            (Value::from("ratio"), Value::from(2.25)),
            (Value::from("ok"), Value::from(false)),
            (Value::from("none"), Value::Null),
            (Value::from("~tricky"), Value::from("^not a code")),
            (
                Value::keyword("tags"),
                Value::Set(vec![Value::keyword("a1"), Value::symbol("b2")]),
            ),
            (
                Value::from("when"),
                Value::Timestamp(Timestamp::from_millis(1_400_000_000_123)),
            ),
            (
                Value::from("id"),
                Value::Uuid(Uuid::parse_str("5a2cbea3-e8c6-428b-b525-21239370dd55").unwrap()),
            ),
            (Value::from("blob"), Value::Bin(vec![0, 1, 2, 254, 255])),
            (Value::from("home"), Value::uri("http://example.com/")),
            (Value::from("chars"), Value::Chars(vec!['x', '~'])),
            (Value::from("longs"), Value::Longs(vec![1, -1, i64::MAX])),
            (Value::from("doubles"), Value::Doubles(vec![0.5, -2.0])),
            (Value::from("floats"), Value::Floats(vec![0.25, -1.5])),
            (Value::from("letter"), Value::from('~')),
            (Value::from("sym"), Value::symbol("kind")),
            (Value::from("bools"), Value::Bools(vec![true, false])),
            (Value::from("shorts"), Value::Shorts(vec![-3, 3])),
            (Value::from("ints"), Value::Ints(vec![i32::MIN, 0])),
            (
                Value::from("bigint"),
                Value::BigInt(BigInt::from(u64::MAX) * BigInt::from(1000)),
            ),
            (Value::from("dec"), Value::Decimal(Decimal::new(12345, -2))),
            (
                Value::from("frac"),
                Value::from(Ratio::new(BigInt::from(-1), BigInt::from(3)).unwrap()),
            ),
            (
                Value::from("link"),
                Value::from(
                    Link::new(Uri::new("http://example.com/a"), "next")
                        .with_prompt("go")
                        .with_render(LinkRender::Image),
                ),
            ),
            (
                Value::from("nested"),
                Value::Array(vec![
                    Value::map(vec![(Value::from(1), Value::from("one"))]),
                    Value::map(vec![(
                        Value::Array(vec![Value::from(1)]),
                        Value::from("composite key"),
                    )]),
                    Value::Array(vec![]),
                    Value::map(Vec::<(Value, Value)>::new()),
                ]),
            ),
            (
                Value::from("custom"),
                Value::tagged("point", vec![Value::from(1), Value::from(2)]),
            ),
        ])
    }

    #[test]
    fn null_in_every_format() {
        assert_eq!(to_vec(&Value::Null, Format::TextCompact).unwrap(), b"null");
        assert_eq!(to_vec(&Value::Null, Format::TextVerbose).unwrap(), b"null");
        assert_eq!(to_vec(&Value::Null, Format::Binary).unwrap(), vec![0xc0]);
    }

    #[test]
    fn roundtrip_ground_values() {
        roundtrip(&Value::Null);
        roundtrip(&Value::from(true));
        roundtrip(&Value::from("plain"));
        roundtrip(&Value::from("~#looks-like-a-tag"));
        roundtrip(&Value::from(-12));
        roundtrip(&Value::from(1i64 << 60));
        roundtrip(&Value::from(0.125));
    }

    #[test]
    fn roundtrip_everything() {
        roundtrip(&sample());
    }

    #[test]
    fn roundtrip_tagged_scalars() {
        roundtrip(&Value::tagged("x", 5));
        roundtrip(&Value::tagged("i", 5));
        roundtrip(&Value::tagged("s", Value::Null));
        roundtrip(&Value::tagged("x", true));
        roundtrip(&Value::Array(vec![Value::tagged("x", 5), Value::tagged("x", "five")]));
        roundtrip(&Value::map(vec![
            (Value::tagged("x", 5), Value::from(1)),
            (Value::from("plain"), Value::from(2)),
        ]));
    }

    #[test]
    fn single_precision_stays_single_in_binary() {
        let v = Value::Array(vec![Value::F32(1.5), Value::F32(-0.375)]);
        let bytes = to_vec(&v, Format::Binary).unwrap();
        assert_eq!(read_msgpack(&bytes), vec![v]);
    }

    #[test]
    fn roundtrip_random_strings() {
        let mut rng = rand::thread_rng();
        let prefixes = ["", "~", "^", "`", "~#", "~:", "^0", "~~"];
        let mut entries = Vec::new();
        for i in 0..200 {
            let len = rng.gen_range(0..6);
            let body: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(len)
                .map(char::from)
                .collect();
            // The index keeps keys unique.
            let s = format!("{}{}{}", prefixes[i % prefixes.len()], i, body);
            entries.push((Value::from(s.as_str()), Value::Array(vec![Value::from(s)])));
        }
        roundtrip(&Value::map(entries.clone()));
        roundtrip(&Value::Array(entries.into_iter().map(|(k, _)| k).collect()));
    }

    #[test]
    fn map_key_that_looks_like_a_tag() {
        let v = Value::map(vec![(Value::from("~#foo"), Value::from(1))]);
        let out = text(to_vec(&v, Format::TextCompact).unwrap());
        assert_eq!(out, r#"{"~~#foo":1}"#);
        roundtrip(&v);
    }

    #[test]
    fn cache_scope_is_one_write() {
        let kw = Value::keyword("alpha");
        let mut writer = create_writer(Vec::new(), WriterOptions::default());
        writer.write(&kw).unwrap();
        writer.write(&kw).unwrap();
        assert_eq!(text(writer.into_inner()), r#""~:alpha" "~:alpha""#);

        let out = to_vec(&Value::Array(vec![kw.clone(), kw]), Format::TextCompact).unwrap();
        assert_eq!(text(out), r#"["~:alpha","^0"]"#);
    }

    #[test]
    fn cache_is_transparent() {
        let v = sample();
        let compact = read_json(&to_vec(&v, Format::TextCompact).unwrap());
        let verbose = read_json(&to_vec(&v, Format::TextVerbose).unwrap());
        assert_eq!(compact, verbose);
    }

    fn repeated_keys() -> Value {
        let entry = |n: i64| {
            Value::map(vec![
                (Value::from("first_name"), Value::from(n)),
                (Value::from("last_name"), Value::from(n + 1)),
                (Value::from("location"), Value::from(n + 2)),
            ])
        };
        Value::Array((0..5).map(entry).collect())
    }

    fn has_code(values: &serde_json::Value) -> bool {
        match values {
            serde_json::Value::String(s) => code_to_index(s).is_some(),
            serde_json::Value::Array(items) => items.iter().any(has_code),
            serde_json::Value::Object(map) => map
                .iter()
                .any(|(k, v)| code_to_index(k).is_some() || has_code(v)),
            _ => false,
        }
    }

    #[test]
    fn compact_is_smaller_than_verbose() {
        let v = repeated_keys();
        let compact = to_vec(&v, Format::TextCompact).unwrap();
        let verbose = to_vec(&v, Format::TextVerbose).unwrap();
        assert!(compact.len() < verbose.len());
        assert!(has_code(&serde_json::from_slice(&compact).unwrap()));
        assert!(!has_code(&serde_json::from_slice(&verbose).unwrap()));
        roundtrip(&v);
    }

    #[derive(Debug)]
    struct Point {
        x: i64,
        y: i64,
    }

    #[derive(Debug)]
    struct PointHandler;

    impl Handler for PointHandler {
        fn tag<'a>(&self, _: &'a Value) -> crate::Result<Cow<'a, str>> {
            Ok(Cow::Borrowed("point"))
        }

        fn rep<'a>(&self, v: &'a Value) -> crate::Result<Cow<'a, Value>> {
            let p = v
                .downcast_ext::<Point>()
                .ok_or_else(|| crate::handler::mismatch("point", v))?;
            Ok(Cow::Owned(Value::Array(vec![p.x.into(), p.y.into()])))
        }
    }

    #[test]
    fn custom_extension() {
        let options = WriterOptions::new(Format::Binary)
            .handler(TypeKey::of::<Point>(), Arc::new(PointHandler));
        let v = Value::ext(Point { x: 3, y: -4 });
        let decoded = read_msgpack(&to_vec_with(&v, options).unwrap());
        assert_eq!(
            decoded,
            vec![Value::tagged("point", vec![Value::from(3), Value::from(-4)])]
        );

        let options = WriterOptions::new(Format::TextVerbose)
            .handler(TypeKey::of::<Point>(), Arc::new(PointHandler));
        let out = text(to_vec_with(&v, options).unwrap());
        assert_eq!(out, r#"{"~#point":[3,-4]}"#);
    }

    #[test]
    fn unregistered_type() {
        let err = to_vec(&Value::ext(Point { x: 0, y: 0 }), Format::TextCompact).unwrap_err();
        match err.cause() {
            Error::UnregisteredType(name) => assert!(name.ends_with("Point"), "got {}", name),
            other => panic!("unexpected cause {:?}", other),
        }
    }

    #[test]
    fn handler_registered_for_another_type_is_not_used() {
        #[derive(Debug)]
        struct Other;
        let options =
            WriterOptions::default().handler(TypeKey::of::<Point>(), Arc::new(PointHandler));
        let err = to_vec_with(&Value::ext(Other), options).unwrap_err();
        assert!(matches!(err.cause(), Error::UnregisteredType(_)));
    }

    struct FailingSink;

    impl io::Write for FailingSink {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_failure() {
        let mut writer = create_writer(FailingSink, WriterOptions::new(Format::Binary));
        let err = writer.write(&Value::from(1)).unwrap_err();
        assert!(matches!(err.cause(), Error::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn writer_recovers_after_failure() {
        let mut writer = create_writer(Vec::new(), WriterOptions::default());
        let bad = Value::Array(vec![Value::from(1), Value::ext(Point { x: 0, y: 0 })]);
        assert!(writer.write(&bad).is_err());
        writer.write(&Value::from(2)).unwrap();
        assert!(text(writer.into_inner()).ends_with("2"));
    }

    #[test]
    fn depth_limit_is_configurable() {
        let mut v = Value::from(0);
        for _ in 0..10 {
            v = Value::Array(vec![v]);
        }
        let mut options = WriterOptions::default();
        options.max_depth = 5;
        let err = to_vec_with(&v, options).unwrap_err();
        assert!(matches!(err.cause(), Error::DepthLimit(5)));
        assert!(to_vec(&v, Format::TextCompact).is_ok());
    }

    #[test]
    fn depth_counts_the_same_in_every_format() {
        let mut v = Value::Timestamp(Timestamp::from_millis(7));
        for i in 0..30 {
            v = match i % 3 {
                0 => Value::Set(vec![v]),
                1 => Value::map(vec![(Value::from("k"), v)]),
                _ => Value::tagged("box", v),
            };
        }
        let fits = |format: Format, max_depth: usize| {
            let mut options = WriterOptions::new(format);
            options.max_depth = max_depth;
            to_vec_with(&v, options).is_ok()
        };
        let needed = (1..200).find(|&d| fits(Format::TextCompact, d)).unwrap();
        for format in ALL {
            assert!(fits(format, needed), "{} at {}", format, needed);
            assert!(!fits(format, needed - 1), "{} at {}", format, needed - 1);
        }
    }

    #[test]
    fn shared_registry() {
        let mut base = HandlerRegistry::default_handlers();
        base.insert(TypeKey::of::<Point>(), Arc::new(PointHandler));
        let v = Value::ext(Point { x: 1, y: 2 });
        let first = to_vec_with(&v, WriterOptions::default().registry(base.clone())).unwrap();
        let second = to_vec_with(&v, WriterOptions::default().registry(base.clone())).unwrap();
        assert_eq!(text(first), r#"["~#point",1,2]"#);
        assert_eq!(text(second), r#"["~#point",1,2]"#);

        let options = WriterOptions::new(Format::TextVerbose).registry(base);
        let t = Value::Timestamp(Timestamp::from_millis(0));
        assert_eq!(text(to_vec_with(&t, options).unwrap()), r#""~t1970-01-01T00:00:00.000Z""#);

        let bare = WriterOptions::default().registry(HandlerRegistry::empty());
        let err = to_vec_with(&Value::from(1), bare).unwrap_err();
        assert!(matches!(err.cause(), Error::UnregisteredType(_)));
    }

    #[test]
    fn format_names() {
        for format in ALL {
            assert_eq!(format.to_string().parse::<Format>().unwrap(), format);
            let json = serde_json::to_string(&format).unwrap();
            assert_eq!(json, format!("\"{}\"", format));
            assert_eq!(serde_json::from_str::<Format>(&json).unwrap(), format);
        }
        assert!("yaml".parse::<Format>().is_err());
        assert_eq!(Format::default(), Format::TextCompact);
        assert_eq!(WriterOptions::default().max_depth, MAX_DEPTH);
    }

    #[test]
    fn integers_beyond_text_range() {
        let v = Value::Array(vec![
            Value::from(u64::MAX),
            Value::Int(Integer::from((1u64 << 53) - 1)),
        ]);
        let out = text(to_vec(&v, Format::TextCompact).unwrap());
        assert_eq!(out, r#"["~i18446744073709551615",9007199254740991]"#);
    }
}
