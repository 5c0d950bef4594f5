//! Semantic types with no native wire primitive of their own. Each one is written through a tagged
//! extension form by its default handler.

use std::fmt;

use num_bigint::{BigInt, Sign};
use num_traits::Zero;

use crate::value::Value;

/// A symbolic keyword, such as `:status`. Held without the leading colon.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keyword(String);

impl Keyword {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Keyword(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

/// A symbolic identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Symbol(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A URI. The text is carried as given; no parsing or normalization happens on write.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uri(String);

impl Uri {
    pub fn new<S: Into<String>>(uri: S) -> Self {
        Uri(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Arbitrary-precision decimal, `coefficient * 10^exponent`.
///
/// The text form follows the usual big-decimal rules: plain notation when the exponent is zero
/// or negative and the number isn't too small, scientific notation otherwise.
/// `Decimal::new(12345, -2)` reads `123.45`; `Decimal::new(1, 3)` reads `1E+3`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Decimal {
    coefficient: BigInt,
    exponent: i64,
}

impl Decimal {
    pub fn new<C: Into<BigInt>>(coefficient: C, exponent: i64) -> Self {
        Decimal {
            coefficient: coefficient.into(),
            exponent,
        }
    }

    pub fn coefficient(&self) -> &BigInt {
        &self.coefficient
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.coefficient.sign() == Sign::Minus {
            f.write_str("-")?;
        }
        let digits = self.coefficient.magnitude().to_string();
        let len = digits.len() as i64;
        let scale = -(self.exponent as i128);
        let adjusted = -scale + (len as i128 - 1);
        if scale == 0 {
            f.write_str(&digits)
        } else if scale > 0 && adjusted >= -6 {
            let scale = scale as i64;
            if len > scale {
                let (int_part, frac_part) = digits.split_at((len - scale) as usize);
                write!(f, "{}.{}", int_part, frac_part)
            } else {
                f.write_str("0.")?;
                for _ in 0..(scale - len) {
                    f.write_str("0")?;
                }
                f.write_str(&digits)
            }
        } else {
            let (first, rest) = digits.split_at(1);
            f.write_str(first)?;
            if !rest.is_empty() {
                write!(f, ".{}", rest)?;
            }
            if adjusted >= 0 {
                write!(f, "E+{}", adjusted)
            } else {
                write!(f, "E{}", adjusted)
            }
        }
    }
}

/// An exact rational number.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ratio {
    numerator: BigInt,
    denominator: BigInt,
}

impl Ratio {
    /// Fails if the denominator is zero. The fraction is not reduced.
    pub fn new<N: Into<BigInt>, D: Into<BigInt>>(numerator: N, denominator: D) -> Option<Self> {
        let denominator = denominator.into();
        if denominator.is_zero() {
            return None;
        }
        Some(Ratio {
            numerator: numerator.into(),
            denominator,
        })
    }

    pub fn numerator(&self) -> &BigInt {
        &self.numerator
    }

    pub fn denominator(&self) -> &BigInt {
        &self.denominator
    }
}

/// How a client should present a [`Link`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkRender {
    Link,
    Image,
}

impl LinkRender {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkRender::Link => "link",
            LinkRender::Image => "image",
        }
    }
}

/// A structured hyperlink.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Link {
    pub href: Uri,
    pub rel: String,
    pub name: Option<String>,
    pub prompt: Option<String>,
    pub render: Option<LinkRender>,
}

impl Link {
    pub fn new<R: Into<String>>(href: Uri, rel: R) -> Self {
        Link {
            href,
            rel: rel.into(),
            name: None,
            prompt: None,
            render: None,
        }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_render(mut self, render: LinkRender) -> Self {
        self.render = Some(render);
        self
    }
}

/// A tag and payload supplied directly by the caller. Always written in extension form, whatever
/// the payload is.
#[derive(Clone, Debug, PartialEq)]
pub struct TaggedValue {
    pub tag: String,
    pub rep: Box<Value>,
}

impl TaggedValue {
    pub fn new<T: Into<String>, V: Into<Value>>(tag: T, rep: V) -> Self {
        TaggedValue {
            tag: tag.into(),
            rep: Box::new(rep.into()),
        }
    }
}
