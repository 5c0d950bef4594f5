use std::cmp::{self, Ordering};
use std::convert::TryFrom;
use std::fmt::{self, Debug, Display};

use num_bigint::BigInt;
use num_traits::NumCast;

/// Largest magnitude a text reader can hold in an IEEE double without losing precision.
pub const MAX_SAFE_TEXT_INT: u64 = (1u64 << 53) - 1;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum IntPriv {
    /// Always non-less than zero.
    PosInt(u64),
    /// Always less than zero.
    NegInt(i64),
}

/// Any bounded integer, whether signed or unsigned.
///
/// Every fixed-width Rust integer converts into this through `From`, so they all share the one
/// integer handler. Values beyond `u64`/`i64` go in a [`BigInt`] instead.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Integer {
    n: IntPriv,
}

impl Integer {
    /// Minimum possible integer that can be represented. Equivalent to `i64::MIN`.
    pub fn min_value() -> Integer {
        Integer {
            n: IntPriv::NegInt(i64::MIN),
        }
    }

    /// Maximum possible integer that can be represented. Equivalent to `u64::MAX`.
    pub fn max_value() -> Integer {
        Integer {
            n: IntPriv::PosInt(u64::MAX),
        }
    }

    /// Returns `true` if the integer can be represented as `i64`.
    #[inline]
    pub fn is_i64(&self) -> bool {
        match self.n {
            IntPriv::PosInt(n) => n <= i64::MAX as u64,
            IntPriv::NegInt(..) => true,
        }
    }

    /// Returns `true` if the integer can be represented as `u64`.
    #[inline]
    pub fn is_u64(&self) -> bool {
        match self.n {
            IntPriv::PosInt(..) => true,
            IntPriv::NegInt(..) => false,
        }
    }

    /// Returns the integer represented as `i64` if possible, or else `None`.
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self.n {
            IntPriv::PosInt(n) => NumCast::from(n),
            IntPriv::NegInt(n) => Some(n),
        }
    }

    /// Returns the integer represented as `u64` if possible, or else `None`.
    #[inline]
    pub fn as_u64(&self) -> Option<u64> {
        match self.n {
            IntPriv::PosInt(n) => Some(n),
            IntPriv::NegInt(n) => NumCast::from(n),
        }
    }

    /// True if a reader parsing numbers into doubles would get this value back exactly.
    pub fn is_text_safe(&self) -> bool {
        match self.n {
            IntPriv::PosInt(n) => n <= MAX_SAFE_TEXT_INT,
            IntPriv::NegInt(n) => n.unsigned_abs() <= MAX_SAFE_TEXT_INT,
        }
    }
}

pub(crate) fn get_int_internal(val: &Integer) -> IntPriv {
    val.n
}

impl std::default::Default for Integer {
    fn default() -> Self {
        Self {
            n: IntPriv::PosInt(0),
        }
    }
}

impl cmp::Ord for Integer {
    fn cmp(&self, other: &Integer) -> Ordering {
        match (self.n, other.n) {
            (IntPriv::NegInt(lhs), IntPriv::NegInt(ref rhs)) => lhs.cmp(rhs),
            (IntPriv::NegInt(_), IntPriv::PosInt(_)) => Ordering::Less,
            (IntPriv::PosInt(_), IntPriv::NegInt(_)) => Ordering::Greater,
            (IntPriv::PosInt(lhs), IntPriv::PosInt(ref rhs)) => lhs.cmp(rhs),
        }
    }
}

impl cmp::PartialOrd for Integer {
    fn partial_cmp(&self, other: &Integer) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Debug for Integer {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        Debug::fmt(&self.n, fmt)
    }
}

impl Display for Integer {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self.n {
            IntPriv::PosInt(v) => Display::fmt(&v, fmt),
            IntPriv::NegInt(v) => Display::fmt(&v, fmt),
        }
    }
}

impl From<Integer> for BigInt {
    fn from(v: Integer) -> BigInt {
        match v.n {
            IntPriv::PosInt(n) => BigInt::from(n),
            IntPriv::NegInt(n) => BigInt::from(n),
        }
    }
}

macro_rules! int_conversions {
    (unsigned: $($u:ty),*; signed: $($s:ty),*) => {
        $(
            impl From<$u> for Integer {
                fn from(n: $u) -> Self {
                    Integer { n: IntPriv::PosInt(n as u64) }
                }
            }
        )*
        $(
            impl From<$s> for Integer {
                fn from(n: $s) -> Self {
                    let n = n as i64;
                    Integer {
                        n: if n < 0 { IntPriv::NegInt(n) } else { IntPriv::PosInt(n as u64) },
                    }
                }
            }
        )*
        $(
            impl TryFrom<Integer> for $u {
                type Error = Integer;
                fn try_from(v: Integer) -> Result<Self, Self::Error> {
                    narrow(v)
                }
            }
        )*
        $(
            impl TryFrom<Integer> for $s {
                type Error = Integer;
                fn try_from(v: Integer) -> Result<Self, Self::Error> {
                    narrow(v)
                }
            }
        )*
    };
}

fn narrow<T: TryFrom<u64> + TryFrom<i64>>(v: Integer) -> Result<T, Integer> {
    let narrowed = match v.n {
        IntPriv::PosInt(n) => <T as TryFrom<u64>>::try_from(n).ok(),
        IntPriv::NegInt(n) => <T as TryFrom<i64>>::try_from(n).ok(),
    };
    narrowed.ok_or(v)
}

int_conversions!(unsigned: u8, u16, u32, u64, usize; signed: i8, i16, i32, i64, isize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_collapse() {
        assert_eq!(Integer::from(5u8), Integer::from(5i64));
        assert_eq!(Integer::from(-5i8), Integer::from(-5isize));
        assert_eq!(Integer::from(u64::MAX), Integer::max_value());
        assert_eq!(Integer::from(i64::MIN), Integer::min_value());
        assert!(Integer::from(-1) < Integer::from(0u64));
        assert_eq!(i16::try_from(Integer::from(40_000u32)), Err(Integer::from(40_000u32)));
    }

    #[test]
    fn text_safe_range() {
        assert!(Integer::from(MAX_SAFE_TEXT_INT).is_text_safe());
        assert!(!Integer::from(MAX_SAFE_TEXT_INT + 1).is_text_safe());
        assert!(Integer::from(-(MAX_SAFE_TEXT_INT as i64)).is_text_safe());
        assert!(!Integer::from(-(MAX_SAFE_TEXT_INT as i64) - 1).is_text_safe());
        assert!(!Integer::min_value().is_text_safe());
    }

    #[test]
    fn display() {
        assert_eq!(Integer::max_value().to_string(), "18446744073709551615");
        assert_eq!(Integer::min_value().to_string(), "-9223372036854775808");
        assert_eq!(BigInt::from(Integer::from(-7)), BigInt::from(-7));
    }
}
