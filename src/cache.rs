//! Per-write string cache.
//!
//! Within one top-level write, map keys and tag-like strings (`~#tag`, `~:keyword`, `~$symbol`)
//! that come up more than once are replaced after their first appearance by a short code: `^`
//! followed by one or two digits from a 44-symbol alphabet starting at ASCII `0`. A reader that
//! records the same strings in the same order recovers them from the codes.
//!
//! Format parameters (version 1):
//! - Strings shorter than [`MIN_SIZE_CACHEABLE`] bytes are never cached; the code would be about
//!   as long as the string.
//! - At most [`MAX_CACHE_ENTRIES`] codes are issued per write. Past that, new strings go out
//!   literally while codes already issued stay in use.
//! - Nothing carries over between writes.

use std::collections::HashMap;

use log::{debug, trace};

/// Escape character opening every tagged string.
pub const ESC: char = '~';
/// Prefix of a cache code.
pub const SUB: char = '^';
/// Reserved for future use. Strings starting with it are escaped.
pub const RESERVED: char = '`';
/// Prefix of a tag in wrapper form.
pub const ESC_TAG: &str = "~#";

pub const MIN_SIZE_CACHEABLE: usize = 4;
pub const CACHE_CODE_DIGITS: usize = 44;
pub const MAX_CACHE_ENTRIES: usize = CACHE_CODE_DIGITS * CACHE_CODE_DIGITS;
const BASE_CHAR_IDX: u8 = 48;

/// Whether a string is worth replacing with a code when it repeats.
pub fn is_cacheable(s: &str, as_map_key: bool) -> bool {
    if s.len() < MIN_SIZE_CACHEABLE {
        return false;
    }
    if as_map_key {
        return true;
    }
    let b = s.as_bytes();
    b[0] == ESC as u8 && matches!(b[1], b':' | b'$' | b'#')
}

/// The code for the `index`th cached string of a write.
pub fn index_to_code(index: usize) -> String {
    let hi = index / CACHE_CODE_DIGITS;
    let lo = index % CACHE_CODE_DIGITS;
    let mut code = String::with_capacity(3);
    code.push(SUB);
    if hi != 0 {
        code.push((hi as u8 + BASE_CHAR_IDX) as char);
    }
    code.push((lo as u8 + BASE_CHAR_IDX) as char);
    code
}

/// Inverse of [`index_to_code`]. `None` if the string isn't a cache code.
pub fn code_to_index(code: &str) -> Option<usize> {
    let b = code.as_bytes();
    if b.first() != Some(&(SUB as u8)) {
        return None;
    }
    let digit = |c: u8| {
        let d = c.checked_sub(BASE_CHAR_IDX)? as usize;
        if d < CACHE_CODE_DIGITS {
            Some(d)
        } else {
            None
        }
    };
    match b.len() {
        2 => digit(b[1]),
        3 => Some(digit(b[1])? * CACHE_CODE_DIGITS + digit(b[2])?),
        _ => None,
    }
}

/// Maps strings already written in the current top-level write to their codes.
#[derive(Clone, Debug)]
pub struct WriteCache {
    enabled: bool,
    index: usize,
    cache: HashMap<String, String>,
}

impl WriteCache {
    /// A disabled cache passes every string through untouched.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            index: 0,
            cache: HashMap::new(),
        }
    }

    /// Forget everything from the previous write. Called at the start of each top-level write.
    pub fn init(&mut self) -> &mut Self {
        self.index = 0;
        self.cache.clear();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of codes issued so far in this write.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Returns what to put on the wire for `s`: its code if it was already seen in this write,
    /// otherwise `s` itself. A first sighting of a cacheable string is recorded for next time.
    pub fn cache_write<'a>(&'a mut self, s: &'a str, as_map_key: bool) -> &'a str {
        if !self.enabled || !is_cacheable(s, as_map_key) {
            return s;
        }
        if self.cache.contains_key(s) {
            return &self.cache[s];
        }
        if self.index < MAX_CACHE_ENTRIES {
            let code = index_to_code(self.index);
            trace!("cache: {} -> {}", s, code);
            self.cache.insert(s.to_string(), code);
            self.index += 1;
            if self.index == MAX_CACHE_ENTRIES {
                debug!("cache: all {} codes issued for this write", MAX_CACHE_ENTRIES);
            }
        }
        s
    }
}
