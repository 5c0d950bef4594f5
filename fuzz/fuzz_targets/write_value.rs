#![no_main]
use libfuzzer_sys::fuzz_target;
use transit_pack::*;

// Arbitrary strings in every position a string can take: plain values, map keys, keywords,
// and tag names. Writing must never panic, whatever the text looks like.
fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let parts: Vec<&str> = text.split('\u{0}').collect();
    let mut entries = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        let val = match i % 4 {
            0 => Value::from(*part),
            1 => Value::keyword(*part),
            2 => Value::tagged(*part, Value::from(i)),
            _ => Value::Array(vec![Value::from(*part), Value::from(*part)]),
        };
        entries.push((Value::from(*part), val));
    }
    let value = Value::map(entries);
    for format in [Format::TextCompact, Format::TextVerbose, Format::Binary] {
        let _ = to_vec(&value, format);
    }
});
