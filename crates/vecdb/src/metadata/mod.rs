//! Metadata maps and their `key=value;key2=value2` line encoding.
//!
//! The encoding escapes `\`, `;` and `=` with a leading backslash. Keys are
//! emitted in sorted order so that encoding is canonical, which the on-disk
//! `meta.txt` format relies on for deterministic output.

use std::collections::BTreeMap;

use crate::error::{Result, VecdbError};

/// A metadata mapping attached to a stored vector.
///
/// `BTreeMap` keeps keys ordered, so [`encode`] is canonical without an
/// explicit sort.
pub type Metadata = BTreeMap<String, String>;

fn escape_token(s: &str, out: &mut String) {
    for c in s.chars() {
        if c == '\\' || c == ';' || c == '=' {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Encode a metadata map into a single line.
///
/// An empty map encodes to the empty string.
#[must_use]
pub fn encode(meta: &Metadata) -> String {
    let mut out = String::new();
    for (i, (key, value)) in meta.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        escape_token(key, &mut out);
        out.push('=');
        escape_token(value, &mut out);
    }
    out
}

/// Decode a metadata line into a map.
///
/// Empty input decodes to an empty map. Pairs with empty keys are dropped.
///
/// # Errors
///
/// Returns [`VecdbError::CorruptState`] if the line ends in a dangling
/// escape character.
pub fn decode(line: &str) -> Result<Metadata> {
    let mut out = Metadata::new();
    if line.is_empty() {
        return Ok(out);
    }

    let mut key = String::new();
    let mut value = String::new();
    let mut in_key = true;
    let mut escaped = false;

    let mut flush = |key: &mut String, value: &mut String| {
        if !key.is_empty() {
            out.insert(std::mem::take(key), std::mem::take(value));
        } else {
            key.clear();
            value.clear();
        }
    };

    for c in line.chars() {
        if escaped {
            let target = if in_key { &mut key } else { &mut value };
            target.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' if in_key => in_key = false,
            ';' if !in_key => {
                flush(&mut key, &mut value);
                in_key = true;
            }
            _ => {
                let target = if in_key { &mut key } else { &mut value };
                target.push(c);
            }
        }
    }

    if escaped {
        return Err(VecdbError::CorruptState(
            "metadata trailing escape".into(),
        ));
    }
    if !key.is_empty() || !value.is_empty() {
        flush(&mut key, &mut value);
    }
    Ok(out)
}

#[cfg(test)]
mod proptest_tests;

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode(&Metadata::new()), "");
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode("").unwrap(), Metadata::new());
    }

    #[test]
    fn test_encode_sorted_keys() {
        let m = meta(&[("z", "1"), ("a", "2"), ("m", "3")]);
        assert_eq!(encode(&m), "a=2;m=3;z=1");
    }

    #[test]
    fn test_roundtrip_plain() {
        let m = meta(&[("lang", "en"), ("source", "wiki")]);
        assert_eq!(decode(&encode(&m)).unwrap(), m);
    }

    #[test]
    fn test_roundtrip_special_chars() {
        let m = meta(&[("k=1", "a;b"), ("path", "c:\\tmp"), ("eq", "a=b=c")]);
        let line = encode(&m);
        assert_eq!(decode(&line).unwrap(), m);
    }

    #[test]
    fn test_decode_trailing_escape_is_error() {
        let err = decode("a=b\\").unwrap_err();
        assert!(matches!(err, VecdbError::CorruptState(_)));
    }

    #[test]
    fn test_decode_drops_empty_keys() {
        let m = decode("=orphan;a=1").unwrap();
        assert_eq!(m, meta(&[("a", "1")]));
    }

    #[test]
    fn test_decode_value_missing() {
        // a bare token becomes a key with an empty value
        let m = decode("flag").unwrap();
        assert_eq!(m, meta(&[("flag", "")]));
    }
}
