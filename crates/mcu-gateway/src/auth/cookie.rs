//! Cookie header parsing.
//!
//! Pairs are separated by `"; "` and split on the first `=`. Names and
//! values are percent-decoded, `+` decodes to a space, and malformed escape
//! sequences are kept verbatim.

use std::collections::HashMap;

/// Parsed `Cookie` header. A name may occur more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    values: HashMap<String, Vec<String>>,
}

impl CookieJar {
    pub fn parse(header: &str) -> Self {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for pair in header.split("; ") {
            if pair.is_empty() {
                continue;
            }
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            values
                .entry(decode(name))
                .or_default()
                .push(decode(value));
        }
        Self { values }
    }

    /// Every value sent under `name`, in header order.
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// The value of `name`, only when it was sent exactly once.
    pub fn get_single(&self, name: &str) -> Option<&str> {
        match self.get_all(name)? {
            [value] => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

fn decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
