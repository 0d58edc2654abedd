//! Device messages and the line parser
//!
//! A [`DeviceMessage`] is the decoded form of one frame: a map from lower-cased
//! attribute key to lower-cased value. The parser is deliberately lenient;
//! malformed segments are skipped and a line with nothing usable yields `None`.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ParseError;

/// Receive terminator used by the strict [`FromStr`] implementation
pub const DEFAULT_TERMINATOR: &str = "$";

/// One decoded status message pushed (or answered) by a device.
///
/// Keys and values are always lower-cased. Keys are kept in sorted order so
/// the [`Display`](fmt::Display) rendering is deterministic.
///
/// # Example
///
/// ```rust
/// use rotel_parser::DeviceMessage;
///
/// let message: DeviceMessage = "Power=ON,Volume=45$".parse().unwrap();
/// assert_eq!(message.get("power"), Some("on"));
/// assert_eq!(message.to_string(), "power=on,volume=45");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeviceMessage(BTreeMap<String, String>);

impl DeviceMessage {
    /// Look up the value of an attribute
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether the message carries the given attribute
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of attributes in the message
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the message has no attributes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(key, value)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Attribute keys in key order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The single value of a one-attribute message
    ///
    /// Returns `None` when the message has zero or several attributes.
    pub fn single_value(&self) -> Option<&str> {
        if self.0.len() == 1 {
            self.0.values().next().map(String::as_str)
        } else {
            None
        }
    }

    /// Consume the message and return the underlying map
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl<K, V> FromIterator<(K, V)> for DeviceMessage
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.as_ref().to_lowercase(), v.as_ref().to_lowercase()))
                .collect(),
        )
    }
}

impl IntoIterator for DeviceMessage {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for DeviceMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (key, value)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

impl FromStr for DeviceMessage {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if strip_line(s, DEFAULT_TERMINATOR).is_empty() {
            return Err(ParseError::Empty);
        }
        parse_line(s, DEFAULT_TERMINATOR).ok_or_else(|| ParseError::NoAssignment(s.to_string()))
    }
}

/// Parse one received line into a [`DeviceMessage`].
///
/// Trailing and leading `terminator` characters plus surrounding whitespace are
/// stripped first. The line is rejected when nothing remains or no `=` is
/// present. Otherwise all whitespace is removed, the line is split on `,`, and
/// each segment containing `=` is split once on its first `=`.
///
/// Returns `None` when no segment yields an assignment. Never panics.
///
/// ```rust
/// use rotel_parser::parse_line;
///
/// assert_eq!(parse_line("source=CD$", "$").unwrap().get("source"), Some("cd"));
/// assert!(parse_line("garbage$", "$").is_none());
/// ```
pub fn parse_line(raw: &str, terminator: &str) -> Option<DeviceMessage> {
    let line = strip_line(raw, terminator);
    if line.is_empty() || !line.contains('=') {
        return None;
    }

    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    let mut attributes = BTreeMap::new();
    for segment in compact.split(',').filter(|segment| !segment.is_empty()) {
        if let Some((key, value)) = segment.split_once('=') {
            attributes.insert(key.to_lowercase(), value.to_lowercase());
        }
    }

    if attributes.is_empty() {
        None
    } else {
        Some(DeviceMessage(attributes))
    }
}

fn strip_line<'a>(raw: &'a str, terminator: &str) -> &'a str {
    let trimmed = raw.trim();
    if terminator.is_empty() {
        return trimmed;
    }
    trimmed
        .trim_start_matches(terminator)
        .trim_end_matches(terminator)
        .trim()
}
