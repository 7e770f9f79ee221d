//! Text that is stored either as one string or as a list of lines.

use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A notebook text field.
///
/// Notebook writers are free to emit `"source": "a\nb"` or
/// `"source": ["a\n", "b"]`; both read into this type. Serialization uses
/// the line form when lines are held and the plain form otherwise, so the
/// original shape is not guaranteed to survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultilineString {
    Text(String),
    Lines(Vec<String>),
}

impl MultilineString {
    /// The full text, with lines concatenated as written.
    pub fn text(&self) -> String {
        match self {
            MultilineString::Text(s) => s.clone(),
            MultilineString::Lines(lines) => lines.concat(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            MultilineString::Text(s) => s.is_empty(),
            MultilineString::Lines(lines) => lines.iter().all(|l| l.is_empty()),
        }
    }
}

impl Default for MultilineString {
    fn default() -> Self {
        MultilineString::Text(String::new())
    }
}

impl From<&str> for MultilineString {
    fn from(s: &str) -> Self {
        MultilineString::Text(s.to_string())
    }
}

impl From<Vec<String>> for MultilineString {
    fn from(lines: Vec<String>) -> Self {
        MultilineString::Lines(lines)
    }
}

impl Serialize for MultilineString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MultilineString::Lines(lines) if !lines.is_empty() => lines.serialize(serializer),
            MultilineString::Lines(_) => serializer.serialize_str(""),
            MultilineString::Text(s) => serializer.serialize_str(s),
        }
    }
}

struct MultilineVisitor;

impl<'de> Visitor<'de> for MultilineVisitor {
    type Value = MultilineString;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or a list of strings")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(MultilineString::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(MultilineString::Text(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(MultilineString::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(MultilineString::default())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(MultilineVisitor)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut lines = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        // null entries read as empty lines
        while let Some(line) = seq.next_element::<Option<String>>()? {
            lines.push(line.unwrap_or_default());
        }
        Ok(MultilineString::Lines(lines))
    }
}

impl<'de> Deserialize<'de> for MultilineString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MultilineVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_plain_string() {
        let ms: MultilineString = serde_json::from_str(r#""print(1)""#).unwrap();
        assert_eq!(ms, MultilineString::Text("print(1)".into()));
        assert_eq!(ms.text(), "print(1)");
    }

    #[test]
    fn test_reads_line_list() {
        let ms: MultilineString = serde_json::from_str(r#"["a\n", "b"]"#).unwrap();
        assert_eq!(ms.text(), "a\nb");
        assert_eq!(serde_json::to_string(&ms).unwrap(), r#"["a\n","b"]"#);
    }

    #[test]
    fn test_null_and_null_lines_are_empty() {
        let ms: MultilineString = serde_json::from_str("null").unwrap();
        assert!(ms.is_empty());

        let ms: MultilineString = serde_json::from_str(r#"["x", null]"#).unwrap();
        assert_eq!(ms, MultilineString::Lines(vec!["x".into(), String::new()]));
    }

    #[test]
    fn test_empty_line_list_serializes_as_string() {
        let ms = MultilineString::Lines(vec![]);
        assert_eq!(serde_json::to_string(&ms).unwrap(), r#""""#);
    }

    #[test]
    fn test_rejects_numbers() {
        assert!(serde_json::from_str::<MultilineString>("42").is_err());
    }
}
