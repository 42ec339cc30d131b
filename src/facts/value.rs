//! Fact values
//!
//! A [`Value`] is built once by its producer and then owned by the
//! [`Collection`](super::Collection). It is deliberately not `Clone`: consumers
//! borrow values, they never copy trees.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Plain markup keys that YAML readers could take for a null or boolean.
const RESERVED_WORDS: &[&str] = &["null", "true", "false", "yes", "no", "on", "off", "y", "n"];

#[derive(Debug, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Boolean(bool),
    Double(f64),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Renders the value as a structured document tree.
    ///
    /// Documents have no NaN or infinity; those doubles become the strings
    /// `.nan`, `.inf` and `-.inf` and read back as strings.
    pub fn render_document(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Double(d) => match non_finite_spelling(*d) {
                Some(spelling) => serde_json::Value::String(spelling.to_string()),
                None => serde_json::Value::from(*d),
            },
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::render_document).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.render_document()))
                    .collect(),
            ),
        }
    }

    /// Builds a value from a structured document; `null` has no value form.
    ///
    /// Null array elements and object members are dropped.
    pub fn from_document(document: serde_json::Value) -> Option<Value> {
        let value = match document {
            serde_json::Value::Null => return None,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Double(n.as_f64()?),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().filter_map(Value::from_document).collect())
            }
            serde_json::Value::Object(members) => Value::Map(
                members
                    .into_iter()
                    .filter_map(|(key, value)| Value::from_document(value).map(|v| (key, v)))
                    .collect(),
            ),
        };
        Some(value)
    }

    /// Renders the human-readable form.
    ///
    /// Top-level strings are quoted only when `quoted` is set; strings nested
    /// in arrays and maps are always quoted.
    pub fn render_text(&self, quoted: bool) -> String {
        let mut out = String::new();
        self.write_text(&mut out, quoted, 0);
        out
    }

    /// Renders block-style markup (YAML) with every string double-quoted, so
    /// `"2"` or `"true"` never read back as a number or boolean.
    pub fn render_markup(&self) -> String {
        let mut out = String::new();
        match self {
            Value::Array(items) if !items.is_empty() => write_markup_sequence(items, &mut out, 0),
            Value::Map(map) if !map.is_empty() => write_markup_mapping(map, &mut out, 0),
            _ => {
                self.write_markup_scalar(&mut out);
                out.push('\n');
            }
        }
        out
    }

    /// Renders `key: value` as a top-level markup mapping entry.
    pub fn render_markup_entry(&self, key: &str) -> String {
        let mut out = String::new();
        write_markup_key(key, &mut out);
        out.push(':');
        self.write_markup_block(&mut out, 2);
        out
    }

    fn write_text(&self, out: &mut String, quoted: bool, level: usize) {
        match self {
            Value::String(s) if quoted => {
                out.push('"');
                out.push_str(s);
                out.push('"');
            }
            Value::String(s) => out.push_str(s),
            Value::Integer(i) => out.push_str(&i.to_string()),
            Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Double(d) => out.push_str(&d.to_string()),
            Value::Array(items) if items.is_empty() => out.push_str("[]"),
            Value::Array(items) => {
                out.push_str("[\n");
                for (index, item) in items.iter().enumerate() {
                    push_indent(out, (level + 1) * 2);
                    item.write_text(out, true, level + 1);
                    if index + 1 < items.len() {
                        out.push(',');
                    }
                    out.push('\n');
                }
                push_indent(out, level * 2);
                out.push(']');
            }
            Value::Map(map) if map.is_empty() => out.push_str("{}"),
            Value::Map(map) => {
                out.push_str("{\n");
                for (index, (key, value)) in map.iter().enumerate() {
                    push_indent(out, (level + 1) * 2);
                    out.push_str(key);
                    out.push_str(" => ");
                    value.write_text(out, true, level + 1);
                    if index + 1 < map.len() {
                        out.push(',');
                    }
                    out.push('\n');
                }
                push_indent(out, level * 2);
                out.push('}');
            }
        }
    }

    /// Writes the value following a `key:` or `-` marker.
    fn write_markup_block(&self, out: &mut String, indent: usize) {
        match self {
            Value::Array(items) if !items.is_empty() => {
                out.push('\n');
                write_markup_sequence(items, out, indent);
            }
            Value::Map(map) if !map.is_empty() => {
                out.push('\n');
                write_markup_mapping(map, out, indent);
            }
            _ => {
                out.push(' ');
                self.write_markup_scalar(out);
                out.push('\n');
            }
        }
    }

    /// Writes a sequence item; composites start on the marker's line.
    fn write_markup_item(&self, out: &mut String, indent: usize) {
        match self {
            Value::Array(items) if !items.is_empty() => {
                for (index, item) in items.iter().enumerate() {
                    if index == 0 {
                        out.push(' ');
                    } else {
                        push_indent(out, indent);
                    }
                    out.push('-');
                    item.write_markup_item(out, indent + 2);
                }
            }
            Value::Map(map) if !map.is_empty() => {
                for (index, (key, value)) in map.iter().enumerate() {
                    if index == 0 {
                        out.push(' ');
                    } else {
                        push_indent(out, indent);
                    }
                    write_markup_key(key, out);
                    out.push(':');
                    value.write_markup_block(out, indent + 2);
                }
            }
            _ => self.write_markup_block(out, indent),
        }
    }

    fn write_markup_scalar(&self, out: &mut String) {
        match self {
            Value::String(s) => write_quoted(s, out),
            Value::Integer(i) => out.push_str(&i.to_string()),
            Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Double(d) => match non_finite_spelling(*d) {
                Some(spelling) => out.push_str(spelling),
                // Debug keeps the fractional part ("2.0"), so readers see a float.
                None => out.push_str(&format!("{d:?}")),
            },
            Value::Array(_) => out.push_str("[]"),
            Value::Map(_) => out.push_str("{}"),
        }
    }
}

fn write_markup_sequence(items: &[Value], out: &mut String, indent: usize) {
    for item in items {
        push_indent(out, indent);
        out.push('-');
        item.write_markup_item(out, indent + 2);
    }
}

fn write_markup_mapping(map: &BTreeMap<String, Value>, out: &mut String, indent: usize) {
    for (key, value) in map {
        push_indent(out, indent);
        write_markup_key(key, out);
        out.push(':');
        value.write_markup_block(out, indent + 2);
    }
}

fn write_markup_key(key: &str, out: &mut String) {
    let plain = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !RESERVED_WORDS
            .iter()
            .any(|word| key.eq_ignore_ascii_case(word));
    if plain {
        out.push_str(key);
    } else {
        write_quoted(key, out);
    }
}

fn write_quoted(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn non_finite_spelling(d: f64) -> Option<&'static str> {
    if d.is_nan() {
        Some(".nan")
    } else if d.is_infinite() {
        Some(if d > 0.0 { ".inf" } else { "-.inf" })
    } else {
        None
    }
}

fn push_indent(out: &mut String, width: usize) {
    out.extend(std::iter::repeat_n(' ', width));
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_text(false))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Double(d) => match non_finite_spelling(*d) {
                Some(spelling) => serializer.serialize_str(spelling),
                None => serializer.serialize_f64(*d),
            },
            Value::Array(items) => serializer.collect_seq(items),
            Value::Map(map) => serializer.collect_map(map),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Value::Map(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> Value {
        let mut inner = BTreeMap::new();
        inner.insert("total_bytes".to_string(), Value::from(1024_i64));
        inner.insert("capacity".to_string(), Value::from("50.00%"));

        let mut map = BTreeMap::new();
        map.insert("system".to_string(), Value::from(inner));
        map.insert(
            "models".to_string(),
            Value::from(vec![Value::from("a"), Value::from("b")]),
        );
        Value::from(map)
    }

    #[test]
    fn test_text_quoting() {
        assert_eq!(Value::from("Linux").render_text(false), "Linux");
        assert_eq!(Value::from("Linux").render_text(true), "\"Linux\"");
        assert_eq!(Value::from(true).render_text(true), "true");
        assert_eq!(Value::from(42_i64).render_text(true), "42");
    }

    #[test]
    fn test_text_composites() {
        let expected = "{\n  models => [\n    \"a\",\n    \"b\"\n  ],\n  system => {\n    capacity => \"50.00%\",\n    total_bytes => 1024\n  }\n}";
        assert_eq!(sample_map().render_text(false), expected);
        assert_eq!(Value::Array(Vec::new()).render_text(false), "[]");
        assert_eq!(Value::Map(BTreeMap::new()).render_text(false), "{}");
    }

    #[test]
    fn test_markup_forces_string_quotes() {
        assert_eq!(Value::from("2").render_markup(), "\"2\"\n");
        assert_eq!(Value::from("true").render_markup(), "\"true\"\n");
        assert_eq!(Value::from(2_i64).render_markup(), "2\n");
        assert_eq!(Value::from(true).render_markup(), "true\n");
        assert_eq!(Value::from(2.0).render_markup(), "2.0\n");
    }

    #[test]
    fn test_markup_composites() {
        let expected = "models:\n  - \"a\"\n  - \"b\"\nsystem:\n  capacity: \"50.00%\"\n  total_bytes: 1024\n";
        assert_eq!(sample_map().render_markup(), expected);
    }

    #[test]
    fn test_markup_sequence_of_maps() {
        let mut first = BTreeMap::new();
        first.insert("name".to_string(), Value::from("eth0"));
        first.insert("mtu".to_string(), Value::from(1500_i64));
        let value = Value::from(vec![Value::from(first), Value::from(vec![Value::from("x")])]);
        assert_eq!(
            value.render_markup(),
            "- mtu: 1500\n  name: \"eth0\"\n- - \"x\"\n"
        );
    }

    #[test]
    fn test_markup_entry() {
        assert_eq!(
            Value::from("5.15.0").render_markup_entry("kernelversion"),
            "kernelversion: \"5.15.0\"\n"
        );
        assert_eq!(
            Value::from("x").render_markup_entry("1weird key"),
            "\"1weird key\": \"x\"\n"
        );
    }

    #[test]
    fn test_markup_escapes() {
        assert_eq!(
            Value::from("a \"b\"\n").render_markup(),
            "\"a \\\"b\\\"\\n\"\n"
        );
    }

    #[test]
    fn test_document_variants() {
        assert_eq!(Value::from("2").render_document(), serde_json::json!("2"));
        assert_eq!(Value::from(false).render_document(), serde_json::json!(false));
        assert_eq!(
            sample_map().render_document(),
            serde_json::json!({
                "models": ["a", "b"],
                "system": {"capacity": "50.00%", "total_bytes": 1024}
            })
        );
    }

    #[test]
    fn test_non_finite_doubles_render_as_markup_spellings() {
        assert_eq!(Value::from(f64::NAN).render_document(), serde_json::json!(".nan"));
        assert_eq!(
            Value::from(f64::NEG_INFINITY).render_document(),
            serde_json::json!("-.inf")
        );
        assert_eq!(Value::from(f64::INFINITY).render_markup(), ".inf\n");
        assert_eq!(
            serde_json::to_string(&Value::from(vec![Value::from(f64::INFINITY)])).unwrap(),
            r#"[".inf"]"#
        );
    }

    #[test]
    fn test_serialize_matches_document() {
        let mut map = BTreeMap::new();
        map.insert("ratio".to_string(), Value::from(0.25));
        map.insert("nested".to_string(), sample_map());
        let value = Value::from(map);

        let serialized: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&value).unwrap()).unwrap();
        assert_eq!(serialized, value.render_document());
    }

    #[test]
    fn test_from_document_drops_nulls() {
        let value = Value::from_document(serde_json::json!({"a": null, "b": [1, null, 2.5]})).unwrap();
        let map = value.as_map().unwrap();
        assert!(!map.contains_key("a"));
        assert_eq!(
            map["b"],
            Value::from(vec![Value::from(1_i64), Value::from(2.5)])
        );
        assert_eq!(Value::from_document(serde_json::Value::Null), None);
    }
}
