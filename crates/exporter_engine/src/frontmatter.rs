use serde_json::{Map, Value};

/// Recursive front-matter value; mappings keep insertion order.
pub type FrontMatterValue = Value;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrontMatterError {
    #[error("front matter must be a mapping, got {0}")]
    NotAMapping(&'static str),
}

/// YAML rendering of a top-level mapping, optionally wrapped as front matter.
#[derive(Debug, Clone, PartialEq)]
pub struct YamlDocument {
    value: Map<String, Value>,
    inline: bool,
}

impl YamlDocument {
    pub fn new(value: FrontMatterValue) -> Result<Self, FrontMatterError> {
        match value {
            Value::Object(map) => Ok(Self {
                value: map,
                inline: true,
            }),
            other => Err(FrontMatterError::NotAMapping(kind_name(&other))),
        }
    }

    /// `tags: ["a", "b"]`
    pub fn inline(mut self, enable: bool) -> Self {
        self.inline = enable;
        self
    }

    /// ```yaml
    /// tags:
    ///   - a
    ///   - b
    /// ```
    pub fn block(mut self, enable: bool) -> Self {
        self.inline = !enable;
        self
    }

    pub fn convert(&self) -> String {
        encode_mapping(&self.value, 0, self.inline)
    }

    pub fn front_matter(&self, body: &str) -> String {
        format!("---\n{}\n---\n\n{}", self.convert(), body)
    }
}

/// Encodes `value` at `indent` levels of two spaces.
pub fn encode(value: &Value, indent: usize, inline: bool) -> String {
    match value {
        Value::Null => "\"\"".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => encode_sequence(items, indent, inline),
        Value::Object(map) => encode_mapping(map, indent, inline),
    }
}

fn encode_sequence(items: &[Value], indent: usize, inline: bool) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }
    if inline {
        return flow_sequence(items);
    }
    let space = "  ".repeat(indent);
    items
        .iter()
        .map(|item| {
            let nested = encode(item, indent + 1, inline);
            if is_collection(item) {
                format!("{space}- {}", nested.trim_start())
            } else {
                format!("{space}- {nested}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn encode_mapping(map: &Map<String, Value>, indent: usize, inline: bool) -> String {
    if map.is_empty() {
        return "{}".to_string();
    }
    let space = "  ".repeat(indent);
    map.iter()
        .map(|(key, val)| {
            let key = encode_key(key);
            match val {
                Value::Array(items) if inline || items.is_empty() => {
                    format!("{space}{key}: {}", encode_sequence(items, indent, inline))
                }
                Value::Object(nested) if nested.is_empty() => format!("{space}{key}: {{}}"),
                Value::Array(_) | Value::Object(_) => {
                    format!("{space}{key}:\n{}", encode(val, indent + 1, inline))
                }
                _ => format!("{space}{key}: {}", encode(val, indent + 1, inline)),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Single-line flow style used for inline sequences and their elements.
fn encode_flow(value: &Value) -> String {
    match value {
        Value::Array(items) => flow_sequence(items),
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(key, val)| format!("{}: {}", encode_key(key), encode_flow(val)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        scalar => encode(scalar, 0, true),
    }
}

fn flow_sequence(items: &[Value]) -> String {
    let parts: Vec<String> = items.iter().map(encode_flow).collect();
    format!("[{}]", parts.join(", "))
}

fn is_collection(value: &Value) -> bool {
    matches!(value, Value::Array(items) if !items.is_empty())
        || matches!(value, Value::Object(map) if !map.is_empty())
}

fn quote(s: &str) -> String {
    // Serializing a str cannot fail.
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s.escape_default()))
}

/// Plain keys stay bare; anything YAML could misread is quoted.
fn encode_key(key: &str) -> String {
    let plain = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !key.starts_with(['-', '.']);
    if plain {
        key.to_string()
    } else {
        quote(key)
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
