/// Type definitions for the ChatGPT `conversations.json` export.
///
/// The export is a single JSON array. Each element is one conversation:
///
/// ```json
/// {
///   "id": "6f0c…",
///   "title": "Python Best Practices",
///   "create_time": 1703522622.417,
///   "mapping": {
///     "<node-id>": {
///       "message": { "author": { "role": "user" }, "content": { "parts": ["Hi"] } },
///       "parent": null,
///       "children": ["<node-id>"]
///     }
///   }
/// }
/// ```
///
/// Every field is optional on the wire. Missing or `null` values fall back to
/// the defaults below once, here, so the walker and renderer never re-check
/// the raw shape.
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use eyre::{Context, Result, eyre};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_TITLE: &str = "Untitled Conversation";
pub const UNKNOWN_ROLE: &str = "unknown";

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Read the export file and return its top-level entries without decoding them.
///
/// Entries stay as raw JSON so a single malformed conversation is reported by
/// the batch processor instead of failing the whole document.
pub fn load_export(path: &Path) -> Result<Vec<Value>> {
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read export: {}", path.display()))?;
    parse_export(&raw).wrap_err_with(|| format!("Failed to parse export: {}", path.display()))
}

pub fn parse_export(raw: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(raw).wrap_err("Invalid JSON")? {
        Value::Array(entries) => Ok(entries),
        other => Err(eyre!(
            "Expected a top-level array of conversations, found {}",
            json_kind(&other)
        )),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// One exported chat session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawConversation")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    /// Seconds since the Unix epoch; fractional seconds are kept.
    pub create_time: f64,
    pub mapping: MessageMap,
}

#[derive(Deserialize)]
struct RawConversation {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    create_time: Option<f64>,
    #[serde(default)]
    mapping: Option<MessageMap>,
}

impl TryFrom<RawConversation> for Conversation {
    type Error = String;

    fn try_from(raw: RawConversation) -> std::result::Result<Self, Self::Error> {
        let id = raw
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| "conversation has no id".to_string())?;
        Ok(Self {
            id,
            title: raw.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            create_time: raw.create_time.unwrap_or(0.0),
            mapping: raw.mapping.unwrap_or_default(),
        })
    }
}

impl Conversation {
    /// Decode a single export entry.
    pub fn from_entry(entry: &Value) -> std::result::Result<Self, serde_json::Error> {
        Self::deserialize(entry)
    }
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Node-id indexed message tree.
///
/// Keeps the document order of the keys: root selection picks the *first*
/// qualifying node, so iteration order is part of the contract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageMap {
    order: Vec<String>,
    nodes: HashMap<String, MessageNode>,
}

impl MessageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node; a repeated id replaces the node but keeps its first position.
    pub fn insert(&mut self, id: impl Into<String>, node: MessageNode) {
        let id = id.into();
        if self.nodes.insert(id.clone(), node).is_none() {
            self.order.push(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<&MessageNode> {
        self.nodes.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MessageNode)> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id).map(|node| (id.as_str(), node)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, MessageNode)> for MessageMap {
    fn from_iter<I: IntoIterator<Item = (K, MessageNode)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (id, node) in iter {
            map.insert(id, node);
        }
        map
    }
}

impl<'de> Deserialize<'de> for MessageMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct MapVisitor;

        impl<'de> Visitor<'de> for MapVisitor {
            type Value = MessageMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of message nodes keyed by node id")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut map = MessageMap::new();
                while let Some((id, node)) = access.next_entry::<String, MessageNode>()? {
                    map.insert(id, node);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(MapVisitor)
    }
}

/// One vertex of the message tree.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageNode {
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<String>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Message {
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: Author,
    #[serde(default)]
    pub content: Option<Content>,
}

impl Message {
    pub fn role(&self) -> &str {
        self.author.role.as_deref().unwrap_or(UNKNOWN_ROLE)
    }

    /// True when the message carries a non-empty content value of any shape.
    pub fn has_content(&self) -> bool {
        self.content.as_ref().is_some_and(Content::is_present)
    }

    /// The textual body, before trimming. Empty when there is no usable text.
    pub fn text(&self) -> String {
        self.content.as_ref().map(Content::text).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub role: Option<String>,
}

/// Message body as found in the export.
///
/// Current exports use `{"content_type": "text", "parts": [...]}`; some older
/// or tool-generated entries store a bare string. Anything else (code blocks
/// keyed by `text`, browsing results, etc.) is kept opaque and yields no text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(PartsContent),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PartsContent {
    #[serde(default)]
    pub content_type: Option<String>,
    /// Strings are message text; objects are citations, images and similar.
    pub parts: Vec<Value>,
}

impl Content {
    pub fn parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Value>,
    {
        Self::Parts(PartsContent {
            content_type: Some("text".to_string()),
            parts: parts.into_iter().map(Into::into).collect(),
        })
    }

    /// Concatenate the string parts; non-string parts are dropped without a placeholder.
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(content) => content.parts.iter().filter_map(Value::as_str).collect(),
            Self::Other(_) => String::new(),
        }
    }

    fn is_present(&self) -> bool {
        match self {
            Self::Text(text) => !text.is_empty(),
            Self::Parts(_) => true,
            Self::Other(value) => match value {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64() != Some(0.0),
                Value::String(s) => !s.is_empty(),
                Value::Array(items) => !items.is_empty(),
                Value::Object(fields) => !fields.is_empty(),
            },
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
