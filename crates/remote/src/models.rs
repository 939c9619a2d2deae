//! Document models.
//!
//! These types are shared by the remote clients, the local cache and the
//! synchronization engine. Content is opaque: the only things
//! ever done with it are serialization (for storage and equality) and plain
//! text extraction (for metrics and first-line detection).

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque key naming a single editable document, shared between the local
/// cache and the remote store.
#[derive(Clone, Debug, Display, From, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);
impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Structured editor content (a ProseMirror-style JSON tree).
///
/// Two contents are considered the same document state if and only if their
/// [serialized](Self::to_serialized) forms are byte-identical. Object keys
/// are kept sorted by `serde_json`, so equal trees always serialize equally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Content(Value);
impl Content {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parse content previously produced by [`to_serialized`](Self::to_serialized).
    pub fn from_serialized(serialized: &str) -> serde_json::Result<Self> {
        serde_json::from_str(serialized).map(Self)
    }

    pub fn to_serialized(&self) -> String {
        // Serializing a `Value` cannot fail: every key is already a string.
        self.0.to_string()
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Plain text rendering of the tree.
    ///
    /// Text leaves are concatenated inside a block, hard breaks become a
    /// newline, and sibling blocks are separated by a blank line.
    ///
    /// ```
    /// use scribe_remote::Content;
    /// use serde_json::json;
    ///
    /// let content = Content::new(json!({
    ///     "type": "doc",
    ///     "content": [
    ///         { "type": "heading", "content": [{ "type": "text", "text": "Title" }] },
    ///         { "type": "paragraph", "content": [
    ///             { "type": "text", "text": "Hello, " },
    ///             { "type": "text", "text": "world" },
    ///         ]},
    ///     ],
    /// }));
    /// assert_eq!(content.plain_text(), "Title\n\nHello, world");
    /// ```
    pub fn plain_text(&self) -> String {
        match &self.0 {
            Value::String(text) => text.clone(),
            node => node_text(node),
        }
    }
}
impl Default for Content {
    /// An empty document.
    fn default() -> Self {
        Self(serde_json::json!({ "type": "doc", "content": [] }))
    }
}

fn is_inline(node: &Value) -> bool {
    matches!(node.get("type").and_then(Value::as_str), Some("text" | "hardBreak"))
}

fn node_text(node: &Value) -> String {
    match node.get("type").and_then(Value::as_str) {
        Some("text") => node.get("text").and_then(Value::as_str).unwrap_or_default().to_string(),
        Some("hardBreak") => "\n".to_string(),
        _ => {
            let Some(children) = node.get("content").and_then(Value::as_array) else {
                return String::new();
            };
            let separator = if children.iter().all(is_inline) { "" } else { "\n\n" };
            children.iter().map(node_text).collect::<Vec<_>>().join(separator)
        },
    }
}
