//! Session domain model.
//!
//! Metadata records are producer-supplied JSON objects. The store only interprets a
//! handful of fields and must otherwise hand the object back unchanged, so the record is
//! kept as an ordered JSON map rather than a fixed struct.

use super::reference::SessionRef;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata field holding the human-assigned title.
pub const TITLE_FIELD: &str = "title";
/// Metadata field holding the parent reference.
pub const PARENT_FIELD: &str = "parent_session_id";
/// Metadata field holding the prompt (a string, or an object with a `text` field).
pub const PROMPT_FIELD: &str = "prompt";
/// Metadata field holding the producer's input mode.
pub const INPUT_MODE_FIELD: &str = "input_mode";

/// Descriptive record of a session: the generation parameters plus store-managed fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionMetadata(Map<String, Value>);

impl SessionMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps producer parameters. Non-object values are stored under `params`.
    pub fn from_params(params: Value) -> Self {
        match params {
            Value::Object(map) => Self(map),
            Value::Null => Self::default(),
            other => {
                let mut map = Map::new();
                map.insert("params".to_string(), other);
                Self(map)
            }
        }
    }

    /// Custom title, if one is set and non-empty.
    pub fn title(&self) -> Option<&str> {
        self.0
            .get(TITLE_FIELD)
            .and_then(Value::as_str)
            .filter(|title| !title.is_empty())
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.0
            .insert(TITLE_FIELD.to_string(), Value::String(title.into()));
    }

    /// Raw parent reference, if present.
    pub fn parent_session_id(&self) -> Option<&str> {
        self.0
            .get(PARENT_FIELD)
            .and_then(Value::as_str)
            .filter(|parent| !parent.trim().is_empty())
    }

    pub fn set_parent_session_id(&mut self, parent: &SessionRef) {
        self.0
            .insert(PARENT_FIELD.to_string(), Value::String(parent.to_string()));
    }

    /// Prompt text used for previews.
    pub fn prompt_text(&self) -> &str {
        match self.0.get(PROMPT_FIELD) {
            Some(Value::String(text)) => text,
            Some(Value::Object(prompt)) => prompt.get("text").and_then(Value::as_str).unwrap_or(""),
            _ => "",
        }
    }

    pub fn input_mode(&self) -> &str {
        self.0
            .get(INPUT_MODE_FIELD)
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// One generated alternative of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Variant {
    /// Copy without the reasoning trace, used for ancestor entries of a stack.
    pub fn without_thought(&self) -> Self {
        Self {
            index: self.index,
            thought: None,
            code: self.code.clone(),
        }
    }
}

/// A row of the history list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Full `partition/local_id` reference
    #[serde(rename = "ref")]
    pub session_ref: SessionRef,
    /// Local id of the session
    pub id: String,
    /// Partition (creation day)
    pub date: String,
    /// Time-of-day prefix of the local id
    pub timestamp: String,
    /// Title when set, otherwise a truncated prompt preview
    pub prompt: String,
    pub input_mode: String,
    pub url: String,
    #[serde(default)]
    pub parent_session_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// One session in a reconstructed lineage stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackEntry {
    #[serde(rename = "ref")]
    pub session_ref: SessionRef,
    pub id: String,
    pub date: String,
    pub params: Option<SessionMetadata>,
    pub variants: Vec<Variant>,
}

impl StackEntry {
    pub fn new(
        session_ref: SessionRef,
        params: Option<SessionMetadata>,
        variants: Vec<Variant>,
    ) -> Self {
        Self {
            id: session_ref.local_id().to_string(),
            date: session_ref.partition().to_string(),
            session_ref,
            params,
            variants,
        }
    }
}

/// Full view of a session returned by a lookup.
///
/// `stack` is ordered root first and always ends with the requested session, which is
/// the only entry carrying reasoning traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetail {
    #[serde(rename = "ref")]
    pub session_ref: SessionRef,
    pub params: Option<SessionMetadata>,
    pub variants: Vec<Variant>,
    pub stack: Vec<StackEntry>,
}
