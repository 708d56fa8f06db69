//! Log record structure and attribute value model

use super::level::Level;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Value type for structured record attributes
///
/// A closed set of variants: scalars, sequences, and nested mappings.
/// Nested containers let callers attach structured payloads without an
/// open dynamically-typed bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Seq(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    /// Convert to serde_json::Value for JSON serialization
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            AttrValue::Null => serde_json::Value::Null,
            AttrValue::Bool(b) => serde_json::Value::Bool(*b),
            AttrValue::Int(i) => serde_json::Value::Number((*i).into()),
            AttrValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttrValue::String(s) => serde_json::Value::String(s.clone()),
            AttrValue::Seq(items) => {
                serde_json::Value::Array(items.iter().map(AttrValue::to_json_value).collect())
            }
            AttrValue::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
        }
    }

    /// True for `Seq` and `Map` variants
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, AttrValue::Seq(_) | AttrValue::Map(_))
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => write!(f, "null"),
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Float(fl) => write!(f, "{}", fl),
            AttrValue::String(s) => write!(f, "{}", s),
            // Containers render as compact JSON so a text line stays one line
            AttrValue::Seq(_) | AttrValue::Map(_) => {
                write!(f, "{}", self.to_json_value())
            }
        }
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::String(s)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::String(s.to_string())
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<i32> for AttrValue {
    fn from(i: i32) -> Self {
        AttrValue::Int(i as i64)
    }
}

impl From<u32> for AttrValue {
    fn from(i: u32) -> Self {
        AttrValue::Int(i as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(f: f64) -> Self {
        AttrValue::Float(f)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl<V: Into<AttrValue>> From<Vec<V>> for AttrValue {
    fn from(items: Vec<V>) -> Self {
        AttrValue::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, AttrValue>> for AttrValue {
    fn from(map: BTreeMap<String, AttrValue>) -> Self {
        AttrValue::Map(map)
    }
}

/// Structured error information attached to a record
///
/// Replaces language-specific traceback objects with an error message and an
/// ordered sequence of frame descriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    /// Ordered stack frames, outermost first
    pub frames: Vec<String>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            frames: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_frames(mut self, frames: Vec<String>) -> Self {
        self.frames = frames;
        self
    }

    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.frames.push(frame.into());
        self
    }
}

/// One immutable log event
///
/// A `Record` is never mutated after creation; redaction produces a new
/// `Record` rather than editing the caller's data in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    /// Hierarchical dotted logger name, e.g. `app.db.pool`
    pub logger: String,
    pub message: String,
    pub attributes: BTreeMap<String, AttrValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl Record {
    /// Sanitize the message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// so a message cannot forge additional log lines.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            logger: "root".to_string(),
            message: Self::sanitize_message(&message.into()),
            attributes: BTreeMap::new(),
            error: None,
        }
    }

    #[must_use]
    pub fn with_logger(mut self, logger: impl Into<String>) -> Self {
        self.logger = logger.into();
        self
    }

    #[must_use]
    pub fn with_attr<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<AttrValue>,
    {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: BTreeMap<String, AttrValue>) -> Self {
        self.attributes = attributes;
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        self.error = Some(error);
        self
    }
}
