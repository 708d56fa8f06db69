//! Record formatters: JSON and plain text
//!
//! Both variants implement the `Formatter` capability. Payloads carry no
//! trailing newline; line-oriented sinks append their own.

use super::error::FormatError;
use super::metrics::PipelineMetrics;
use super::record::{AttrValue, Record};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Timestamp layout used across both formatters: ISO-8601, UTC, millisecond
/// precision (`2025-01-08T10:30:45.123Z`).
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Output keys owned by the formatter. A colliding attribute is dropped and
/// counted; the reserved key always wins.
const RESERVED_KEYS: [&str; 4] = ["timestamp", "level", "message", "logger"];

/// Declared output format for a handler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

/// Serializes one record to bytes
pub trait Formatter: Send + Sync {
    fn serialize(&self, record: &Record) -> Result<Vec<u8>, FormatError>;

    fn name(&self) -> &str;
}

/// JSON formatter: one self-contained object per record
///
/// Reserved keys `timestamp`, `level`, `message`, `logger` are always
/// present; attributes are flattened at the top level. Error info, when
/// present, is emitted as a nested `error` object with `message` and `stack`.
pub struct JsonFormatter {
    metrics: Arc<PipelineMetrics>,
}

impl JsonFormatter {
    pub fn new(metrics: Arc<PipelineMetrics>) -> Self {
        Self { metrics }
    }
}

impl Formatter for JsonFormatter {
    fn serialize(&self, record: &Record) -> Result<Vec<u8>, FormatError> {
        let mut obj = serde_json::Map::new();

        obj.insert(
            "timestamp".to_string(),
            serde_json::Value::String(record.timestamp.format(TIMESTAMP_FORMAT).to_string()),
        );
        obj.insert(
            "level".to_string(),
            serde_json::Value::String(record.level.to_str().to_string()),
        );
        obj.insert(
            "message".to_string(),
            serde_json::Value::String(record.message.clone()),
        );
        obj.insert(
            "logger".to_string(),
            serde_json::Value::String(record.logger.clone()),
        );

        let error_reserved = record.error.is_some();
        for (key, value) in &record.attributes {
            if RESERVED_KEYS.contains(&key.as_str()) || (error_reserved && key == "error") {
                self.metrics.record_attr_collision();
                continue;
            }
            obj.insert(key.clone(), value.to_json_value());
        }

        if let Some(ref error) = record.error {
            let mut err_obj = serde_json::Map::new();
            err_obj.insert(
                "message".to_string(),
                serde_json::Value::String(error.message.clone()),
            );
            err_obj.insert(
                "stack".to_string(),
                serde_json::Value::Array(
                    error
                        .frames
                        .iter()
                        .map(|f| serde_json::Value::String(f.clone()))
                        .collect(),
                ),
            );
            obj.insert("error".to_string(), serde_json::Value::Object(err_obj));
        }

        serde_json::to_vec(&serde_json::Value::Object(obj))
            .map_err(|e| FormatError::json("json", e))
    }

    fn name(&self) -> &str {
        "json"
    }
}

/// Text formatter: a single stable line per record
///
/// `<timestamp> <LEVEL> <logger>: <message> <key=value ...>` with attributes
/// in lexicographic key order so identical input always yields identical
/// output.
pub struct TextFormatter;

impl TextFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Quote a value when it would break key=value tokenization
    fn render_value(value: &AttrValue) -> String {
        let rendered = value.to_string();
        if rendered.contains(' ') || rendered.contains('"') || rendered.contains('=') {
            format!("\"{}\"", rendered.replace('\\', "\\\\").replace('"', "\\\""))
        } else {
            rendered
        }
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for TextFormatter {
    fn serialize(&self, record: &Record) -> Result<Vec<u8>, FormatError> {
        let mut line = format!(
            "{} {:5} {}: {}",
            record.timestamp.format(TIMESTAMP_FORMAT),
            record.level.to_str(),
            record.logger,
            record.message
        );

        // BTreeMap iteration is already lexicographic
        for (key, value) in &record.attributes {
            line.push(' ');
            line.push_str(key);
            line.push('=');
            line.push_str(&Self::render_value(value));
        }

        if let Some(ref error) = record.error {
            line.push_str(&format!(
                " error={}",
                Self::render_value(&AttrValue::String(error.message.clone()))
            ));
            if !error.frames.is_empty() {
                line.push_str(&format!(
                    " error_stack={}",
                    Self::render_value(&AttrValue::String(error.frames.join("; ")))
                ));
            }
        }

        Ok(line.into_bytes())
    }

    fn name(&self) -> &str {
        "text"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::level::Level;
    use crate::core::record::ErrorInfo;

    fn metrics() -> Arc<PipelineMetrics> {
        Arc::new(PipelineMetrics::new())
    }

    #[test]
    fn test_json_reserved_keys_always_present() {
        let formatter = JsonFormatter::new(metrics());
        let record = Record::new(Level::Info, "hello").with_logger("app.main");

        let bytes = formatter.serialize(&record).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert!(parsed["timestamp"].is_string());
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(parsed["message"], "hello");
        assert_eq!(parsed["logger"], "app.main");
    }

    #[test]
    fn test_json_timestamp_is_iso8601_millis() {
        let formatter = JsonFormatter::new(metrics());
        let record = Record::new(Level::Info, "t");

        let bytes = formatter.serialize(&record).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let ts = parsed["timestamp"].as_str().unwrap();

        assert!(ts.ends_with('Z'));
        assert!(ts.contains('T'));
        // millisecond fraction: ....45.123Z
        let frac = ts.rsplit('.').next().unwrap();
        assert_eq!(frac.len(), 4, "expected 3 fraction digits plus Z, got {}", ts);
    }

    #[test]
    fn test_json_attributes_flattened() {
        let formatter = JsonFormatter::new(metrics());
        let record = Record::new(Level::Info, "login")
            .with_attr("user_id", 42_i64)
            .with_attr("email", "a@b.com");

        let bytes = formatter.serialize(&record).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(parsed["user_id"], 42);
        assert_eq!(parsed["email"], "a@b.com");
    }

    #[test]
    fn test_json_reserved_collision_drops_attribute() {
        let m = metrics();
        let formatter = JsonFormatter::new(Arc::clone(&m));
        let record = Record::new(Level::Info, "real message")
            .with_attr("message", "forged")
            .with_attr("timestamp", "forged");

        let bytes = formatter.serialize(&record).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(parsed["message"], "real message");
        assert_ne!(parsed["timestamp"], "forged");
        assert_eq!(m.attr_collisions(), 2);
    }

    #[test]
    fn test_json_error_object() {
        let formatter = JsonFormatter::new(metrics());
        let record = Record::new(Level::Error, "boom").with_error(
            ErrorInfo::new("io failure")
                .with_frame("main")
                .with_frame("write_all"),
        );

        let bytes = formatter.serialize(&record).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(parsed["error"]["message"], "io failure");
        assert_eq!(parsed["error"]["stack"][0], "main");
        assert_eq!(parsed["error"]["stack"][1], "write_all");
    }

    #[test]
    fn test_text_layout() {
        let formatter = TextFormatter::new();
        let record = Record::new(Level::Warn, "slow query")
            .with_logger("app.db")
            .with_attr("ms", 250_i64);

        let line = String::from_utf8(formatter.serialize(&record).unwrap()).unwrap();
        assert!(line.contains("WARN"));
        assert!(line.contains("app.db: slow query"));
        assert!(line.ends_with("ms=250"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_text_stable_attribute_order() {
        let formatter = TextFormatter::new();
        let record = Record::new(Level::Info, "m")
            .with_attr("zebra", 1_i64)
            .with_attr("alpha", 2_i64)
            .with_attr("mid", 3_i64);

        let a = formatter.serialize(&record).unwrap();
        let b = formatter.serialize(&record).unwrap();
        assert_eq!(a, b);

        let line = String::from_utf8(a).unwrap();
        let alpha = line.find("alpha=").unwrap();
        let mid = line.find("mid=").unwrap();
        let zebra = line.find("zebra=").unwrap();
        assert!(alpha < mid && mid < zebra);
    }

    #[test]
    fn test_text_quotes_values_with_spaces() {
        let formatter = TextFormatter::new();
        let record = Record::new(Level::Info, "q")
            .with_attr("query", "SELECT * FROM users WHERE id=1");

        let line = String::from_utf8(formatter.serialize(&record).unwrap()).unwrap();
        assert!(line.contains("query=\"SELECT * FROM users WHERE id=1\""));
    }
}
