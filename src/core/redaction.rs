//! Redaction filter for masking sensitive record attributes

use super::record::{AttrValue, Record};
use std::collections::HashSet;

/// Sentinel written in place of a redacted value
pub const REDACTED: &str = "[REDACTED]";

/// Marker written when the recursion depth bound is hit
pub const TRUNCATED: &str = "[TRUNCATED]";

/// Maximum nesting depth walked before truncating.
/// Guards against pathological nesting; any finite structure within the
/// bound is fully processed.
const MAX_DEPTH: usize = 32;

/// Masks configured sensitive fields in a record's attributes.
///
/// A field is redacted when its bare key name or its full dotted path
/// (case-sensitive, exact) appears in the configured set. Matching works at
/// any nesting level; sequence elements inherit the path of their key.
/// `apply` never fails: structurally unexpected values are left as-is.
///
/// # Example
///
/// ```
/// use logpipe::{Level, Record, RedactionFilter};
///
/// let filter = RedactionFilter::new(vec!["password".into(), "user.token".into()]);
/// let record = Record::new(Level::Info, "login")
///     .with_attr("password", "hunter2")
///     .with_attr("email", "a@b.com");
/// let redacted = filter.apply(&record);
/// assert_eq!(redacted.attributes["password"].to_string(), "[REDACTED]");
/// assert_eq!(redacted.attributes["email"].to_string(), "a@b.com");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RedactionFilter {
    fields: HashSet<String>,
}

impl RedactionFilter {
    pub fn new(fields: impl IntoIterator<Item = String>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Produce a redacted copy of the record.
    ///
    /// The input is never mutated; callers holding the original keep their
    /// data untouched.
    #[must_use]
    pub fn apply(&self, record: &Record) -> Record {
        if self.fields.is_empty() {
            return record.clone();
        }

        let mut redacted = record.clone();
        redacted.attributes = record
            .attributes
            .iter()
            .map(|(key, value)| (key.clone(), self.redact_value(key, key, value, 1)))
            .collect();
        redacted
    }

    /// True when the bare key or the full dotted path is configured
    fn matches(&self, key: &str, path: &str) -> bool {
        self.fields.contains(key) || self.fields.contains(path)
    }

    fn redact_value(&self, key: &str, path: &str, value: &AttrValue, depth: usize) -> AttrValue {
        if self.matches(key, path) {
            return AttrValue::String(REDACTED.to_string());
        }
        if !value.is_container() {
            return value.clone();
        }
        if depth >= MAX_DEPTH {
            return AttrValue::String(TRUNCATED.to_string());
        }

        match value {
            AttrValue::Map(map) => AttrValue::Map(
                map.iter()
                    .map(|(k, v)| {
                        let child_path = format!("{}.{}", path, k);
                        (k.clone(), self.redact_value(k, &child_path, v, depth + 1))
                    })
                    .collect(),
            ),
            // Sequence elements keep their key's path; nested maps inside
            // continue the dotted path from there
            AttrValue::Seq(items) => AttrValue::Seq(
                items
                    .iter()
                    .map(|v| self.redact_element(path, v, depth + 1))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }

    fn redact_element(&self, path: &str, value: &AttrValue, depth: usize) -> AttrValue {
        if !value.is_container() {
            return value.clone();
        }
        if depth >= MAX_DEPTH {
            return AttrValue::String(TRUNCATED.to_string());
        }
        match value {
            AttrValue::Map(map) => AttrValue::Map(
                map.iter()
                    .map(|(k, v)| {
                        let child_path = format!("{}.{}", path, k);
                        (k.clone(), self.redact_value(k, &child_path, v, depth + 1))
                    })
                    .collect(),
            ),
            AttrValue::Seq(items) => AttrValue::Seq(
                items
                    .iter()
                    .map(|v| self.redact_element(path, v, depth + 1))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }
}
