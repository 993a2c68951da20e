//! Structured records decoded from `-json` output.

use serde_json::{Map, Value};

use crate::worker::{WorkerError, WorkerResult};

/// One file's metadata: tag name to JSON value.
pub type Record = Map<String, Value>;

/// Tag carrying the path the worker read a record from.
pub const SOURCE_FILE: &str = "SourceFile";

/// Parse a `-json` frame into records, preserving the worker's order.
///
/// The whole frame must be a JSON array of objects. Anything else, including
/// diagnostics the worker printed around the array, fails with
/// [`WorkerError::Decode`] carrying the raw text.
pub fn decode_records(raw: &str) -> WorkerResult<Vec<Record>> {
    serde_json::from_str(raw).map_err(|source| WorkerError::Decode {
        raw: raw.to_string(),
        source,
    })
}

/// Typed accessors for [`Record`].
pub trait RecordExt {
    /// The `SourceFile` tag, if present.
    fn source_file(&self) -> Option<&str>;

    /// A tag rendered as a string. Numbers and booleans are formatted.
    fn get_string(&self, tag: &str) -> Option<String>;

    /// A numeric tag. Numeric strings are parsed.
    fn get_f64(&self, tag: &str) -> Option<f64>;

    /// True when the worker attached an `Error` tag to this record.
    fn has_error(&self) -> bool;
}

impl RecordExt for Record {
    fn source_file(&self) -> Option<&str> {
        self.get(SOURCE_FILE).and_then(Value::as_str)
    }

    fn get_string(&self, tag: &str) -> Option<String> {
        match self.get(tag)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn get_f64(&self, tag: &str) -> Option<f64> {
        match self.get(tag)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn has_error(&self) -> bool {
        self.contains_key("Error")
    }
}
