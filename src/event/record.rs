//! Change event records
//!
//! [`NewEvent`] is what a producer hands to the broadcaster. Once it passes
//! validation and is appended to the log it becomes an immutable
//! [`ChangeEvent`] carrying its sequence number and a resolved timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A key-value document carried by an event
pub type Document = Map<String, Value>;

/// An event as submitted by a producer, before it enters the log
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewEvent {
    /// Free-form operation tag (e.g. "insert", "update", "delete")
    #[serde(rename = "operationType")]
    pub operation_type: String,

    /// Event payload; must be a JSON object
    #[serde(rename = "fullDocument", alias = "payload", default)]
    pub payload: Value,

    /// Producer-supplied time; ingestion time is used when absent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewEvent {
    /// Create an event without a timestamp
    pub fn new(operation_type: impl Into<String>, payload: Value) -> Self {
        Self {
            operation_type: operation_type.into(),
            payload,
            timestamp: None,
        }
    }

    /// Set an explicit timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Parse the JSON body shape accepted by the ingestion endpoint
    ///
    /// ```json
    /// {"operationType": "insert", "fullDocument": {"name": "Alice"}}
    /// ```
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Check the event and split out its document
    pub(crate) fn into_parts(self) -> Result<(String, Document, Option<DateTime<Utc>>)> {
        if self.operation_type.trim().is_empty() {
            return Err(Error::MalformedEvent("operation type is empty".into()));
        }

        match self.payload {
            Value::Object(doc) => Ok((self.operation_type, doc, self.timestamp)),
            other => Err(Error::MalformedEvent(format!(
                "payload must be a JSON object, got {}",
                kind_name(&other)
            ))),
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// An immutable event stored in the log
///
/// Shared between the log and every subscriber queue behind an `Arc`, so
/// fan-out never copies the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Position in the log, starting at 1
    pub sequence: u64,

    /// Operation tag
    #[serde(rename = "operationType")]
    pub operation_type: String,

    /// Event document
    #[serde(rename = "fullDocument")]
    pub payload: Document,

    /// Producer time, or ingestion time if the producer gave none
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Look up a top-level payload field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    /// Serialize to the JSON wire shape
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
