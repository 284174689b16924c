/// Candidate record as read from one JSONL line
use crate::config::types::{Result, VerifyError, VerifyStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields owned by the verifier; stale copies from upstream are dropped before classification
pub const VERIFY_FIELDS: [&str; 5] = ["verify_status", "verify_reason", "verify_logs", "code", "tests"];

/// One candidate sample. Unknown upstream fields are carried through untouched
/// and keep their original key order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Parse one input line. Anything other than a JSON object is malformed.
    pub fn from_line(line: &str, line_no: usize) -> Result<Self> {
        let value: Value =
            serde_json::from_str(line).map_err(|e| VerifyError::MalformedInput {
                line: line_no,
                message: e.to_string(),
            })?;

        match value {
            Value::Object(fields) => {
                let mut record = Record { fields };
                if !record.fields.contains_key("id") {
                    record.fields.insert("id".to_string(), Value::from(line_no));
                }
                Ok(record)
            }
            other => Err(VerifyError::MalformedInput {
                line: line_no,
                message: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Record { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String value of a field, if present and a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    /// Identifier used in log lines
    pub fn id_label(&self) -> String {
        match self.fields.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "?".to_string(),
        }
    }

    pub fn status(&self) -> Option<VerifyStatus> {
        self.fields
            .get("verify_status")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Drop verifier-owned fields carried over from upstream
    pub fn clear_verification(&mut self) {
        for key in VERIFY_FIELDS {
            self.fields.shift_remove(key);
        }
    }

    /// Serialize as one compact JSON line (no trailing newline)
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.fields)?)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
