//! Normalization of raw host results into one canonical shape.
//!
//! Hosts hand back either an MCP-style envelope
//! (`{"content": [...], "structuredContent": {...}, "isError": false, "_meta": {...}}`)
//! or the payload fields directly. `ToolPayload::normalize` folds both into a
//! single field map: direct fields first, then `structuredContent` fields on
//! top, so `structuredContent.<field>` wins whenever both locations carry it.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::WidgetError;

/// Envelope keys that never count as payload fields.
const ENVELOPE_KEYS: [&str; 4] = ["content", "structuredContent", "isError", "_meta"];

/// Canonical tool result consumed by the rest of the core.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolPayload {
    tool: String,
    fields: Map<String, Value>,
    text: Vec<String>,
    meta: Option<Value>,
}

impl ToolPayload {
    /// Normalize a raw result returned by `callTool` (or read from the
    /// initial-data slot) for the named tool.
    pub fn normalize(tool: &str, raw: Value) -> Result<Self, WidgetError> {
        let Value::Object(mut envelope) = raw else {
            return Err(WidgetError::MalformedResult {
                tool: tool.to_string(),
                expected: "object".to_string(),
            });
        };

        let text = text_content(envelope.get("content"));

        if envelope.get("isError").and_then(Value::as_bool) == Some(true) {
            let message = if text.is_empty() {
                "tool reported an error".to_string()
            } else {
                text.join("\n")
            };
            return Err(WidgetError::ToolCallFailed {
                tool: tool.to_string(),
                message,
            });
        }

        let structured = envelope.remove("structuredContent");
        let meta = envelope.remove("_meta");

        let mut fields: Map<String, Value> = envelope
            .into_iter()
            .filter(|(key, _)| !ENVELOPE_KEYS.contains(&key.as_str()))
            .collect();

        match structured {
            Some(Value::Object(structured)) => fields.extend(structured),
            Some(Value::Null) | None => {}
            Some(other) => {
                log::debug!(
                    "Ignoring non-object structuredContent from {}: {}",
                    tool,
                    other
                );
            }
        }

        Ok(Self {
            tool: tool.to_string(),
            fields,
            text,
            meta,
        })
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Field lookup after normalization.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Require a field, failing with `MalformedResult` when neither location
    /// carried it.
    pub fn require(&self, key: &str) -> Result<&Value, WidgetError> {
        self.fields.get(key).ok_or_else(|| self.malformed(key))
    }

    /// Decode a required field.
    pub fn decode<T: DeserializeOwned>(&self, key: &str) -> Result<T, WidgetError> {
        let value = self.require(key)?;
        serde_json::from_value(value.clone()).map_err(|e| {
            log::warn!("Tool {} returned an undecodable {}: {}", self.tool, key, e);
            self.malformed(key)
        })
    }

    /// Plain-text content blocks, in order.
    pub fn text(&self) -> &[String] {
        &self.text
    }

    pub fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }

    /// The canonical field map as a JSON object.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    fn malformed(&self, key: &str) -> WidgetError {
        WidgetError::MalformedResult {
            tool: self.tool.clone(),
            expected: key.to_string(),
        }
    }
}

fn text_content(content: Option<&Value>) -> Vec<String> {
    content
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
