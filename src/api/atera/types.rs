use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Paged envelope returned by every Atera list endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentsPage {
    // Kept optional so key validation can tell a missing list from an empty one.
    pub items: Option<Vec<RawDevice>>,
    pub page: Option<i64>,
    pub items_in_page: Option<i64>,
    pub total_item_count: Option<i64>,
    pub total_pages: Option<i64>,
    pub next_link: Option<String>,
    pub prev_link: Option<String>,
}

/// One agent record exactly as the vendor sent it.
///
/// Field names and types vary between accounts and agent versions, so the
/// record is kept as raw JSON and read through lenient accessors that return
/// `None` for anything missing or of the wrong type.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct RawDevice(pub Value);

impl RawDevice {
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// A string field with surrounding whitespace removed; empty counts as absent.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.field(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// An integer field, accepting numeric strings as some accounts send them.
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.field(key)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.field(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Non-empty string entries of an array field.
    pub fn text_list(&self, key: &str) -> Vec<&str> {
        self.field(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl From<Value> for RawDevice {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
