// src/normalize.rs
//! Best-effort extraction of item lists from provider payloads.
//!
//! Sites speaking the VOD dialect return the items under `list`; older ones use `data`.
//! Nothing else about the payload is validated.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::registry::Provider;

/// Container field names, tried in order.
pub const LIST_FIELDS: [&str; 2] = ["list", "data"];

/// A provider item stamped with the site it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentItem(Map<String, Value>);

impl ContentItem {
    /// Stamp `site_key`, `site_name` and `latency: 0` over the provider's own fields.
    /// Returns `None` for items that are not JSON objects.
    pub fn tagged(raw: Value, provider: &Provider) -> Option<Self> {
        let Value::Object(mut fields) = raw else {
            return None;
        };
        fields.insert("site_key".into(), Value::String(provider.key.clone()));
        fields.insert("site_name".into(), Value::String(provider.name.clone()));
        fields.insert("latency".into(), Value::from(0));
        Some(Self(fields))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn site_key(&self) -> Option<&str> {
        self.0.get("site_key").and_then(Value::as_str)
    }
}

/// First candidate field holding a non-empty array wins; anything else yields empty.
pub fn extract_list(payload: Value) -> Vec<Value> {
    let Value::Object(mut obj) = payload else {
        return Vec::new();
    };
    for field in LIST_FIELDS {
        if let Some(Value::Array(items)) = obj.remove(field) {
            if !items.is_empty() {
                return items;
            }
        }
    }
    Vec::new()
}

/// Extract and tag a search payload. Non-object items are dropped.
pub fn tag_items(payload: Value, provider: &Provider) -> Vec<ContentItem> {
    let raw = extract_list(payload);
    let total = raw.len();
    let items: Vec<ContentItem> = raw
        .into_iter()
        .filter_map(|it| ContentItem::tagged(it, provider))
        .collect();
    if items.len() < total {
        tracing::debug!(
            target: "fanout",
            provider = %provider.key,
            dropped = total - items.len(),
            "non-object items dropped"
        );
    }
    items
}
