//! Values handling with deep merge support
//!
//! Plan overlays are merged over service-rendered values, and the broker's
//! metadata block is merged over both. The merge is recursive and
//! right-biased: nested maps combine, anything else on the right replaces
//! the left.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Values container with deep merge capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Default for Values {
    fn default() -> Self {
        Self::new()
    }
}

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Parse values from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Ok(Self(value))
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.0)
    }

    /// Deep merge another Values into this one
    ///
    /// Rules:
    /// - Scalars and arrays: overlay replaces base
    /// - Objects: recursive merge
    /// - A null overlay leaves the base untouched
    pub fn merge(&mut self, overlay: &Values) {
        if overlay.0.is_null() {
            return;
        }
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Get a value by dotted path (e.g. "image.tag")
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let mut current = &self.0;
        for key in path.split('.') {
            current = current.as_object()?.get(key)?;
        }
        Some(current)
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert into the inner JSON value
    pub fn into_inner(self) -> JsonValue {
        self.0
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }
}

impl From<serde_json::Map<String, JsonValue>> for Values {
    fn from(map: serde_json::Map<String, JsonValue>) -> Self {
        Self(JsonValue::Object(map))
    }
}

/// Deep merge two JSON values
fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_merge_right_biased() {
        let mut base = Values(json!({
            "a": 1,
            "b": 2,
            "bothmap": { "five": 5, "overwritten": null },
            "srcmap": 0.0,
        }));

        let overlay = Values(json!({
            "a": 3,
            "c": 4,
            "bothmap": { "six": 6, "overwritten": true },
            "srcmap": { "seven": 7 },
        }));

        base.merge(&overlay);

        assert_eq!(
            base.0,
            json!({
                "a": 3,
                "b": 2,
                "c": 4,
                "bothmap": { "five": 5, "six": 6, "overwritten": true },
                "srcmap": { "seven": 7 },
            })
        );
    }

    #[test]
    fn test_merge_disjoint_keys_is_associative() {
        let a = Values(json!({"a": 1}));
        let b = Values(json!({"b": 2}));
        let c = Values(json!({"c": {"nested": true}}));

        let mut left = a.clone();
        left.merge(&b);
        left.merge(&c);

        let mut bc = b.clone();
        bc.merge(&c);
        let mut right = a.clone();
        right.merge(&bc);

        assert_eq!(left, right);
    }

    #[test]
    fn test_merge_null_overlay_is_noop() {
        let mut base = Values(json!({"keep": "me"}));
        base.merge(&Values(JsonValue::Null));
        assert_eq!(base.0, json!({"keep": "me"}));
    }

    #[test]
    fn test_non_map_on_right_replaces() {
        let mut base = Values(json!({"key": {"nested": 1}}));
        base.merge(&Values(json!({"key": "scalar"})));
        assert_eq!(base.0, json!({"key": "scalar"}));
    }

    #[test]
    fn test_yaml_round_trip_preserves_integers() {
        let values = Values::from_yaml("port: 7070\nname: db\n").unwrap();
        assert_eq!(values.get("port"), Some(&json!(7070)));

        let yaml = values.to_yaml().unwrap();
        let reparsed = Values::from_yaml(&yaml).unwrap();
        assert_eq!(reparsed.get("port"), Some(&json!(7070)));
    }

    #[test]
    fn test_get_dotted_path() {
        let values = Values(json!({"image": {"tag": "10.7.0"}}));
        assert_eq!(values.get("image.tag"), Some(&json!("10.7.0")));
        assert_eq!(values.get("image.missing"), None);
    }
}
