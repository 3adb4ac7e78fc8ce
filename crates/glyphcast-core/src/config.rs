use serde_json::{Map, Value};

/// JSON-object configuration shared by the layout, cache and compositing layers.
///
/// Keys are addressed with dotted paths (`font.maxSize`, `cache.capacity`, ...). Consumers read
/// the values they understand and fall back to their own defaults for anything missing or of the
/// wrong type, so a partial override object is always valid.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionConfig(Value);

impl Default for CaptionConfig {
    fn default() -> Self {
        Self::empty_object()
    }
}

impl CaptionConfig {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        Ok(Self(serde_json::from_str(json)?))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    fn lookup(&self, dotted_path: &str) -> Option<&Value> {
        let mut cur = &self.0;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }

    pub fn get_str(&self, dotted_path: &str) -> Option<&str> {
        self.lookup(dotted_path)?.as_str()
    }

    pub fn get_f64(&self, dotted_path: &str) -> Option<f64> {
        self.lookup(dotted_path)?
            .as_f64()
            .filter(|v| v.is_finite())
    }

    pub fn get_u64(&self, dotted_path: &str) -> Option<u64> {
        self.lookup(dotted_path)?.as_u64()
    }

    pub fn get_bool(&self, dotted_path: &str) -> Option<bool> {
        self.lookup(dotted_path)?.as_bool()
    }

    /// Layers `overrides` on top of this config. Objects merge key by key; any other value
    /// (including arrays) replaces what was there.
    pub fn merge(&mut self, overrides: &CaptionConfig) {
        merge_into(&mut self.0, &overrides.0);
    }
}

fn merge_into(base: &mut Value, overrides: &Value) {
    if let (Value::Object(base_map), Value::Object(override_map)) = (&mut *base, overrides) {
        for (key, value) in override_map {
            merge_into(base_map.entry(key.clone()).or_insert(Value::Null), value);
        }
        return;
    }
    *base = overrides.clone();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_paths_read_nested_values() {
        let cfg = CaptionConfig::from_value(json!({
            "font": { "maxSize": 72, "lineHeight": 1.3 },
            "text": { "ellipsis": "..." }
        }));
        assert_eq!(cfg.get_f64("font.maxSize"), Some(72.0));
        assert_eq!(cfg.get_f64("font.lineHeight"), Some(1.3));
        assert_eq!(cfg.get_str("text.ellipsis"), Some("..."));
        assert_eq!(cfg.get_f64("font.minSize"), None);
        assert_eq!(cfg.get_str("font.maxSize"), None);
    }

    #[test]
    fn merge_keeps_unrelated_keys() {
        let mut cfg = CaptionConfig::from_value(json!({
            "font": { "minSize": 10, "maxSize": 40 }
        }));
        cfg.merge(&CaptionConfig::from_value(
            json!({ "font": { "maxSize": 80 }, "scrim": { "padding": 8 } }),
        ));
        assert_eq!(cfg.get_f64("font.minSize"), Some(10.0));
        assert_eq!(cfg.get_f64("font.maxSize"), Some(80.0));
        assert_eq!(cfg.get_f64("scrim.padding"), Some(8.0));
    }

    #[test]
    fn merge_replaces_scalars_and_non_object_roots() {
        let mut cfg = CaptionConfig::from_value(json!({ "cache": 3 }));
        cfg.merge(&CaptionConfig::from_value(json!({ "cache": { "capacity": 16 } })));
        assert_eq!(cfg.get_u64("cache.capacity"), Some(16));

        let mut not_an_object = CaptionConfig::from_value(json!([1, 2]));
        not_an_object.merge(&CaptionConfig::from_value(json!({ "font": { "step": 4 } })));
        assert_eq!(not_an_object.get_f64("font.step"), Some(4.0));
    }
}
