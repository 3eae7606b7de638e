//! Deep merge of TOML value trees.
//!
//! The merge operates on raw [`toml::Value`] trees rather than deserialized
//! structs, so that "absent vs explicitly default" is handled correctly: a
//! key missing from an overlay never clobbers the base layer's value.

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively, per-field.
/// - Scalars and arrays in the overlay replace the base value outright.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_scalar_replaces_base() {
        let mut base: toml::Value = toml::from_str("[retry]\nmax_attempts = 3\n").unwrap();
        let overlay: toml::Value = toml::from_str("[retry]\nmax_attempts = 5\n").unwrap();
        deep_merge(&mut base, &overlay);
        assert_eq!(base["retry"]["max_attempts"].as_integer(), Some(5));
    }

    #[test]
    fn overlay_missing_key_keeps_base_value() {
        let mut base: toml::Value =
            toml::from_str("[retry]\nmax_attempts = 3\ninitial_delay_ms = 100\n").unwrap();
        let overlay: toml::Value = toml::from_str("[retry]\nmax_attempts = 5\n").unwrap();
        deep_merge(&mut base, &overlay);
        assert_eq!(base["retry"]["max_attempts"].as_integer(), Some(5));
        assert_eq!(base["retry"]["initial_delay_ms"].as_integer(), Some(100));
    }

    #[test]
    fn overlay_adds_new_table_untouched() {
        let mut base: toml::Value = toml::from_str("[retry]\nmax_attempts = 3\n").unwrap();
        let overlay: toml::Value = toml::from_str("[subagent]\nmax_depth = 1\n").unwrap();
        deep_merge(&mut base, &overlay);
        assert_eq!(base["retry"]["max_attempts"].as_integer(), Some(3));
        assert_eq!(base["subagent"]["max_depth"].as_integer(), Some(1));
    }
}
