//! Shared key/value state written by widget events and `store`/`load`
//! commands, read by text interpolation and loop index injection.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::value::Value;

/// State key overwritten on every iteration of every loop. Nested loops
/// share it; there is no save/restore across nesting levels.
pub const LOOP_INDEX_KEY: &str = "loopIndex";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern"));

/// Insertion-ordered key/value bag. Lives as long as its interpreter and is
/// never cleared automatically; consumers may read stale values written by
/// earlier executions.
#[derive(Debug, Default)]
pub struct StateStore {
    values: IndexMap<String, Value>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.values.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Replace every `{identifier}` placeholder whose key is present in the
    /// store with the display string of its value. Unmatched placeholders
    /// stay verbatim.
    pub fn interpolate(&self, text: &str) -> String {
        PLACEHOLDER
            .replace_all(text, |caps: &regex::Captures| {
                match self.values.get(&caps[1]) {
                    Some(value) => value.to_display_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Snapshot the whole store as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                .collect(),
        )
    }

    /// Merge a JSON object snapshot into the store.
    pub fn load_json(&mut self, json: serde_json::Value) {
        if let serde_json::Value::Object(fields) = json {
            for (key, value) in fields {
                self.values.insert(key, Value::from(value));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolate_replaces_known_placeholders() {
        let mut state = StateStore::new();
        state.insert("greeting", Value::text("Hi"));
        state.insert("count", Value::number(3.0));

        assert_eq!(state.interpolate("{greeting}, {count}!"), "Hi, 3!");
    }

    #[test]
    fn interpolate_keeps_unknown_placeholders_verbatim() {
        let state = StateStore::new();
        assert_eq!(state.interpolate("hello {missing}"), "hello {missing}");
    }

    #[test]
    fn interpolate_replaces_every_occurrence() {
        let mut state = StateStore::new();
        state.insert("x", Value::text("a"));
        assert_eq!(state.interpolate("{x}{x} {x}"), "aa a");
    }

    #[test]
    fn interpolate_ignores_non_word_placeholders() {
        let mut state = StateStore::new();
        state.insert("a b", Value::text("nope"));
        assert_eq!(state.interpolate("{a b}"), "{a b}");
    }

    #[test]
    fn json_snapshot_round_trips() {
        let mut state = StateStore::new();
        state.insert("name", Value::text("Bob"));
        state.insert("count", Value::number(2.0));

        let mut restored = StateStore::new();
        restored.load_json(state.to_json());
        assert_eq!(restored.get("name"), Some(&Value::text("Bob")));
        assert_eq!(restored.get("count"), Some(&Value::number(2.0)));
    }
}
