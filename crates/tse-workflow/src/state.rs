use serde_json::{Map, Value};

/// A partial write a node contributes for one superstep. An empty
/// fragment is the gatekeeper idiom: "I ran, but my preconditions
/// aren't met yet, try me again next time a predecessor lands."
pub type StateFragment = Map<String, Value>;

/// The accumulated, merged state visible to every node. Fragments are
/// folded in left-to-right within a superstep, then across supersteps,
/// with later writes to the same key overwriting earlier ones — the
/// same last-writer-wins semantics as a plain dict `update`.
#[derive(Debug, Clone, Default)]
pub struct GraphState {
    values: Map<String, Value>,
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(|v| !v.is_null())
    }

    pub fn has_all(&self, keys: &[&str]) -> bool {
        keys.iter().all(|k| self.has(k))
    }

    pub fn missing_of<'a>(&self, keys: &'a [&'a str]) -> Vec<&'a str> {
        keys.iter().copied().filter(|k| !self.has(k)).collect()
    }

    pub fn merge(&mut self, fragment: StateFragment) {
        for (k, v) in fragment {
            self.values.insert(k, v);
        }
    }

    pub fn snapshot(&self) -> Map<String, Value> {
        self.values.clone()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_of_lists_absent_keys_only() {
        let mut state = GraphState::new();
        state.merge(Map::from_iter([("a".to_string(), json!(1))]));
        assert_eq!(state.missing_of(&["a", "b", "c"]), vec!["b", "c"]);
    }

    #[test]
    fn merge_overwrites_existing_keys() {
        let mut state = GraphState::new();
        state.merge(Map::from_iter([("a".to_string(), json!(1))]));
        state.merge(Map::from_iter([("a".to_string(), json!(2))]));
        assert_eq!(state.get("a"), Some(&json!(2)));
    }

    #[test]
    fn null_valued_key_counts_as_missing() {
        let mut state = GraphState::new();
        state.merge(Map::from_iter([("a".to_string(), Value::Null)]));
        assert!(!state.has("a"));
    }
}
