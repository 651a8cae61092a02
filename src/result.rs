use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// Values extracted by one scrape, keyed by step key in step order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeResult {
    id: u64,
    entries: Vec<(String, Value)>,
}

impl ScrapeResult {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id,
            entries: Vec::new(),
        }
    }

    /// Store `value` under `key`. A repeated key replaces the earlier value
    /// but keeps its original position.
    pub(crate) fn insert(&mut self, key: &str, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Identifier of the `scrape()` call that produced this result.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop the id and return the values as a JSON object. Key order is
    /// whatever `serde_json::Map` keeps; serialize the result itself to
    /// preserve step order.
    pub fn into_map(self) -> Map<String, Value> {
        self.entries.into_iter().collect()
    }
}

impl Serialize for ScrapeResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len() + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
