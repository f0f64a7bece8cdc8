//! Ordered item-key → instruction-text mapping.
//!
//! TOML tables are visited in document order during deserialization, and
//! that order is kept here instead of being lost to a sorted or hashed map.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The content of one plan section: ordered `(item key, text)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionContent {
    items: Vec<(String, String)>,
}

impl SectionContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item, replacing the text in place if the key already exists.
    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        let key = key.into();
        let text = text.into();
        match self.items.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = text,
            None => self.items.push((key, text)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Apply `f` to every text, keeping keys and order.
    pub fn map_text(&self, mut f: impl FnMut(&str) -> String) -> Self {
        Self {
            items: self
                .items
                .iter()
                .map(|(k, v)| (k.clone(), f(v)))
                .collect(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for SectionContent
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut content = Self::new();
        for (k, v) in iter {
            content.insert(k, v);
        }
        content
    }
}

impl Serialize for SectionContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.items.len()))?;
        for (k, v) in &self.items {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct ContentVisitor;

impl<'de> Visitor<'de> for ContentVisitor {
    type Value = SectionContent;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a table of item keys to instruction text")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut content = SectionContent::new();
        while let Some((key, text)) = access.next_entry::<String, String>()? {
            content.insert(key, text);
        }
        Ok(content)
    }
}

impl<'de> Deserialize<'de> for SectionContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ContentVisitor)
    }
}
