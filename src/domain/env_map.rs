//! 保持插入顺序的环境变量表

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::validation::deserialize_raw;

/// 有序 key/value 表
///
/// 重复 key 覆盖原值但保留首次出现的位置
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvMap {
    entries: Vec<(String, String)>,
}

impl EnvMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = EnvMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for EnvMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// 单个值沿用表单的原始文本规则
struct RawValue(String);

impl<'de> Deserialize<'de> for RawValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_raw(deserializer).map(RawValue)
    }
}

impl<'de> Deserialize<'de> for EnvMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EnvMapVisitor;

        impl<'de> Visitor<'de> for EnvMapVisitor {
            type Value = EnvMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of environment variables")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<EnvMap, A::Error> {
                let mut map = EnvMap::new();
                while let Some((key, RawValue(value))) = access.next_entry::<String, RawValue>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(EnvMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_first_position() {
        let mut map = EnvMap::new();
        map.insert("A", "1");
        map.insert("B", "2");
        map.insert("A", "3");
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, ["A", "B"]);
        assert_eq!(map.get("A"), Some("3"));
    }

    #[test]
    fn test_json_roundtrip_keeps_document_order() {
        let map: EnvMap = serde_json::from_str(r#"{"TZ":"Europe/Berlin","PUID":1000,"AUTH_COOKIE_SECURE":true}"#).unwrap();
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, ["TZ", "PUID", "AUTH_COOKIE_SECURE"]);
        assert_eq!(map.get("PUID"), Some("1000"));
        assert_eq!(map.get("AUTH_COOKIE_SECURE"), Some("true"));

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"TZ":"Europe/Berlin","PUID":"1000","AUTH_COOKIE_SECURE":"true"}"#);
    }
}
