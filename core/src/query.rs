//! Query-string parameters.
//!
//! sFlow-RT filters take repeated keys (`agent=10.0.0.1&agent=test1`,
//! `os_name=linux&os_name=windows`), so a query is an ordered list of pairs
//! rather than a map. Values are stored unencoded.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one `key=value` pair.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// Append `key=value` once per value.
    pub fn with_all<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let key = key.into();
        for value in values {
            self.push(key.clone(), value);
        }
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<K, V> From<&[(K, V)]> for Query
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn from(pairs: &[(K, V)]) -> Self {
        pairs
            .iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect()
    }
}

// Maps are expanded in key order so the resulting query string is stable.
impl From<HashMap<String, String>> for Query {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect::<BTreeMap<_, _>>().into_iter().collect()
    }
}

impl From<HashMap<String, Vec<String>>> for Query {
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        let sorted: BTreeMap<_, _> = map.into_iter().collect();
        sorted
            .into_iter()
            .fold(Query::new(), |query, (key, values)| query.with_all(key, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn repeated_keys_are_kept_in_order() {
        let query = Query::new().with("agent", "10.0.0.1").with("agent", "test1");
        assert_eq!(query.pairs(), pairs(&[("agent", "10.0.0.1"), ("agent", "test1")]));
    }

    #[test]
    fn with_all_expands_values() {
        let query = Query::new()
            .with_all("os_name", ["linux", "windows"])
            .with("cpu_num", "2");
        assert_eq!(query.len(), 3);
        assert_eq!(
            query.into_pairs(),
            pairs(&[("os_name", "linux"), ("os_name", "windows"), ("cpu_num", "2")])
        );
    }

    #[test]
    fn from_single_value_map_is_sorted() {
        let mut map = HashMap::new();
        map.insert("host_name".to_string(), "*web.*".to_string());
        map.insert("cpu_num".to_string(), "2".to_string());
        let query = Query::from(map);
        assert_eq!(query.pairs(), pairs(&[("cpu_num", "2"), ("host_name", "*web.*")]));
    }

    #[test]
    fn from_multi_value_map() {
        let mut map = HashMap::new();
        map.insert("agent".to_string(), vec!["a".to_string(), "b".to_string()]);
        let query = Query::from(map);
        assert_eq!(query.pairs(), pairs(&[("agent", "a"), ("agent", "b")]));
    }

    #[test]
    fn from_slice() {
        let query = Query::from(&[("os_name", "linux")][..]);
        assert_eq!(query.pairs(), pairs(&[("os_name", "linux")]));
        assert!(Query::new().is_empty());
    }
}
