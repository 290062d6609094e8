use crate::types::SqlValue;

/// Ordered mapping of parameter name to value.
///
/// Names are stored without a leading `:` so `":id"` and `"id"` address the
/// same parameter. Inserting an existing name overwrites its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindValues {
    entries: Vec<(String, SqlValue)>,
}

fn normalize(name: &str) -> &str {
    name.strip_prefix(':').unwrap_or(name)
}

impl BindValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<SqlValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<SqlValue>) {
        let name = normalize(name.as_ref());
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        let name = normalize(name);
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlays `other` on top of these values: for a name present in both,
    /// the value from `other` wins.
    pub fn merge(mut self, other: BindValues) -> BindValues {
        self.extend(other);
        self
    }
}

impl<K: AsRef<str>, V: Into<SqlValue>> Extend<(K, V)> for BindValues {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl<K: AsRef<str>, V: Into<SqlValue>> FromIterator<(K, V)> for BindValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = BindValues::new();
        values.extend(iter);
        values
    }
}

impl<K: AsRef<str>, V: Into<SqlValue>, const N: usize> From<[(K, V); N]> for BindValues {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl IntoIterator for BindValues {
    type Item = (String, SqlValue);
    type IntoIter = std::vec::IntoIter<(String, SqlValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut values = BindValues::new();
        values.insert("a", 1);
        values.insert("b", 2);
        values.insert(":a", 3);

        assert_eq!(values.len(), 2);
        assert_eq!(values.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(values.get(":a"), Some(&SqlValue::Int32(3)));
    }

    #[test]
    fn test_merge_call_site_wins() {
        let staged = BindValues::from([("status", "active"), ("role", "admin")]);
        let call_site = BindValues::from([("status", "banned")]);

        let merged = staged.merge(call_site);
        assert_eq!(merged.get("status"), Some(&SqlValue::from("banned")));
        assert_eq!(merged.get("role"), Some(&SqlValue::from("admin")));
    }

    #[test]
    fn test_repeated_key_in_input_last_wins() {
        let values = BindValues::from([("k", 1), ("k", 2)]);
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("k"), Some(&SqlValue::Int32(2)));
    }
}
