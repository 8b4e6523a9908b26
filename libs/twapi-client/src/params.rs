//! Query parameter multimap.
//!
//! Every name maps to an ordered list of values. When encoded, the values
//! for one name are joined with commas into a single query pair, which is
//! how the API expects list-valued parameters such as `ids` or
//! `tweet.fields`.

use std::collections::BTreeMap;

/// Query parameters attached to a [`Request`](crate::Request)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: BTreeMap<String, Vec<String>>,
}

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append values to `name`, keeping anything already there.
    pub fn add<I, V>(&mut self, name: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let mut values = values.into_iter().map(Into::into).peekable();
        if values.peek().is_some() {
            self.values.entry(name.into()).or_default().extend(values);
        }
        self
    }

    /// Replace every value of `name` with `values`.
    pub fn set<I, V>(&mut self, name: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        let name = name.into();
        if values.is_empty() {
            self.values.remove(&name);
        } else {
            self.values.insert(name, values);
        }
        self
    }

    /// Remove `name` entirely.
    pub fn reset(&mut self, name: &str) -> &mut Self {
        self.values.remove(name);
        self
    }

    /// Values currently held for `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.values.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Query pairs in name order, one per name, values comma-joined.
    #[must_use]
    pub fn encode(&self) -> Vec<(&str, String)> {
        self.values
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, values)| (name.as_str(), values.join(",")))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.add(name, [value]);
        }
        params
    }
}
