//! String-keyed property bags and typed field readers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PropertyError;

use super::value::PropertyValue;

/// A string-keyed bag of property values.
///
/// Keys are kept sorted so iteration order, and therefore every encoded
/// response, is deterministic. Null values are dropped on insert and on
/// decode: an absent key and a null key mean the same thing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, PropertyValue>",
    into = "BTreeMap<String, PropertyValue>"
)]
pub struct PropertyMap(BTreeMap<String, PropertyValue>);

impl PropertyMap {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    /// Returns a mutable reference to the value under `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut PropertyValue> {
        self.0.get_mut(key)
    }

    /// Returns true if `key` holds a value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Inserts a value, dropping nulls. Returns the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        let key = key.into();
        let value = value.into();
        if value.is_null() {
            return self.0.remove(&key);
        }
        self.0.insert(key, value)
    }

    /// Inserts the value only when it is present.
    pub fn insert_opt<V: Into<PropertyValue>>(&mut self, key: impl Into<String>, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    /// Removes and returns the value under `key`.
    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.0.remove(key)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the map has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.0.iter()
    }

    /// Iterates over keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Reads a required string, looking through one secret layer.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::Missing`] when absent and
    /// [`PropertyError::WrongType`] when the value is not a string.
    pub fn required_str(&self, key: &str) -> Result<&str, PropertyError> {
        self.optional_str(key)?
            .ok_or_else(|| PropertyError::missing(key))
    }

    /// Reads an optional string, looking through one secret layer.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::WrongType`] when the value is not a string.
    pub fn optional_str(&self, key: &str) -> Result<Option<&str>, PropertyError> {
        self.get(key)
            .map(|value| {
                value
                    .secret_or_string()
                    .ok_or_else(|| PropertyError::wrong_type(key, "a string"))
            })
            .transpose()
    }

    /// Reads an optional boolean, looking through one secret layer.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::WrongType`] when the value is not a boolean.
    pub fn optional_bool(&self, key: &str) -> Result<Option<bool>, PropertyError> {
        self.get(key)
            .map(|value| {
                value
                    .secret_or_bool()
                    .ok_or_else(|| PropertyError::wrong_type(key, "a boolean"))
            })
            .transpose()
    }

    /// Reads an optional whole number, looking through one secret layer.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::WrongType`] when the value is not a whole number.
    pub fn optional_i64(&self, key: &str) -> Result<Option<i64>, PropertyError> {
        self.get(key)
            .map(|value| {
                value
                    .unwrap_secret()
                    .as_i64()
                    .ok_or_else(|| PropertyError::wrong_type(key, "an integer"))
            })
            .transpose()
    }

    /// Reads a required whole number, looking through one secret layer.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::Missing`] or [`PropertyError::WrongType`].
    pub fn required_i64(&self, key: &str) -> Result<i64, PropertyError> {
        self.optional_i64(key)?
            .ok_or_else(|| PropertyError::missing(key))
    }

    /// Reads an optional nested object, looking through one secret layer.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::WrongType`] when the value is not an object.
    pub fn optional_object(&self, key: &str) -> Result<Option<&Self>, PropertyError> {
        self.get(key)
            .map(|value| {
                value
                    .secret_or_object()
                    .ok_or_else(|| PropertyError::wrong_type(key, "an object"))
            })
            .transpose()
    }

    /// Reads an optional array of strings. Elements may individually be secret.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::WrongType`] when the value is not an array of strings.
    pub fn string_array(&self, key: &str) -> Result<Option<Vec<String>>, PropertyError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let items = value
            .secret_or_array()
            .ok_or_else(|| PropertyError::wrong_type(key, "an array of strings"))?;
        items
            .iter()
            .map(|item| {
                item.secret_or_string()
                    .map(str::to_string)
                    .ok_or_else(|| PropertyError::wrong_type(key, "an array of strings"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// Reads an optional string-to-string map. Values may individually be secret.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::WrongType`] when the value is not a map of strings.
    pub fn string_map(&self, key: &str) -> Result<Option<BTreeMap<String, String>>, PropertyError> {
        let Some(object) = self.optional_object(key)? else {
            return Ok(None);
        };
        object
            .iter()
            .map(|(k, v)| {
                v.secret_or_string()
                    .map(|s| (k.clone(), s.to_string()))
                    .ok_or_else(|| PropertyError::wrong_type(key, "a map of strings"))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Some)
    }
}

impl From<BTreeMap<String, PropertyValue>> for PropertyMap {
    fn from(map: BTreeMap<String, PropertyValue>) -> Self {
        map.into_iter().collect()
    }
}

impl From<PropertyMap> for BTreeMap<String, PropertyValue> {
    fn from(map: PropertyMap) -> Self {
        map.0
    }
}

impl<K: Into<String>> FromIterator<(K, PropertyValue)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, PropertyValue)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for PropertyMap {
    type Item = (String, PropertyValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PropertyMap {
    type Item = (&'a String, &'a PropertyValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<&str> for PropertyMap {
    type Output = PropertyValue;

    /// Returns the value under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the key is absent.
    fn index(&self, key: &str) -> &PropertyValue {
        &self.0[key]
    }
}

/// Builds a [`PropertyMap`] from `key => value` pairs.
#[macro_export]
macro_rules! props {
    () => { $crate::property::PropertyMap::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::property::PropertyMap::new();
        $( map.insert($key, $value); )+
        map
    }};
}
