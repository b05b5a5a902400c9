//! The dynamically typed property value exchanged with the engine.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::map::PropertyMap;

/// A single property value.
///
/// Objects nest as [`PropertyMap`]s. A secret wraps exactly one inner value;
/// the wrapper only marks the value for redaction, it is not encrypted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum PropertyValue {
    /// Explicit null. Decoded maps never contain it; absent and null are the same.
    Null,
    /// Boolean.
    Bool(bool),
    /// Number. Integers travel as whole `f64` values.
    Number(f64),
    /// String.
    String(String),
    /// Ordered list.
    Array(Vec<PropertyValue>),
    /// Nested object.
    Object(PropertyMap),
    /// File-like asset.
    Asset(Asset),
    /// Archive of assets.
    Archive(Archive),
    /// Secret-wrapped value.
    Secret(Box<PropertyValue>),
    /// Value not known until apply time.
    Computed,
}

/// A file-like asset. Exactly one of `text`, `path` or `uri` is normally set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Asset {
    /// Inline contents.
    pub text: Option<String>,
    /// Path on the local filesystem.
    pub path: Option<String>,
    /// Remote location.
    pub uri: Option<String>,
    /// Content hash assigned by the engine.
    pub hash: Option<String>,
}

/// An archive of assets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Archive {
    /// Named members, each an asset or a nested archive.
    pub assets: Option<PropertyMap>,
    /// Path on the local filesystem.
    pub path: Option<String>,
    /// Remote location.
    pub uri: Option<String>,
    /// Content hash assigned by the engine.
    pub hash: Option<String>,
}

impl Asset {
    /// Creates an inline text asset.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Returns the textual contents of the asset.
    ///
    /// # Errors
    ///
    /// Returns an error if a path asset cannot be read, or if the asset is
    /// only reachable through a URI.
    pub fn read_text(&self) -> std::io::Result<String> {
        if let Some(text) = &self.text {
            return Ok(text.clone());
        }
        if let Some(path) = &self.path {
            return std::fs::read_to_string(Path::new(path));
        }
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!(
                "asset at {} cannot be read locally",
                self.uri.as_deref().unwrap_or("<unknown location>")
            ),
        ))
    }
}

impl PropertyValue {
    /// Wraps a value as a secret. Already secret values are not double wrapped.
    #[must_use]
    pub fn secret(value: impl Into<Self>) -> Self {
        match value.into() {
            secret @ Self::Secret(_) => secret,
            inner => Self::Secret(Box::new(inner)),
        }
    }

    /// Builds an array of strings.
    #[must_use]
    pub fn string_array<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Array(items.into_iter().map(|s| Self::String(s.into())).collect())
    }

    /// Returns true for [`PropertyValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true if the value is semantically meaningful (anything but null).
    #[must_use]
    pub const fn has_value(&self) -> bool {
        !self.is_null()
    }

    /// Returns true for a secret wrapper.
    #[must_use]
    pub const fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }

    /// Returns true if the value, or the value under a secret, is unknown.
    #[must_use]
    pub fn is_computed(&self) -> bool {
        match self {
            Self::Computed => true,
            Self::Secret(inner) => inner.is_computed(),
            Self::Null
            | Self::Bool(_)
            | Self::Number(_)
            | Self::String(_)
            | Self::Array(_)
            | Self::Object(_)
            | Self::Asset(_)
            | Self::Archive(_) => false,
        }
    }

    /// Removes one secret layer, if present.
    #[must_use]
    pub fn unwrap_secret(&self) -> &Self {
        match self {
            Self::Secret(inner) => inner,
            other => other,
        }
    }

    /// Consumes the value, removing one secret layer if present.
    #[must_use]
    pub fn into_unwrapped(self) -> Self {
        match self {
            Self::Secret(inner) => *inner,
            other => other,
        }
    }

    /// Returns the string payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean payload.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the numeric payload.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the numeric payload if it is a whole number.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            _ => None,
        }
    }

    /// Returns the array payload.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the object payload.
    #[must_use]
    pub const fn as_object(&self) -> Option<&PropertyMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the asset payload.
    #[must_use]
    pub const fn as_asset(&self) -> Option<&Asset> {
        match self {
            Self::Asset(asset) => Some(asset),
            _ => None,
        }
    }

    /// String payload, looking through one secret layer.
    #[must_use]
    pub fn secret_or_string(&self) -> Option<&str> {
        self.unwrap_secret().as_str()
    }

    /// Boolean payload, looking through one secret layer.
    #[must_use]
    pub fn secret_or_bool(&self) -> Option<bool> {
        self.unwrap_secret().as_bool()
    }

    /// Array payload, looking through one secret layer.
    #[must_use]
    pub fn secret_or_array(&self) -> Option<&[Self]> {
        self.unwrap_secret().as_array()
    }

    /// Object payload, looking through one secret layer.
    #[must_use]
    pub fn secret_or_object(&self) -> Option<&PropertyMap> {
        self.unwrap_secret().as_object()
    }

    /// Short name of the variant, used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Asset(_) => "asset",
            Self::Archive(_) => "archive",
            Self::Secret(_) => "secret",
            Self::Computed => "computed",
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for PropertyValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for PropertyValue {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<Vec<Self>> for PropertyValue {
    fn from(value: Vec<Self>) -> Self {
        Self::Array(value)
    }
}

impl From<PropertyMap> for PropertyValue {
    fn from(value: PropertyMap) -> Self {
        Self::Object(value)
    }
}

impl From<Asset> for PropertyValue {
    fn from(value: Asset) -> Self {
        Self::Asset(value)
    }
}

impl From<BTreeMap<String, String>> for PropertyValue {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self::Object(
            value
                .into_iter()
                .map(|(k, v)| (k, Self::String(v)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_not_double_wrapped() {
        let once = PropertyValue::secret("token");
        let twice = PropertyValue::secret(once.clone());
        assert_eq!(once, twice);
        assert_eq!(twice.secret_or_string(), Some("token"));
    }

    #[test]
    fn test_secret_or_accessors_handle_plain_values() {
        assert_eq!(PropertyValue::from("a").secret_or_string(), Some("a"));
        assert_eq!(PropertyValue::from(true).secret_or_bool(), Some(true));
        assert_eq!(PropertyValue::from(1.5).secret_or_string(), None);

        let array = PropertyValue::string_array(["x", "y"]);
        assert_eq!(array.secret_or_array().map(<[_]>::len), Some(2));
        assert_eq!(PropertyValue::secret(array).secret_or_array().map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_computed_under_secret_is_computed() {
        assert!(PropertyValue::secret(PropertyValue::Computed).is_computed());
        assert!(!PropertyValue::from("x").is_computed());
    }

    #[test]
    fn test_has_value_is_false_only_for_null() {
        assert!(!PropertyValue::Null.has_value());
        assert!(PropertyValue::Computed.has_value());
        assert!(PropertyValue::from("").has_value());
    }

    #[test]
    fn test_as_i64_rejects_fractions() {
        assert_eq!(PropertyValue::from(3.0).as_i64(), Some(3));
        assert_eq!(PropertyValue::from(3.5).as_i64(), None);
        assert_eq!(PropertyValue::from(7_i64).as_i64(), Some(7));
    }

    #[test]
    fn test_text_asset_reads_inline_contents() {
        let asset = Asset::from_text("values:\n  a: b");
        assert_eq!(asset.read_text().ok().as_deref(), Some("values:\n  a: b"));
    }

    #[test]
    fn test_path_asset_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("env.yaml");
        std::fs::write(&path, "values: {}").expect("write");
        let asset = Asset {
            path: Some(path.display().to_string()),
            ..Asset::default()
        };
        assert_eq!(asset.read_text().expect("read"), "values: {}");
    }

    #[test]
    fn test_uri_asset_is_not_readable() {
        let asset = Asset {
            uri: Some("https://example.com/env.yaml".to_string()),
            ..Asset::default()
        };
        assert!(asset.read_text().is_err());
    }
}
