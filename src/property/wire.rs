//! JSON wire encoding of property values.
//!
//! Plain JSON values map onto the obvious variants. Secrets, assets and
//! archives are objects tagged with the engine's signature key, and unknown
//! values are a sentinel string.

use serde_json::{Map, Number, Value};

use crate::error::PropertyError;

use super::map::PropertyMap;
use super::value::{Archive, Asset, PropertyValue};

/// Key marking a specially encoded object.
pub const SIGNATURE_KEY: &str = "4dabf18193072939515e22adb298388d";
/// Signature of a secret.
pub const SECRET_SIGNATURE: &str = "1b47061264138c4ac30d75fd1eb44270";
/// Signature of an asset.
pub const ASSET_SIGNATURE: &str = "c44067f5952c0a294b673a41bacd8c17";
/// Signature of an archive.
pub const ARCHIVE_SIGNATURE: &str = "0def7320c3a5731c473e5ecbe6d01bc7";
/// String standing in for a value that is not yet known.
pub const UNKNOWN_SENTINEL: &str = "04da6b54-80e4-46f7-96ec-b56ff0331ba9";

impl TryFrom<Value> for PropertyValue {
    type Error = PropertyError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Ok(match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(
                n.as_f64()
                    .ok_or_else(|| PropertyError::malformed(format!("number {n} out of range")))?,
            ),
            Value::String(s) if s == UNKNOWN_SENTINEL => Self::Computed,
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(
                items
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(object) => decode_object(object)?,
        })
    }
}

fn decode_object(mut object: Map<String, Value>) -> Result<PropertyValue, PropertyError> {
    let Some(signature) = object.remove(SIGNATURE_KEY) else {
        return decode_map(object).map(PropertyValue::Object);
    };

    match signature.as_str() {
        Some(SECRET_SIGNATURE) => {
            let inner = object.remove("value").unwrap_or(Value::Null);
            Ok(PropertyValue::secret(PropertyValue::try_from(inner)?))
        }
        Some(ASSET_SIGNATURE) => Ok(PropertyValue::Asset(Asset {
            text: take_string(&mut object, "text")?,
            path: take_string(&mut object, "path")?,
            uri: take_string(&mut object, "uri")?,
            hash: take_string(&mut object, "hash")?,
        })),
        Some(ARCHIVE_SIGNATURE) => {
            let assets = match object.remove("assets") {
                Some(Value::Object(members)) => Some(decode_map(members)?),
                Some(Value::Null) | None => None,
                Some(_) => return Err(PropertyError::malformed("archive assets must be an object")),
            };
            Ok(PropertyValue::Archive(Archive {
                assets,
                path: take_string(&mut object, "path")?,
                uri: take_string(&mut object, "uri")?,
                hash: take_string(&mut object, "hash")?,
            }))
        }
        Some(other) => Err(PropertyError::malformed(format!(
            "unsupported value signature {other}"
        ))),
        None => Err(PropertyError::malformed("value signature must be a string")),
    }
}

fn decode_map(object: Map<String, Value>) -> Result<PropertyMap, PropertyError> {
    object
        .into_iter()
        .map(|(k, v)| PropertyValue::try_from(v).map(|v| (k, v)))
        .collect()
}

fn take_string(object: &mut Map<String, Value>, key: &str) -> Result<Option<String>, PropertyError> {
    match object.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(PropertyError::malformed(format!("{key} must be a string"))),
    }
}

impl From<PropertyValue> for Value {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Null => Self::Null,
            PropertyValue::Bool(b) => Self::Bool(b),
            PropertyValue::Number(n) => encode_number(n),
            PropertyValue::String(s) => Self::String(s),
            PropertyValue::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            PropertyValue::Object(map) => Self::Object(encode_map(map)),
            PropertyValue::Asset(asset) => {
                let mut object = signed(ASSET_SIGNATURE);
                put_string(&mut object, "text", asset.text);
                put_string(&mut object, "path", asset.path);
                put_string(&mut object, "uri", asset.uri);
                put_string(&mut object, "hash", asset.hash);
                Self::Object(object)
            }
            PropertyValue::Archive(archive) => {
                let mut object = signed(ARCHIVE_SIGNATURE);
                if let Some(assets) = archive.assets {
                    object.insert("assets".to_string(), Self::Object(encode_map(assets)));
                }
                put_string(&mut object, "path", archive.path);
                put_string(&mut object, "uri", archive.uri);
                put_string(&mut object, "hash", archive.hash);
                Self::Object(object)
            }
            PropertyValue::Secret(inner) => {
                let mut object = signed(SECRET_SIGNATURE);
                object.insert("value".to_string(), Self::from(*inner));
                Self::Object(object)
            }
            PropertyValue::Computed => Self::String(UNKNOWN_SENTINEL.to_string()),
        }
    }
}

/// Whole numbers are written as JSON integers so revisions read `3`, not `3.0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn encode_number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < (i64::MAX as f64) {
        return Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}

fn encode_map(map: PropertyMap) -> Map<String, Value> {
    map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
}

fn signed(signature: &str) -> Map<String, Value> {
    let mut object = Map::new();
    object.insert(SIGNATURE_KEY.to_string(), Value::String(signature.to_string()));
    object
}

fn put_string(object: &mut Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(value) = value {
        object.insert(key.to_string(), Value::String(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;
    use serde_json::json;

    #[test]
    fn test_decode_secret_and_unknown() {
        let value = json!({
            "yaml": { SIGNATURE_KEY: SECRET_SIGNATURE, "value": "values: {}" },
            "revision": UNKNOWN_SENTINEL,
            "nothing": null,
        });
        let map: PropertyMap = serde_json::from_value(value).expect("decode");
        assert_eq!(map.get("yaml"), Some(&PropertyValue::secret("values: {}")));
        assert_eq!(map.get("revision"), Some(&PropertyValue::Computed));
        assert!(!map.contains_key("nothing"));
    }

    #[test]
    fn test_decode_text_asset() {
        let value = json!({ SIGNATURE_KEY: ASSET_SIGNATURE, "text": "a: b", "hash": "abc" });
        let decoded = PropertyValue::try_from(value).expect("decode");
        assert_eq!(
            decoded.as_asset().and_then(|a| a.text.as_deref()),
            Some("a: b")
        );
    }

    #[test]
    fn test_unknown_signature_is_rejected() {
        let value = json!({ SIGNATURE_KEY: "d0e6a833031e9bbcd3f4e8bde6ca49a4" });
        assert!(PropertyValue::try_from(value).is_err());
    }

    #[test]
    fn test_whole_numbers_encode_as_integers() {
        let map = props! { "revision" => 3_i64, "ratio" => 0.5 };
        let encoded = serde_json::to_value(&map).expect("encode");
        assert_eq!(encoded, json!({ "ratio": 0.5, "revision": 3 }));
    }

    #[test]
    fn test_secret_encodes_with_signature() {
        let encoded = Value::from(PropertyValue::secret("pw"));
        assert_eq!(
            encoded,
            json!({ SIGNATURE_KEY: SECRET_SIGNATURE, "value": "pw" })
        );
    }
}
