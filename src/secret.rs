//! Secret fields that are plaintext in configuration but ciphertext remotely.
//!
//! Deployment settings carry credentials (SSH keys, passwords, environment
//! variables) that the service only ever returns encrypted. A resource
//! therefore keeps two views of each such field: the secret plaintext the
//! user declared, as an input, and the live ciphertext, as an output.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::property::PropertyValue;

/// Placeholder emitted as the input of imported secrets, whose plaintext is unknowable.
pub const REPLACE_ME: &str = "<REPLACE WITH ACTUAL SECRET VALUE>";

/// How the input half of a secret field is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretMode {
    /// The user's plaintext was just sent to the service.
    Create,
    /// Refresh of a tracked resource: keep the plaintext while the ciphertext is unchanged.
    Merge,
    /// Import of an untracked resource: no plaintext exists.
    Import,
}

/// Both halves of one secret field.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretEmission {
    /// Secret-wrapped plaintext to record as the resource input.
    pub input: PropertyValue,
    /// Ciphertext to record as the resource output.
    pub output: PropertyValue,
}

/// Computes the input and output representation of a secret field.
///
/// `cipher` is what the service returns for the field now. `plaintext` is the
/// value the user declared, and `stored_cipher` the ciphertext recorded by the
/// previous operation; either may be unknown.
#[must_use]
pub fn emit_secret(
    mode: SecretMode,
    cipher: &str,
    plaintext: Option<&str>,
    stored_cipher: Option<&str>,
) -> SecretEmission {
    let input = match mode {
        SecretMode::Create => plaintext.unwrap_or_default(),
        SecretMode::Merge if stored_cipher == Some(cipher) => plaintext.unwrap_or_default(),
        SecretMode::Merge => "",
        SecretMode::Import => REPLACE_ME,
    };
    SecretEmission {
        input: PropertyValue::secret(input),
        output: PropertyValue::from(cipher),
    }
}

/// A value the deployments API may hold encrypted.
///
/// Sent as `{"secret": v}` when secret and as a bare string otherwise.
/// Received as `{"ciphertext": c}` for secrets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretValue {
    /// Plaintext when `secret` is false, otherwise plaintext on the way in and ciphertext on the way out.
    pub value: String,
    /// Whether the service stores the value encrypted.
    pub secret: bool,
}

impl SecretValue {
    /// A value to be stored encrypted.
    #[must_use]
    pub fn secret(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            secret: true,
        }
    }

    /// A value stored as-is.
    #[must_use]
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            secret: false,
        }
    }
}

#[derive(Serialize)]
struct SecretEnvelope<'a> {
    secret: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SecretWire {
    Ciphertext { ciphertext: String },
    Secret { secret: String },
    Plain(String),
}

impl Serialize for SecretValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.secret {
            SecretEnvelope {
                secret: &self.value,
            }
            .serialize(serializer)
        } else {
            serializer.serialize_str(&self.value)
        }
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match SecretWire::deserialize(deserializer)? {
            SecretWire::Ciphertext { ciphertext } => Self::secret(ciphertext),
            SecretWire::Secret { secret } => Self::secret(secret),
            SecretWire::Plain(value) => Self::plain(value),
        })
    }
}
