//! Token Types
//!
//! Token endpoint response, the persisted token bundle and the resource map.

use base64::Engine;
use ring::hmac;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::AuthenticationError;

/// Service name to endpoint URL, discovered after authentication.
pub type ResourceMap = BTreeMap<String, String>;

/// Token response from the token endpoint.
///
/// Only `access_token` and `instance_url` are required to parse; the rest is
/// checked when converting into a [`TokenBundle`].
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Per-organization API base URL.
    pub instance_url: String,
    /// Identity URL.
    #[serde(default)]
    pub id: Option<String>,
    /// Issue time; the platform sends it as a string of epoch millis, some
    /// proxies as a number.
    #[serde(default, deserialize_with = "deserialize_issued_at")]
    pub issued_at: Option<String>,
    /// Base64 HMAC-SHA256 of `id + issued_at`.
    #[serde(default)]
    pub signature: Option<String>,
    /// Token type (usually "Bearer").
    #[serde(default)]
    pub token_type: Option<String>,
    /// Additional fields.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

fn deserialize_issued_at<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    }))
}

/// The credential set persisted after a successful authentication.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,
    pub instance_url: String,
    pub id: String,
    #[serde(deserialize_with = "deserialize_required_issued_at")]
    pub issued_at: String,
    pub signature: String,
}

fn deserialize_required_issued_at<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_issued_at(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("issued_at must not be null"))
}

impl std::fmt::Debug for TokenBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBundle")
            .field("access_token", &"[REDACTED]")
            .field("instance_url", &self.instance_url)
            .field("id", &self.id)
            .field("issued_at", &self.issued_at)
            .field("signature", &self.signature)
            .finish()
    }
}

impl TokenBundle {
    /// Build a bundle from a token response, rejecting partial responses.
    pub fn from_response(response: TokenResponse) -> Result<Self, AuthenticationError> {
        fn required(value: Option<String>, field: &str) -> Result<String, AuthenticationError> {
            value.ok_or_else(|| AuthenticationError::IncompleteToken {
                field: field.to_string(),
            })
        }

        let bundle = Self {
            access_token: response.access_token,
            instance_url: response.instance_url,
            id: required(response.id, "id")?,
            issued_at: required(response.issued_at, "issued_at")?,
            signature: required(response.signature, "signature")?,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Every field must be non-empty.
    pub fn validate(&self) -> Result<(), AuthenticationError> {
        let fields = [
            ("access_token", &self.access_token),
            ("instance_url", &self.instance_url),
            ("id", &self.id),
            ("issued_at", &self.issued_at),
            ("signature", &self.signature),
        ];

        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(AuthenticationError::IncompleteToken {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Check `signature` against HMAC-SHA256(`secret`, `id + issued_at`).
    pub fn verify_signature(&self, secret: &str) -> bool {
        let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(&self.signature)
        else {
            return false;
        };

        let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
        let message = format!("{}{}", self.id, self.issued_at);
        hmac::verify(&key, message.as_bytes(), &expected).is_ok()
    }
}

/// Compute the base64 signature the platform attaches to a token response.
pub fn compute_signature(secret: &str, id: &str, issued_at: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let message = format!("{}{}", id, issued_at);
    let tag = hmac::sign(&key, message.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(tag.as_ref())
}
