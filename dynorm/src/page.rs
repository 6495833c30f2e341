//! Manual pagination
//!
//! A [`Cursor`] wraps the store's last-evaluated key as an opaque,
//! URL-safe string so callers can hand it to clients and resume later.

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::client::Item;
use crate::errors::{Error, Result};

/// One page of typed results
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Resume point for the next page; `None` when the store reported none
    pub cursor: Option<Cursor>,
}

/// Opaque continuation token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

/// Key attribute as stored in a cursor (binary values are base64)
#[derive(Debug, Serialize, Deserialize)]
enum KeyAttribute {
    S(String),
    N(String),
    B(String),
}

impl Cursor {
    /// Encode a last-evaluated key
    ///
    /// Key attributes can only be strings, numbers or binary.
    pub fn from_key(key: &Item) -> Result<Self> {
        let mut attrs = BTreeMap::new();
        for (name, value) in key {
            let attr = match value {
                AttributeValue::S(s) => KeyAttribute::S(s.clone()),
                AttributeValue::N(n) => KeyAttribute::N(n.clone()),
                AttributeValue::B(b) => KeyAttribute::B(URL_SAFE_NO_PAD.encode(b.as_ref())),
                _ => {
                    return Err(Error::InvalidCursor(format!(
                        "unsupported key attribute type for {}",
                        name
                    )))
                }
            };
            attrs.insert(name.clone(), attr);
        }
        let json = serde_json::to_string(&attrs).map_err(|e| Error::InvalidCursor(e.to_string()))?;
        Ok(Self(URL_SAFE_NO_PAD.encode(json.as_bytes())))
    }

    /// Decode back into an exclusive start key
    pub fn to_key(&self) -> Result<Item> {
        let bytes = URL_SAFE_NO_PAD
            .decode(&self.0)
            .map_err(|_| Error::InvalidCursor("Invalid base64".to_string()))?;
        let json = std::str::from_utf8(&bytes)
            .map_err(|_| Error::InvalidCursor("Invalid UTF-8".to_string()))?;
        let attrs: BTreeMap<String, KeyAttribute> = serde_json::from_str(json)
            .map_err(|_| Error::InvalidCursor("Invalid JSON".to_string()))?;

        attrs
            .into_iter()
            .map(|(name, attr)| {
                let value = match attr {
                    KeyAttribute::S(s) => AttributeValue::S(s),
                    KeyAttribute::N(n) => AttributeValue::N(n),
                    KeyAttribute::B(b) => {
                        let bytes = URL_SAFE_NO_PAD
                            .decode(b)
                            .map_err(|_| Error::InvalidCursor("Invalid binary key".to_string()))?;
                        AttributeValue::B(Blob::new(bytes))
                    }
                };
                Ok((name, value))
            })
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Cursor {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
