//! Client configuration
//!
//! Credentials, retries and the default region come from the standard AWS
//! provider chain. Two overrides are read from the environment:
//!
//! | Variable              | Effect                                      |
//! |-----------------------|---------------------------------------------|
//! | `DYNORM_ENDPOINT_URL` | Custom endpoint, e.g. DynamoDB Local        |
//! | `DYNORM_REGION`       | Region, overriding the provider chain       |

use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::Client;
use tracing::info;

use crate::errors::{Error, Result};

const ENDPOINT_URL_ENV: &str = "DYNORM_ENDPOINT_URL";
const REGION_ENV: &str = "DYNORM_REGION";

/// Store connection settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
}

impl Config {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; empty values count as unset
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let endpoint_url = read(ENDPOINT_URL_ENV);
        if let Some(url) = &endpoint_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::Config(format!(
                    "{} must be an http(s) URL, got {}",
                    ENDPOINT_URL_ENV, url
                )));
            }
        }

        Ok(Self {
            endpoint_url,
            region: read(REGION_ENV),
        })
    }

    /// Build a DynamoDB client with these settings applied
    pub async fn client(&self) -> Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(url) = &self.endpoint_url {
            info!(endpoint_url = %url, "using custom DynamoDB endpoint");
            loader = loader.endpoint_url(url);
        }
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;
        Client::new(&sdk_config)
    }
}
