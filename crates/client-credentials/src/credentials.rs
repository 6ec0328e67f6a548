//! Client credentials issued by the identity provider

use common::Secret;

use crate::error::{Error, Result};

/// Client identifier and secret, fixed for the life of a manager.
///
/// The secret is only reachable through `Secret::expose`; `Debug` prints
/// `[REDACTED]` in its place.
#[derive(Debug, Clone)]
pub struct Credentials {
    client_id: String,
    client_secret: Secret<String>,
}

impl Credentials {
    /// Both values are required; blank values are rejected.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        let client_id = client_id.into();
        let client_secret = Secret::new(client_secret.into());

        if client_id.trim().is_empty() {
            return Err(Error::Config("client_id must not be empty".into()));
        }
        if client_secret.expose().trim().is_empty() {
            return Err(Error::Config("client_secret must not be empty".into()));
        }

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &Secret<String> {
        &self.client_secret
    }
}
