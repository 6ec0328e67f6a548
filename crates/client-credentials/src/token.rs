//! Client-credentials grant exchange
//!
//! One POST of `client_id`, `client_secret` and
//! `grant_type=client_credentials` as a form body, one JSON document back.
//! Transport, decoding and validation are separate steps so each failure
//! maps to its own `Error` variant.

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::constants::GRANT_TYPE;
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::pattern::TokenPattern;

/// Token endpoint response.
///
/// `expires_in` is a delta in seconds from the response time. A missing
/// `access_token` decodes as empty and is rejected by `validate`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    /// Seconds until the access token expires (delta, not absolute)
    pub expires_in: i64,
}

impl TokenResponse {
    /// Decode a response body. The body is kept in the error for diagnosis.
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|source| Error::Decode {
            source,
            body: body.to_owned(),
        })
    }

    /// Check the access token is present and well-formed.
    pub fn validate(&self, pattern: &TokenPattern, body: &str) -> Result<()> {
        let reason = if self.access_token.is_empty() {
            "access_token is missing or empty".to_owned()
        } else if !pattern.matches(&self.access_token) {
            format!("access_token does not match pattern '{pattern}'")
        } else {
            return Ok(());
        };

        warn!(reason = %reason, "token endpoint returned an unusable token");
        Err(Error::Validation {
            reason,
            body: body.to_owned(),
        })
    }
}

/// POST the client-credentials grant and return the raw response body.
///
/// A non-2xx status is an `Error::Status` carrying the status and body.
/// `timeout` bounds the whole exchange when set.
pub async fn request_token(
    client: &reqwest::Client,
    token_url: &Url,
    credentials: &Credentials,
    timeout: Option<Duration>,
) -> Result<String> {
    let mut request = client.post(token_url.clone()).form(&[
        ("client_id", credentials.client_id()),
        ("client_secret", credentials.client_secret().expose().as_str()),
        ("grant_type", GRANT_TYPE),
    ]);
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }

    debug!(url = %token_url, client_id = credentials.client_id(), "requesting access token");

    let response = request.send().await.map_err(|e| {
        if e.is_builder() {
            Error::Config(format!("building token request: {e}"))
        } else if e.is_timeout() {
            Error::Transport(format!("token request timed out: {e}"))
        } else {
            Error::Transport(format!("token request failed: {e}"))
        }
    })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Transport(format!("reading token response body: {e}")))?;

    if !status.is_success() {
        return Err(Error::Status { status, body });
    }

    Ok(body)
}
