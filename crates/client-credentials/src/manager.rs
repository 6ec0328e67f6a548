//! Token lifecycle: acquisition, storage, freshness
//!
//! The manager is Unauthenticated until the first successful `acquire()`
//! and Authenticated from then on. Expiry never clears the token; it only
//! flips `is_expired()`. A failed `acquire()` leaves the stored token and
//! its expiration untouched.
//!
//! Concurrency: acquisitions are serialized by an async mutex held for the
//! whole exchange. The `{token, expiration}` pair sits behind one `RwLock`
//! and is replaced as a unit, so readers never see a token paired with
//! another token's expiration. The lock is never held across an `.await`.

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};
use std::time::Duration;

use chrono::TimeDelta;
use common::Secret;
use reqwest::Url;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::constants::TWITCH_TOKEN_ENDPOINT;
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::metrics::record_acquisition;
use crate::pattern::TokenPattern;
use crate::token::{TokenResponse, request_token};

/// Upper bound on a provider-reported lifetime, keeps instant arithmetic in range.
const MAX_LIFETIME: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// A validated token and the instant it stops being usable.
#[derive(Debug, Clone)]
pub struct TokenSnapshot {
    access_token: Secret<String>,
    token_type: String,
    expires_in: i64,
    acquired_at: Instant,
    expires_at: Instant,
}

impl TokenSnapshot {
    fn new(response: TokenResponse, acquired_at: Instant) -> Self {
        Self {
            expires_at: expiration_from(acquired_at, response.expires_in),
            access_token: Secret::new(response.access_token),
            token_type: response.token_type,
            expires_in: response.expires_in,
            acquired_at,
        }
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose()
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Lifetime in seconds as reported by the provider.
    pub fn expires_in(&self) -> i64 {
        self.expires_in
    }

    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// `true` once the expiration instant is reached.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Signed time left before expiry; negative once expired.
    pub fn time_until_expiration(&self) -> TimeDelta {
        signed_between(Instant::now(), self.expires_at)
    }
}

/// Client-credentials token manager.
///
/// Share one instance behind an `Arc`; every method takes `&self`.
pub struct TokenManager {
    credentials: Credentials,
    token_url: Url,
    pattern: TokenPattern,
    timeout: Option<Duration>,
    client: reqwest::Client,
    state: RwLock<Option<TokenSnapshot>>,
    acquire_lock: Mutex<()>,
}

impl TokenManager {
    /// Manager for the reference provider with a fresh HTTP client.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        Self::builder(client_id, client_secret).build()
    }

    pub fn builder(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> TokenManagerBuilder {
        TokenManagerBuilder {
            client_id: client_id.into(),
            client_secret: Secret::new(client_secret.into()),
            token_url: TWITCH_TOKEN_ENDPOINT.to_owned(),
            pattern: TokenPattern::twitch(),
            timeout: None,
            client: None,
        }
    }

    /// Run the client-credentials grant and install the new token.
    ///
    /// On any error the previously stored token, if any, stays authoritative.
    pub async fn acquire(&self) -> Result<()> {
        let _in_flight = self.acquire_lock.lock().await;
        let started = std::time::Instant::now();

        let result = self.exchange().await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(response) => {
                record_acquisition("success", elapsed);
                info!(
                    token_type = %response.token_type,
                    expires_in = response.expires_in,
                    "access token acquired"
                );
                self.install(response, Instant::now());
                Ok(())
            }
            Err(e) => {
                record_acquisition(e.kind(), elapsed);
                warn!(
                    error_kind = e.kind(),
                    error = %e.log_summary(),
                    "access token acquisition failed"
                );
                Err(e)
            }
        }
    }

    async fn exchange(&self) -> Result<TokenResponse> {
        let body = request_token(&self.client, &self.token_url, &self.credentials, self.timeout)
            .await?;
        let response = TokenResponse::parse(&body)?;
        response.validate(&self.pattern, &body)?;
        Ok(response)
    }

    fn install(&self, response: TokenResponse, acquired_at: Instant) {
        let snapshot = TokenSnapshot::new(response, acquired_at);
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }

    fn read_state(&self) -> RwLockReadGuard<'_, Option<TokenSnapshot>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// The access token, or an empty string before the first acquisition.
    ///
    /// Does not check expiry; call `is_expired()` first.
    pub fn current_token(&self) -> String {
        self.read_state()
            .as_ref()
            .map(|s| s.access_token().to_owned())
            .unwrap_or_default()
    }

    /// `true` once the expiration instant is reached, and always before the
    /// first acquisition.
    pub fn is_expired(&self) -> bool {
        self.read_state()
            .as_ref()
            .is_none_or(TokenSnapshot::is_expired)
    }

    /// Signed time left before expiry; negative once expired, zero before the
    /// first acquisition.
    pub fn time_until_expiration(&self) -> TimeDelta {
        self.read_state()
            .as_ref()
            .map_or(TimeDelta::zero(), TokenSnapshot::time_until_expiration)
    }

    /// `true` when the token is missing or expires within `threshold`.
    pub fn expires_within(&self, threshold: Duration) -> bool {
        let threshold = TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX);
        self.read_state()
            .as_ref()
            .is_none_or(|s| s.is_expired() || s.time_until_expiration() <= threshold)
    }

    /// Consistent copy of the stored token and its expiration.
    pub fn snapshot(&self) -> Option<TokenSnapshot> {
        self.read_state().clone()
    }

    /// `Authorization` header value for the current token.
    pub fn bearer_header(&self) -> Option<String> {
        self.read_state()
            .as_ref()
            .map(|s| format!("Bearer {}", s.access_token()))
    }

    /// Status summary built from `is_expired()` and `time_until_expiration()`.
    pub fn describe(&self) -> String {
        format!(
            "Token Expired: {}\nExpiration: {}",
            self.is_expired(),
            format_delta(self.time_until_expiration())
        )
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    pub fn pattern(&self) -> &TokenPattern {
        &self.pattern
    }

    pub fn client_id(&self) -> &str {
        self.credentials.client_id()
    }
}

impl fmt::Display for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("credentials", &self.credentials)
            .field("token_url", &self.token_url.as_str())
            .field("pattern", &self.pattern)
            .field("timeout", &self.timeout)
            .field("authenticated", &self.read_state().is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for a `TokenManager` with non-default provider settings.
pub struct TokenManagerBuilder {
    client_id: String,
    client_secret: Secret<String>,
    token_url: String,
    pattern: TokenPattern,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

impl TokenManagerBuilder {
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn pattern(mut self, pattern: TokenPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Bound each token request; expiry surfaces as a transport error.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reuse an existing HTTP client.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<TokenManager> {
        let credentials = Credentials::new(self.client_id, self.client_secret.expose().clone())?;

        let token_url = Url::parse(&self.token_url)
            .map_err(|e| Error::Config(format!("invalid token_url '{}': {e}", self.token_url)))?;
        if !matches!(token_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "token_url must use http or https, got: {}",
                self.token_url
            )));
        }

        Ok(TokenManager {
            credentials,
            token_url,
            pattern: self.pattern,
            timeout: self.timeout,
            client: self.client.unwrap_or_default(),
            state: RwLock::new(None),
            acquire_lock: Mutex::new(()),
        })
    }
}

fn expiration_from(acquired_at: Instant, expires_in: i64) -> Instant {
    let lifetime = Duration::from_secs(expires_in.unsigned_abs()).min(MAX_LIFETIME);
    if expires_in >= 0 {
        acquired_at + lifetime
    } else {
        acquired_at.checked_sub(lifetime).unwrap_or(acquired_at)
    }
}

fn signed_between(now: Instant, expires_at: Instant) -> TimeDelta {
    if expires_at >= now {
        TimeDelta::from_std(expires_at - now).unwrap_or(TimeDelta::MAX)
    } else {
        -TimeDelta::from_std(now - expires_at).unwrap_or(TimeDelta::MAX)
    }
}

/// `1h2m3s`, `4m0s`, `-12s`
fn format_delta(delta: TimeDelta) -> String {
    let total = delta.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let secs = total.unsigned_abs();
    let (hours, minutes, seconds) = (secs / 3600, secs / 60 % 60, secs % 60);

    if hours > 0 {
        format!("{sign}{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{seconds}s")
    } else {
        format!("{sign}{seconds}s")
    }
}
