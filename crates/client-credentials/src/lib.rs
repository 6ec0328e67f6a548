//! OAuth2 client-credentials token manager
//!
//! Obtains an access token from an identity provider with the
//! client-credentials grant, keeps it in memory, and answers freshness
//! queries. The manager never refreshes on its own; callers decide when
//! to call `acquire()` again.
//!
//! Token lifecycle:
//! 1. Caller builds a `TokenManager` from a client id and secret
//! 2. `acquire()` POSTs the grant to the token endpoint
//! 3. The JSON response is decoded and the token checked against a `TokenPattern`
//! 4. Token and expiration instant are swapped in as one unit
//! 5. Caller reads `current_token()` and checks `is_expired()` before use
//!
//! Twitch is the reference provider; its endpoint and token format are the
//! defaults and can be overridden through `TokenManager::builder`.

pub mod constants;
pub mod credentials;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod pattern;
pub mod token;

pub use constants::*;
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use manager::{TokenManager, TokenManagerBuilder, TokenSnapshot};
pub use pattern::TokenPattern;
pub use token::{TokenResponse, request_token};
