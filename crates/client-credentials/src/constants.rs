//! Identity provider defaults
//!
//! Twitch issues app access tokens through the client-credentials grant at
//! a fixed endpoint. Its tokens are 30 ASCII alphanumerics. Other providers
//! override both values through `TokenManager::builder`.

/// Token endpoint of the reference provider
pub const TWITCH_TOKEN_ENDPOINT: &str = "https://id.twitch.tv/oauth2/token";

/// Lexical format of a Twitch app access token (matched against the whole token)
pub const TWITCH_TOKEN_PATTERN: &str = "[a-zA-Z0-9]{30}";

/// `grant_type` form value for the client-credentials grant
pub const GRANT_TYPE: &str = "client_credentials";
