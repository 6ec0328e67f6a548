//! Lexical validation of access tokens

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::constants::TWITCH_TOKEN_PATTERN;
use crate::error::{Error, Result};

static TWITCH: LazyLock<TokenPattern> = LazyLock::new(|| {
    TokenPattern::new(TWITCH_TOKEN_PATTERN).expect("built-in token pattern compiles")
});

static ANY_NON_EMPTY: LazyLock<TokenPattern> =
    LazyLock::new(|| TokenPattern::new(r"(?s).+").expect("built-in token pattern compiles"));

/// Expected shape of an access token.
///
/// The expression must match the whole token, so `[a-zA-Z0-9]{30}` rejects
/// a 31-character token rather than finding 30 characters inside it.
#[derive(Clone)]
pub struct TokenPattern {
    source: String,
    regex: Regex,
}

impl TokenPattern {
    /// Compile `pattern`, anchored at both ends.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|e| Error::Config(format!("invalid token pattern '{pattern}': {e}")))?;
        Ok(Self {
            source: pattern.to_owned(),
            regex,
        })
    }

    /// 30 ASCII alphanumerics, the Twitch app access token format.
    pub fn twitch() -> Self {
        TWITCH.clone()
    }

    /// Accepts any non-empty token, for providers with opaque formats.
    pub fn any_non_empty() -> Self {
        ANY_NON_EMPTY.clone()
    }

    pub fn matches(&self, token: &str) -> bool {
        self.regex.is_match(token)
    }

    /// The pattern as given, without anchors.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl Default for TokenPattern {
    fn default() -> Self {
        Self::twitch()
    }
}

impl fmt::Debug for TokenPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TokenPattern").field(&self.source).finish()
    }
}

impl fmt::Display for TokenPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "abcDEF1234567890abcDEF12345678";

    #[test]
    fn twitch_pattern_accepts_thirty_alphanumerics() {
        assert_eq!(VALID.len(), 30);
        assert!(TokenPattern::twitch().matches(VALID));
    }

    #[test]
    fn twitch_pattern_rejects_wrong_length() {
        let pattern = TokenPattern::twitch();
        assert!(!pattern.matches(&VALID[..29]));
        assert!(!pattern.matches(&format!("{VALID}9")));
        assert!(!pattern.matches(""));
    }

    #[test]
    fn twitch_pattern_rejects_symbols() {
        let pattern = TokenPattern::twitch();
        assert!(!pattern.matches("abcDEF1234567890abcDEF1234567-"));
        assert!(!pattern.matches("abcDEF1234567890 bcDEF12345678"));
        assert!(!pattern.matches("abcDEF1234567890abcDEF1234567\n"));
    }

    #[test]
    fn custom_pattern_is_anchored() {
        let pattern = TokenPattern::new("[a-f0-9]{8}").unwrap();
        assert!(pattern.matches("deadbeef"));
        assert!(!pattern.matches("xdeadbeefx"));
        assert_eq!(pattern.as_str(), "[a-f0-9]{8}");
    }

    #[test]
    fn alternation_stays_inside_anchors() {
        let pattern = TokenPattern::new("ab|cd").unwrap();
        assert!(pattern.matches("ab"));
        assert!(pattern.matches("cd"));
        assert!(!pattern.matches("abx"));
        assert!(!pattern.matches("xcd"));
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        let err = TokenPattern::new("[unclosed").unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got: {err:?}");
    }

    #[test]
    fn any_non_empty_rejects_only_empty() {
        let pattern = TokenPattern::any_non_empty();
        assert!(pattern.matches("a.b-c_d/e"));
        assert!(!pattern.matches(""));
    }

    #[test]
    fn default_is_twitch() {
        assert_eq!(TokenPattern::default().as_str(), TWITCH_TOKEN_PATTERN);
    }
}
