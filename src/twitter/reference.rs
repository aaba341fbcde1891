//! Parsing of twitter.com permalinks and profile URLs.

use std::sync::OnceLock;

use regex::Regex;

/// Host used for every permalink the bridge reconstructs.
pub const TWITTER_WEB_BASE: &str = "https://twitter.com";

const PERMALINK_PATTERN: &str =
    r"^https?://(?:www\.|mobile\.)?twitter\.com/(\w+)/status(?:es)?/(\w+)";
const PROFILE_PATTERN: &str = r"^https?://(?:www\.|mobile\.)?twitter\.com/(\w+)/?$";

static PERMALINK_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static PROFILE_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn permalink_regex() -> Option<&'static Regex> {
    PERMALINK_REGEX
        .get_or_init(|| Regex::new(PERMALINK_PATTERN).ok())
        .as_ref()
}

fn profile_regex() -> Option<&'static Regex> {
    PROFILE_REGEX
        .get_or_init(|| Regex::new(PROFILE_PATTERN).ok())
        .as_ref()
}

/// A tweet identified by its author handle and id.
///
/// The id is kept exactly as it appeared in the URL: tweet ids exceed what some
/// numeric types hold and are treated as opaque tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetRef {
    pub author: String,
    pub id: String,
}

impl TweetRef {
    /// Resolves a tweet permalink such as `https://twitter.com/jack/status/20`.
    ///
    /// Accepts `http` or `https`, an optional `www.` or `mobile.` subdomain, and
    /// both `/status/` and `/statuses/` paths. Anything after the id (query
    /// strings, `/photo/1`) is ignored.
    ///
    /// # Returns
    ///
    /// - `Some(TweetRef)`: If the string is a tweet permalink
    /// - `None`: If it is not; callers treat the value as plain text
    pub fn parse(candidate: &str) -> Option<TweetRef> {
        let captures = permalink_regex()?.captures(candidate.trim())?;
        Some(TweetRef {
            author: captures.get(1)?.as_str().to_string(),
            id: captures.get(2)?.as_str().to_string(),
        })
    }

    /// The canonical permalink, `https://twitter.com/<author>/status/<id>`.
    pub fn permalink(&self) -> String {
        permalink(&self.author, &self.id)
    }
}

/// Builds the canonical permalink for an author handle and tweet id.
pub fn permalink(author: &str, id: &str) -> String {
    format!("{}/{}/status/{}", TWITTER_WEB_BASE, author, id)
}

/// Extracts the screen name from a profile URL such as `https://twitter.com/fakeuser`.
///
/// Used to pre-fill the sign-in form when the user is already known, and to
/// match an IndieAuth `me` URL against an account.
pub fn screen_name_from_profile_url(url: &str) -> Option<String> {
    profile_regex()?
        .captures(url.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
