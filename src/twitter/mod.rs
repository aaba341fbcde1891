//! Twitter integration module.
//!
//! This module contains the OAuth 1.0a handshake that connects an account, and
//! the publishing path that turns a Micropub request into a tweet, reply,
//! retweet or like using the v1.1 REST API.

mod api;
mod handshake;
mod intent;
mod publish;
mod reference;
mod response;
mod status;

// Re-export public API
pub use api::{HttpMethod, RemoteCall, RemoteResponse, TwitterClient, TwitterEndpoints};
pub use handshake::{
    AuthorizationPrompt, AuthorizationRedirect, AuthorizedAccount, HandshakeOutcome,
    PendingHandshake,
};
pub use intent::{classify, Intent, PostDraft};
pub use reference::{permalink, screen_name_from_profile_url, TweetRef, TWITTER_WEB_BASE};
pub use response::{interpret_response, TweetAuthor, TweetResponse};
pub use status::{
    address_to, char_weight, mentions, shorten, weighted_length, Coordinates, LINK_LENGTH,
    STATUS_LENGTH_LIMIT,
};
