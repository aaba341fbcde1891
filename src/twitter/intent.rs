//! Classification of a Micropub request into one Twitter action, and the
//! request each action turns into.

use crate::error::PublishError;
use crate::micropub::PublishRequest;

use super::api::{RemoteCall, TwitterEndpoints};
use super::reference::TweetRef;
use super::status::{address_to, shorten, Coordinates};

/// Everything needed to compose a new status or a reply.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub content: Option<String>,
    /// Canonical URL of the post on the author's site, kept when text is elided
    pub permalink: Option<String>,
    pub in_reply_to: Option<TweetRef>,
    pub location: Option<Coordinates>,
}

/// The single action a publish request maps to.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Repost(TweetRef),
    Like(TweetRef),
    Post(PostDraft),
}

/// Determines the intent of a request. The first matching rule wins:
///
/// 1. `repost-of` resolving to a tweet
/// 2. `like-of` resolving to a tweet
/// 3. anything else is a new status, a reply when `in-reply-to` resolves
///
/// A `repost-of` or `like-of` that is not a tweet permalink does not fail the
/// request; classification moves on to the next rule.
///
/// # Errors
///
/// `PublishError::EmptyPost` when there is neither content nor a resolvable
/// reference, so no remote call is made.
pub fn classify(request: &PublishRequest) -> Result<Intent, PublishError> {
    if let Some(target) = request.repost_of.as_deref().and_then(TweetRef::parse) {
        return Ok(Intent::Repost(target));
    }

    if let Some(target) = request.like_of.as_deref().and_then(TweetRef::parse) {
        return Ok(Intent::Like(target));
    }

    let in_reply_to = request.in_reply_to.as_deref().and_then(TweetRef::parse);
    if request.content.is_none() && in_reply_to.is_none() {
        return Err(PublishError::EmptyPost);
    }

    Ok(Intent::Post(PostDraft {
        content: request.content.clone(),
        permalink: request.url.clone(),
        in_reply_to,
        location: request
            .location
            .as_deref()
            .and_then(Coordinates::from_geo_uri),
    }))
}

impl PostDraft {
    /// Final status text: addressed to the reply target if there is one, then
    /// shortened to fit.
    pub fn status_text(&self) -> String {
        let text = match &self.in_reply_to {
            Some(target) => address_to(&target.author, self.content.as_deref()),
            None => self.content.clone().unwrap_or_default(),
        };
        shorten(&text, self.permalink.as_deref())
    }
}

impl Intent {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::Repost(_) => "repost",
            Intent::Like(_) => "like",
            Intent::Post(draft) if draft.in_reply_to.is_some() => "reply",
            Intent::Post(_) => "post",
        }
    }

    /// Builds the outbound request for this intent.
    pub fn remote_call(&self, endpoints: &TwitterEndpoints) -> RemoteCall {
        match self {
            Intent::Repost(target) => RemoteCall::post(endpoints.retweet(&target.id), Vec::new()),
            Intent::Like(target) => RemoteCall::post(
                endpoints.favorite(),
                vec![("id".to_string(), target.id.clone())],
            ),
            Intent::Post(draft) => {
                let mut params = vec![("status".to_string(), draft.status_text())];
                if let Some(target) = &draft.in_reply_to {
                    params.push(("in_reply_to_status_id".to_string(), target.id.clone()));
                }
                if let Some(coordinates) = &draft.location {
                    params.push(("lat".to_string(), coordinates.lat.clone()));
                    params.push(("long".to_string(), coordinates.long.clone()));
                }
                RemoteCall::post(endpoints.update_status(), params)
            }
        }
    }
}
