//! The Micropub vocabulary the bridge accepts and the result it hands back.

use std::collections::HashMap;

/// A file attached to a Micropub request.
///
/// Attachments are carried through to the publisher but not uploaded to Twitter.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAttachment {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A normalized post submission.
///
/// Every field is optional; blank values are stored as `None` so that the
/// classifier only ever sees usable data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishRequest {
    /// Freeform text of the post
    pub content: Option<String>,
    /// Canonical permalink of the post on the author's own site
    pub url: Option<String>,
    pub in_reply_to: Option<String>,
    pub like_of: Option<String>,
    pub repost_of: Option<String>,
    /// `geo:` URI
    pub location: Option<String>,
    pub media: Vec<MediaAttachment>,
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl PublishRequest {
    /// Builds a request from Micropub form fields.
    ///
    /// Recognized names: `content`, `url`, `in-reply-to`, `like-of`, `repost-of`,
    /// `location`. Anything else (`h`, `access_token`, ...) is ignored.
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        Self {
            content: non_blank(fields.get("content")),
            url: non_blank(fields.get("url")),
            in_reply_to: non_blank(fields.get("in-reply-to")),
            like_of: non_blank(fields.get("like-of")),
            repost_of: non_blank(fields.get("repost-of")),
            location: non_blank(fields.get("location")),
            media: Vec::new(),
        }
    }

    pub fn with_media(mut self, media: Vec<MediaAttachment>) -> Self {
        self.media = media;
        self
    }
}

/// HTTP status reported for a successfully created resource.
pub const CREATED_STATUS: u16 = 201;

/// Canonical result of a publish: the permalink of the created or affected tweet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Value for the `Location` header
    pub location: String,
}

impl Published {
    pub fn status(&self) -> u16 {
        CREATED_STATUS
    }
}
