//! Interpretation of Twitter's answer to a publish call.

use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::PublishError;
use crate::micropub::Published;

use super::api::{sanitize_for_logging, RemoteResponse};
use super::reference::permalink;

#[derive(Debug, Deserialize)]
pub struct TweetAuthor {
    pub screen_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The part of a v1.1 tweet object the bridge relies on.
///
/// `statuses/update`, `statuses/retweet/:id` and `favorites/create` all answer
/// with a tweet object: the new status, the new retweet, or the liked tweet
/// respectively. Everything besides the id and author handle is kept opaquely.
#[derive(Debug, Deserialize)]
pub struct TweetResponse {
    pub id_str: String,
    pub user: TweetAuthor,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TweetResponse {
    pub fn permalink(&self) -> String {
        permalink(&self.user.screen_name, &self.id_str)
    }
}

/// Turns a completed call into the permalink of the affected tweet.
///
/// # Errors
///
/// - `PublishError::RemoteRejected` for any non-2xx status, carrying the body
/// - `PublishError::InvalidResponse` when a 2xx body lacks `id_str` or
///   `user.screen_name`
pub fn interpret_response(response: &RemoteResponse) -> Result<Published, PublishError> {
    if !response.is_success() {
        warn!(
            "Twitter rejected publish with status {}: {}",
            response.status,
            sanitize_for_logging(&response.body, 200)
        );
        return Err(PublishError::RemoteRejected {
            status: response.status,
            body: response.body.clone(),
        });
    }

    let tweet: TweetResponse = serde_json::from_str(&response.body)
        .map_err(|e| PublishError::InvalidResponse(e.to_string()))?;
    debug!(
        "Twitter returned tweet {} by @{} ({} extra fields)",
        tweet.id_str,
        tweet.user.screen_name,
        tweet.extra.len()
    );

    Ok(Published {
        location: tweet.permalink(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok(body: Value) -> RemoteResponse {
        RemoteResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_success_builds_permalink() {
        let published = interpret_response(&ok(json!({
            "user": {"screen_name": "cppgandalf", "id_str": "1"},
            "id_str": "9899100",
            "text": "You shall not pass by reference!",
        })))
        .unwrap();
        assert_eq!(published.location, "https://twitter.com/cppgandalf/status/9899100");
        assert_eq!(published.status(), 201);
    }

    #[test]
    fn test_rejection_carries_status_and_body() {
        let response = RemoteResponse {
            status: 403,
            body: r#"{"errors":[{"code":187,"message":"Status is a duplicate."}]}"#.to_string(),
        };
        match interpret_response(&response) {
            Err(PublishError::RemoteRejected { status, body }) => {
                assert_eq!(status, 403);
                assert!(body.contains("duplicate"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_are_invalid() {
        let result = interpret_response(&ok(json!({"id_str": "1"})));
        assert!(matches!(result, Err(PublishError::InvalidResponse(_))));

        let result = interpret_response(&ok(json!({"user": {"screen_name": "a"}, "id": 1})));
        assert!(matches!(result, Err(PublishError::InvalidResponse(_))));

        let result = interpret_response(&RemoteResponse {
            status: 200,
            body: "<html>".to_string(),
        });
        assert!(matches!(result, Err(PublishError::InvalidResponse(_))));
    }
}
