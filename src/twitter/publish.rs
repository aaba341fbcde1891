//! Publishing a Micropub request to Twitter on behalf of a connected account.

use log::{error, info, warn};

use crate::error::PublishError;
use crate::micropub::{PublishRequest, Published};
use crate::oauth::TokenCredentials;

use super::api::TwitterClient;
use super::intent::classify;
use super::response::interpret_response;

impl TwitterClient {
    /// Publishes one request as a tweet, reply, retweet or like.
    ///
    /// Exactly one remote call is made when classification succeeds, and none
    /// when it fails. Nothing is retried.
    ///
    /// # Parameters
    ///
    /// - `credentials`: The account's access token
    /// - `request`: The normalized Micropub request
    ///
    /// # Returns
    ///
    /// - `Ok(Published)`: Permalink of the affected tweet
    /// - `Err(PublishError)`: See [`PublishError`] for the failure kinds
    pub async fn publish(
        &self,
        credentials: &TokenCredentials,
        request: &PublishRequest,
    ) -> Result<Published, PublishError> {
        if !request.media.is_empty() {
            warn!(
                "Ignoring {} media attachment(s); only text is published",
                request.media.len()
            );
        }

        let intent = classify(request).map_err(|e| {
            warn!("Rejected publish request: {}", e);
            e
        })?;
        info!("Publishing {} to Twitter", intent.kind());

        let call = intent.remote_call(&self.endpoints);
        let response = self
            .send_signed::<PublishError>(&call, Some(credentials), &[], intent.kind())
            .await?;

        match interpret_response(&response) {
            Ok(published) => {
                info!("Published {} at {}", intent.kind(), published.location);
                Ok(published)
            }
            Err(e) => {
                error!("Publishing {} failed: {}", intent.kind(), e);
                Err(e)
            }
        }
    }
}
