use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::warn;

use super::ClientError;

/// External lookups get a short leash so a slow identity provider cannot
/// stall the enrichment cycle.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// External identity service resolving uuids to usernames.
pub trait IdentityApi: Send + Sync {
    /// `Ok(None)` when the identity service does not know the uuid.
    fn username_for(&self, uuid: &str)
    -> BoxFuture<'static, Result<Option<String>, ClientError>>;
}

/// Shape of the identity provider's profile payload.
#[derive(Debug, Deserialize)]
struct IdentityProfile {
    #[allow(dead_code)]
    id: String,
    name: String,
}

#[derive(Clone)]
pub struct HttpIdentityClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    async fn username_for(&self, uuid: String) -> Result<Option<String>, ClientError> {
        let url = format!("{}/{uuid}", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(LOOKUP_TIMEOUT)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let profile = response
                    .json::<IdentityProfile>()
                    .await
                    .map_err(|source| ClientError::Decode { url, source })?;
                if profile.name.is_empty() {
                    warn!(uuid, "identity service returned an empty username");
                    return Ok(None);
                }
                Ok(Some(profile.name))
            }
            status => Err(ClientError::Status { url, status }),
        }
    }
}

impl IdentityApi for HttpIdentityClient {
    fn username_for(
        &self,
        uuid: &str,
    ) -> BoxFuture<'static, Result<Option<String>, ClientError>> {
        let client = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { client.username_for(uuid).await })
    }
}
