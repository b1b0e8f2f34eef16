use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::StatusCode;

use super::ClientError;
use crate::dto::player::{ProfileDto, SyncTeamTotalsResponse, UpdatePlaytimeRequest};

/// Per-call deadline for intra-cluster requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// The slice of the Player service the game service depends on.
pub trait PlayerApi: Send + Sync {
    /// Fetch a profile; `Ok(None)` when the Player service has never seen
    /// the uuid.
    fn get_profile(&self, uuid: &str)
    -> BoxFuture<'static, Result<Option<ProfileDto>, ClientError>>;

    /// Persist a player's accumulated total playtime.
    fn update_playtime(&self, uuid: &str, ticks: f64)
    -> BoxFuture<'static, Result<(), ClientError>>;

    /// Trigger team aggregation and fetch the authoritative totals.
    fn sync_team_totals(&self)
    -> BoxFuture<'static, Result<SyncTeamTotalsResponse, ClientError>>;
}

/// reqwest-backed Player service client.
#[derive(Clone)]
pub struct HttpPlayerClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPlayerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_profile(&self, uuid: String) -> Result<Option<ProfileDto>, ClientError> {
        let url = self.endpoint(&format!("/profiles/{uuid}"));
        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<ProfileDto>()
                .await
                .map(Some)
                .map_err(|source| ClientError::Decode { url, source }),
            status => Err(ClientError::Status { url, status }),
        }
    }

    async fn update_playtime(&self, uuid: String, ticks: f64) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("/profiles/{uuid}/playtime"));
        let response = self
            .client
            .put(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&UpdatePlaytimeRequest {
                ticks_to_set: ticks,
            })
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::Status { url, status })
        }
    }

    async fn sync_team_totals(&self) -> Result<SyncTeamTotalsResponse, ClientError> {
        let url = self.endpoint("/teams/sync-totals");
        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status { url, status });
        }
        response
            .json::<SyncTeamTotalsResponse>()
            .await
            .map_err(|source| ClientError::Decode { url, source })
    }
}

impl PlayerApi for HttpPlayerClient {
    fn get_profile(
        &self,
        uuid: &str,
    ) -> BoxFuture<'static, Result<Option<ProfileDto>, ClientError>> {
        let client = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { client.get_profile(uuid).await })
    }

    fn update_playtime(
        &self,
        uuid: &str,
        ticks: f64,
    ) -> BoxFuture<'static, Result<(), ClientError>> {
        let client = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { client.update_playtime(uuid, ticks).await })
    }

    fn sync_team_totals(
        &self,
    ) -> BoxFuture<'static, Result<SyncTeamTotalsResponse, ClientError>> {
        let client = self.clone();
        Box::pin(async move { client.sync_team_totals().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_normalized() {
        let client = HttpPlayerClient::new("http://player-service:8081/");
        assert_eq!(
            client.endpoint("/profiles/abc"),
            "http://player-service:8081/profiles/abc"
        );
    }
}
