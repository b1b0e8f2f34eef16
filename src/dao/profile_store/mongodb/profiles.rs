use std::collections::HashMap;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::bson::{DateTime, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::{Collection, Database};
use tracing::warn;

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::PlayerProfile;
use crate::dao::profile_store::ProfileStore;
use crate::dao::storage::StorageResult;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct MongoProfileStore {
    database: Database,
    collection: Collection<PlayerProfile>,
}

impl MongoProfileStore {
    pub fn new(database: Database, collection_name: &str) -> Self {
        let collection = database.collection::<PlayerProfile>(collection_name);
        Self {
            database,
            collection,
        }
    }

    async fn create(&self, profile: PlayerProfile) -> MongoResult<bool> {
        let uuid = profile.uuid.clone();
        match self.collection.insert_one(&profile).await {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(source) => Err(MongoDaoError::CreateProfile { uuid, source }),
        }
    }

    async fn get(&self, uuid: String) -> MongoResult<Option<PlayerProfile>> {
        self.collection
            .find_one(doc! { "_id": &uuid })
            .await
            .map_err(|source| MongoDaoError::LoadProfile { uuid, source })
    }

    /// Apply a `$set` update; `false` means no profile matched the uuid.
    async fn update(
        &self,
        uuid: String,
        update: Document,
        field: &'static str,
    ) -> MongoResult<bool> {
        let result = self
            .collection
            .update_one(doc! { "_id": &uuid }, update)
            .await
            .map_err(|source| MongoDaoError::UpdateProfile {
                uuid,
                field,
                source,
            })?;
        Ok(result.matched_count > 0)
    }

    async fn uuids_missing_username(&self) -> MongoResult<Vec<String>> {
        let profiles: Vec<PlayerProfile> = self
            .collection
            .find(doc! { "username": "" })
            .await
            .map_err(|source| MongoDaoError::FindUnenriched { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::FindUnenriched { source })?;

        Ok(profiles.into_iter().map(|profile| profile.uuid).collect())
    }

    async fn aggregate_team_playtime(&self) -> MongoResult<HashMap<String, f64>> {
        let pipeline = vec![doc! {
            "$group": {
                "_id": "$team",
                "calculatedTotal": { "$sum": "$total_playtime_ticks" },
            }
        }];

        let mut cursor = self
            .collection
            .aggregate(pipeline)
            .await
            .map_err(|source| MongoDaoError::AggregateTeams { source })?;

        let mut totals = HashMap::new();
        while let Some(result) = cursor
            .try_next()
            .await
            .map_err(|source| MongoDaoError::AggregateTeams { source })?
        {
            // Profiles without a team group under null; they contribute to no
            // team total.
            let Ok(team) = result.get_str("_id") else {
                continue;
            };
            match result.get_f64("calculatedTotal") {
                Ok(total) => {
                    totals.insert(team.to_owned(), total);
                }
                Err(err) => warn!(team, error = %err, "skipping non-numeric aggregation result"),
            }
        }
        Ok(totals)
    }

    async fn health_check(&self) -> MongoResult<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|source| MongoDaoError::HealthPing { source })
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        _ => false,
    }
}

impl ProfileStore for MongoProfileStore {
    fn create(&self, profile: PlayerProfile) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.create(profile).await.map_err(Into::into) })
    }

    fn get(&self, uuid: &str) -> BoxFuture<'static, StorageResult<Option<PlayerProfile>>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { store.get(uuid).await.map_err(Into::into) })
    }

    fn set_username(
        &self,
        uuid: &str,
        username: &str,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        let update = doc! { "$set": { "username": username } };
        Box::pin(async move {
            store
                .update(uuid, update, "username")
                .await
                .map_err(Into::into)
        })
    }

    fn set_playtime(&self, uuid: &str, ticks: f64) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        let update = doc! { "$set": { "total_playtime_ticks": ticks } };
        Box::pin(async move {
            store
                .update(uuid, update, "total_playtime_ticks")
                .await
                .map_err(Into::into)
        })
    }

    fn set_delta_playtime(
        &self,
        uuid: &str,
        ticks: f64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        let update = doc! { "$set": { "delta_playtime_ticks": ticks } };
        Box::pin(async move {
            store
                .update(uuid, update, "delta_playtime_ticks")
                .await
                .map_err(Into::into)
        })
    }

    fn set_ban_status(
        &self,
        uuid: &str,
        banned: bool,
        expires_at: Option<DateTime>,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        let update = doc! { "$set": { "banned": banned, "ban_expires_at": expires_at } };
        Box::pin(async move {
            store
                .update(uuid, update, "banned")
                .await
                .map_err(Into::into)
        })
    }

    fn set_last_login(&self, uuid: &str, at: DateTime) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let uuid = uuid.to_owned();
        let update = doc! { "$set": { "last_login_at": at } };
        Box::pin(async move {
            store
                .update(uuid, update, "last_login_at")
                .await
                .map_err(Into::into)
        })
    }

    fn uuids_missing_username(&self) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let store = self.clone();
        Box::pin(async move { store.uuids_missing_username().await.map_err(Into::into) })
    }

    fn aggregate_team_playtime(&self) -> BoxFuture<'static, StorageResult<HashMap<String, f64>>> {
        let store = self.clone();
        Box::pin(async move { store.aggregate_team_playtime().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.health_check().await.map_err(Into::into) })
    }
}
