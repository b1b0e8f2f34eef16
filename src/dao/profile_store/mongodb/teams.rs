use futures::{TryStreamExt, future::BoxFuture};
use mongodb::bson::{DateTime, doc};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::TeamDoc;
use crate::dao::profile_store::TeamStore;
use crate::dao::storage::StorageResult;

#[derive(Clone)]
pub struct MongoTeamStore {
    collection: Collection<TeamDoc>,
}

impl MongoTeamStore {
    pub fn new(database: &Database, collection_name: &str) -> Self {
        Self {
            collection: database.collection::<TeamDoc>(collection_name),
        }
    }

    async fn ensure_teams(&self, teams: Vec<String>) -> MongoResult<()> {
        for team in teams {
            let now = DateTime::now();
            self.collection
                .update_one(
                    doc! { "_id": &team },
                    doc! {
                        "$setOnInsert": {
                            "player_count": 0i64,
                            "total_playtime": 0.0,
                            "created_at": now,
                            "last_updated": now,
                        }
                    },
                )
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::EnsureTeam { team, source })?;
        }
        Ok(())
    }

    async fn all_teams(&self) -> MongoResult<Vec<TeamDoc>> {
        self.collection
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::ListTeams { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListTeams { source })
    }

    async fn player_count(&self, team: String) -> MongoResult<i64> {
        let found = self
            .collection
            .find_one(doc! { "_id": &team })
            .await
            .map_err(|source| MongoDaoError::UpdateTeam { team, source })?;
        Ok(found.map(|doc| doc.player_count).unwrap_or(0))
    }

    async fn increment_player_count(&self, team: String) -> MongoResult<i64> {
        let now = DateTime::now();
        let updated = self
            .collection
            .find_one_and_update(
                doc! { "_id": &team },
                doc! {
                    "$inc": { "player_count": 1i64 },
                    "$set": { "last_updated": now },
                    "$setOnInsert": { "total_playtime": 0.0, "created_at": now },
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::UpdateTeam { team, source })?;

        // Upsert + After always yields the document; a fresh team starts at 1.
        Ok(updated.map(|doc| doc.player_count).unwrap_or(1))
    }

    async fn set_total_playtime(&self, team: String, total: f64) -> MongoResult<()> {
        self.collection
            .update_one(
                doc! { "_id": &team },
                doc! {
                    "$set": { "total_playtime": total, "last_updated": DateTime::now() },
                    "$setOnInsert": { "player_count": 0i64, "created_at": DateTime::now() },
                },
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::UpdateTeam { team, source })?;
        Ok(())
    }
}

impl TeamStore for MongoTeamStore {
    fn ensure_teams(&self, teams: Vec<String>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_teams(teams).await.map_err(Into::into) })
    }

    fn all_teams(&self) -> BoxFuture<'static, StorageResult<Vec<TeamDoc>>> {
        let store = self.clone();
        Box::pin(async move { store.all_teams().await.map_err(Into::into) })
    }

    fn player_count(&self, team: &str) -> BoxFuture<'static, StorageResult<i64>> {
        let store = self.clone();
        let team = team.to_owned();
        Box::pin(async move { store.player_count(team).await.map_err(Into::into) })
    }

    fn increment_player_count(&self, team: &str) -> BoxFuture<'static, StorageResult<i64>> {
        let store = self.clone();
        let team = team.to_owned();
        Box::pin(async move { store.increment_player_count(team).await.map_err(Into::into) })
    }

    fn set_total_playtime(&self, team: &str, total: f64) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let team = team.to_owned();
        Box::pin(async move {
            store
                .set_total_playtime(team, total)
                .await
                .map_err(Into::into)
        })
    }
}
