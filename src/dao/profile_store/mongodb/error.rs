use mongodb::error::Error as MongoError;
use thiserror::Error;

use crate::dao::storage::StorageError;

pub type MongoResult<T> = Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to create profile `{uuid}`")]
    CreateProfile {
        uuid: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load profile `{uuid}`")]
    LoadProfile {
        uuid: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to update `{field}` of profile `{uuid}`")]
    UpdateProfile {
        uuid: String,
        field: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to list profiles pending enrichment")]
    FindUnenriched {
        #[source]
        source: MongoError,
    },
    #[error("failed to aggregate team playtimes")]
    AggregateTeams {
        #[source]
        source: MongoError,
    },
    #[error("failed to upsert team `{team}`")]
    EnsureTeam {
        team: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list teams")]
    ListTeams {
        #[source]
        source: MongoError,
    },
    #[error("failed to update team `{team}`")]
    UpdateTeam {
        team: String,
        #[source]
        source: MongoError,
    },
}

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        let message = err.to_string();
        StorageError::unavailable(message, err)
    }
}
