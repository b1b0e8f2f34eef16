use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health status of a service and its backing store.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_owned(),
        }
    }

    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_owned(),
        }
    }
}
