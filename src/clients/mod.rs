//! Outbound HTTP clients for external collaborators.
//!
//! Each collaborator sits behind a narrow trait so service logic and tests
//! never depend on the wire; production wiring injects the reqwest-backed
//! implementations.

mod identity;
mod player;

use thiserror::Error;

pub use identity::{HttpIdentityClient, IdentityApi};
pub use player::{HttpPlayerClient, PlayerApi};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to `{url}` failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("`{url}` answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to decode response from `{url}`")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}
