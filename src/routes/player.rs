use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use mongodb::bson::DateTime;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::common::MessageResponse,
    dto::player::{
        CreateProfileRequest, ProfileDto, SyncTeamTotalsResponse, UpdateBanStatusRequest,
        UpdatePlaytimeRequest,
    },
    error::AppError,
    services::{player_service, team_service},
    state::SharedPlayerState,
};

/// Routes of the player service: profile CRUD and team aggregation.
pub fn router() -> Router<SharedPlayerState> {
    Router::new()
        .route("/profiles", post(create_profile))
        .route("/profiles/{uuid}", get(get_profile))
        .route("/profiles/{uuid}/playtime", put(update_playtime))
        .route("/profiles/{uuid}/deltaplaytime", put(update_delta_playtime))
        .route("/profiles/{uuid}/ban", put(update_ban_status))
        .route("/profiles/{uuid}/lastlogin", put(update_last_login))
        .route("/teams/sync-totals", post(sync_team_totals))
}

/// Create a profile, assigning the least-populated team.
#[utoipa::path(
    post,
    path = "/profiles",
    tag = "profiles",
    request_body = CreateProfileRequest,
    responses(
        (status = 201, description = "Profile created", body = ProfileDto),
        (status = 409, description = "Profile already exists")
    )
)]
pub async fn create_profile(
    State(state): State<SharedPlayerState>,
    Json(payload): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<ProfileDto>), AppError> {
    payload
        .validate()
        .map_err(|err| AppError::BadInput(err.to_string()))?;
    let profile = player_service::create_profile(&state, &payload.uuid).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Fetch a profile by uuid.
#[utoipa::path(
    get,
    path = "/profiles/{uuid}",
    tag = "profiles",
    params(("uuid" = Uuid, Path, description = "Player uuid")),
    responses(
        (status = 200, body = ProfileDto),
        (status = 404, description = "Profile not found")
    )
)]
pub async fn get_profile(
    State(state): State<SharedPlayerState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<ProfileDto>, AppError> {
    let profile = player_service::get_profile(&state, &uuid.to_string()).await?;
    Ok(Json(profile))
}

/// Overwrite a profile's total playtime.
#[utoipa::path(
    put,
    path = "/profiles/{uuid}/playtime",
    tag = "profiles",
    params(("uuid" = Uuid, Path, description = "Player uuid")),
    request_body = UpdatePlaytimeRequest,
    responses((status = 200, body = MessageResponse), (status = 404, description = "Profile not found"))
)]
pub async fn update_playtime(
    State(state): State<SharedPlayerState>,
    Path(uuid): Path<Uuid>,
    Json(payload): Json<UpdatePlaytimeRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let uuid = uuid.to_string();
    player_service::update_playtime(&state, &uuid, payload.ticks_to_set).await?;
    Ok(Json(MessageResponse::new(format!(
        "playtime updated for profile {uuid}"
    ))))
}

/// Overwrite a profile's delta playtime.
#[utoipa::path(
    put,
    path = "/profiles/{uuid}/deltaplaytime",
    tag = "profiles",
    params(("uuid" = Uuid, Path, description = "Player uuid")),
    request_body = UpdatePlaytimeRequest,
    responses((status = 200, body = MessageResponse), (status = 404, description = "Profile not found"))
)]
pub async fn update_delta_playtime(
    State(state): State<SharedPlayerState>,
    Path(uuid): Path<Uuid>,
    Json(payload): Json<UpdatePlaytimeRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let uuid = uuid.to_string();
    player_service::update_delta_playtime(&state, &uuid, payload.ticks_to_set).await?;
    Ok(Json(MessageResponse::new(format!(
        "delta playtime updated for profile {uuid}"
    ))))
}

/// Update a profile's durable ban flags.
#[utoipa::path(
    put,
    path = "/profiles/{uuid}/ban",
    tag = "profiles",
    params(("uuid" = Uuid, Path, description = "Player uuid")),
    request_body = UpdateBanStatusRequest,
    responses((status = 200, body = MessageResponse), (status = 404, description = "Profile not found"))
)]
pub async fn update_ban_status(
    State(state): State<SharedPlayerState>,
    Path(uuid): Path<Uuid>,
    Json(payload): Json<UpdateBanStatusRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let uuid = uuid.to_string();
    let expires_at = payload
        .ban_expires_at
        .as_deref()
        .map(DateTime::parse_rfc3339_str)
        .transpose()
        .map_err(|err| AppError::BadInput(format!("invalid banExpiresAt timestamp: {err}")))?;

    player_service::update_ban_status(&state, &uuid, payload.banned, expires_at).await?;
    Ok(Json(MessageResponse::new(format!(
        "ban status updated for profile {uuid}"
    ))))
}

/// Touch a profile's last-login timestamp.
#[utoipa::path(
    put,
    path = "/profiles/{uuid}/lastlogin",
    tag = "profiles",
    params(("uuid" = Uuid, Path, description = "Player uuid")),
    responses((status = 200, body = MessageResponse), (status = 404, description = "Profile not found"))
)]
pub async fn update_last_login(
    State(state): State<SharedPlayerState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    let uuid = uuid.to_string();
    player_service::update_last_login(&state, &uuid).await?;
    Ok(Json(MessageResponse::new(format!(
        "last login updated for profile {uuid}"
    ))))
}

/// Aggregate playtime per team, persist the totals and return them.
#[utoipa::path(
    post,
    path = "/teams/sync-totals",
    tag = "teams",
    responses((status = 200, body = SyncTeamTotalsResponse))
)]
pub async fn sync_team_totals(
    State(state): State<SharedPlayerState>,
) -> Result<Json<SyncTeamTotalsResponse>, AppError> {
    let team_totals = team_service::sync_team_totals(&state).await?;
    Ok(Json(SyncTeamTotalsResponse {
        message: format!("synchronized totals for {} team(s)", team_totals.len()),
        team_totals,
    }))
}
