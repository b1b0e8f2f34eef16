use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::game::{
        BanInfoResponse, BanListResponse, BanRequest, BanResponse, DeltaPlaytimeResponse,
        OnlineCountResponse, OnlineSessionEntry, OnlineSessionsResponse, OnlineStatusResponse,
        PlayerAckResponse, PlayerUuidRequest, PlaytimeResponse, SessionDurationResponse,
        TeamTotalResponse,
    },
    error::AppError,
    services::game_service,
    state::SharedGameState,
};

/// Routes of the game service: session lifecycle, read paths and ban admin.
pub fn router() -> Router<SharedGameState> {
    Router::new()
        .route("/game/player/online", post(online))
        .route("/game/player/offline", post(offline))
        .route("/game/player/refresh-online", post(refresh_online))
        .route("/game/player/{uuid}/playtime", get(playtime))
        .route("/game/player/{uuid}/deltatime", get(deltatime))
        .route("/game/player/{uuid}/is-online", get(is_online))
        .route("/game/player/{uuid}/session-duration", get(session_duration))
        .route("/game/players/online-count", get(online_count))
        .route("/game/players/online", get(online_sessions))
        .route("/game/team/{team_id}/playtime", get(team_playtime))
        .route("/game/admin/ban", post(ban))
        .route("/game/admin/unban", post(unban))
        .route("/game/admin/ban-info/{uuid}", get(ban_info))
        .route("/game/admin/bans", get(ban_list))
}

/// Bring a player online, seeding their session from the durable profile.
#[utoipa::path(
    post,
    path = "/game/player/online",
    tag = "game",
    request_body = PlayerUuidRequest,
    responses(
        (status = 200, description = "Player set online", body = PlayerAckResponse),
        (status = 403, description = "Player is banned")
    )
)]
pub async fn online(
    State(state): State<SharedGameState>,
    Json(payload): Json<PlayerUuidRequest>,
) -> Result<Json<PlayerAckResponse>, AppError> {
    payload
        .validate()
        .map_err(|err| AppError::BadInput(err.to_string()))?;
    game_service::player_online(&state, &payload.uuid).await?;
    Ok(Json(PlayerAckResponse {
        message: "player set online".to_owned(),
        uuid: payload.uuid,
    }))
}

/// Take a player offline, persisting their accumulated playtime.
#[utoipa::path(
    post,
    path = "/game/player/offline",
    tag = "game",
    request_body = PlayerUuidRequest,
    responses((status = 200, description = "Player set offline", body = PlayerAckResponse))
)]
pub async fn offline(
    State(state): State<SharedGameState>,
    Json(payload): Json<PlayerUuidRequest>,
) -> Result<Json<PlayerAckResponse>, AppError> {
    payload
        .validate()
        .map_err(|err| AppError::BadInput(err.to_string()))?;
    game_service::player_offline(&state, &payload.uuid).await?;
    Ok(Json(PlayerAckResponse {
        message: "player set offline".to_owned(),
        uuid: payload.uuid,
    }))
}

/// Extend a player's online TTL between game-server heartbeats.
#[utoipa::path(
    post,
    path = "/game/player/refresh-online",
    tag = "game",
    request_body = PlayerUuidRequest,
    responses((status = 200, description = "TTL refreshed (or player must re-enter)", body = PlayerAckResponse))
)]
pub async fn refresh_online(
    State(state): State<SharedGameState>,
    Json(payload): Json<PlayerUuidRequest>,
) -> Result<Json<PlayerAckResponse>, AppError> {
    payload
        .validate()
        .map_err(|err| AppError::BadInput(err.to_string()))?;
    game_service::refresh_online(&state, &payload.uuid).await?;
    Ok(Json(PlayerAckResponse {
        message: "online status refreshed".to_owned(),
        uuid: payload.uuid,
    }))
}

/// Current accumulated playtime of a player.
#[utoipa::path(
    get,
    path = "/game/player/{uuid}/playtime",
    tag = "game",
    params(("uuid" = Uuid, Path, description = "Player uuid")),
    responses((status = 200, body = PlaytimeResponse))
)]
pub async fn playtime(
    State(state): State<SharedGameState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<PlaytimeResponse>, AppError> {
    let playtime = game_service::player_total(&state, &uuid.to_string()).await?;
    Ok(Json(PlaytimeResponse { playtime }))
}

/// Pending delta of a player; 1.0 when none is stored.
#[utoipa::path(
    get,
    path = "/game/player/{uuid}/deltatime",
    tag = "game",
    params(("uuid" = Uuid, Path, description = "Player uuid")),
    responses((status = 200, body = DeltaPlaytimeResponse))
)]
pub async fn deltatime(
    State(state): State<SharedGameState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<DeltaPlaytimeResponse>, AppError> {
    let deltatime = game_service::player_delta(&state, &uuid.to_string()).await?;
    Ok(Json(DeltaPlaytimeResponse { deltatime }))
}

/// Whether the player currently holds an online marker.
#[utoipa::path(
    get,
    path = "/game/player/{uuid}/is-online",
    tag = "game",
    params(("uuid" = Uuid, Path, description = "Player uuid")),
    responses((status = 200, body = OnlineStatusResponse))
)]
pub async fn is_online(
    State(state): State<SharedGameState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<OnlineStatusResponse>, AppError> {
    let uuid = uuid.to_string();
    let is_online = game_service::is_online(&state, &uuid).await?;
    Ok(Json(OnlineStatusResponse { uuid, is_online }))
}

/// How long the player's current session has been running.
#[utoipa::path(
    get,
    path = "/game/player/{uuid}/session-duration",
    tag = "game",
    params(("uuid" = Uuid, Path, description = "Player uuid")),
    responses(
        (status = 200, body = SessionDurationResponse),
        (status = 404, description = "Player is not online")
    )
)]
pub async fn session_duration(
    State(state): State<SharedGameState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<SessionDurationResponse>, AppError> {
    let uuid = uuid.to_string();
    let duration_seconds = game_service::session_duration(&state, &uuid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("player {uuid} is not online")))?;
    Ok(Json(SessionDurationResponse {
        uuid,
        duration_seconds,
    }))
}

/// All currently-online players and their session starts.
#[utoipa::path(
    get,
    path = "/game/players/online",
    tag = "game",
    responses((status = 200, body = OnlineSessionsResponse))
)]
pub async fn online_sessions(
    State(state): State<SharedGameState>,
) -> Result<Json<OnlineSessionsResponse>, AppError> {
    let players: Vec<OnlineSessionEntry> = game_service::online_sessions(&state)
        .await?
        .into_iter()
        .map(|(uuid, session_start)| OnlineSessionEntry {
            uuid,
            session_start,
        })
        .collect();
    let count = players.len();
    Ok(Json(OnlineSessionsResponse { players, count }))
}

/// Number of players currently online across the cluster.
#[utoipa::path(
    get,
    path = "/game/players/online-count",
    tag = "game",
    responses((status = 200, body = OnlineCountResponse))
)]
pub async fn online_count(
    State(state): State<SharedGameState>,
) -> Result<Json<OnlineCountResponse>, AppError> {
    let count = game_service::online_count(&state).await?;
    Ok(Json(OnlineCountResponse { count }))
}

/// Aggregate playtime of a team.
#[utoipa::path(
    get,
    path = "/game/team/{team_id}/playtime",
    tag = "game",
    params(("team_id" = String, Path, description = "Team identifier")),
    responses((status = 200, body = TeamTotalResponse))
)]
pub async fn team_playtime(
    State(state): State<SharedGameState>,
    Path(team_id): Path<String>,
) -> Result<Json<TeamTotalResponse>, AppError> {
    if team_id.trim().is_empty() {
        return Err(AppError::BadInput("team id must not be empty".to_owned()));
    }
    let total_playtime = game_service::team_total(&state, &team_id).await?;
    Ok(Json(TeamTotalResponse {
        team_id,
        total_playtime,
    }))
}

/// Ban a player permanently (`duration_seconds = 0`) or for a number of
/// seconds; online players are forced offline first.
#[utoipa::path(
    post,
    path = "/game/admin/ban",
    tag = "admin",
    request_body = BanRequest,
    responses((status = 200, description = "Player banned", body = BanResponse))
)]
pub async fn ban(
    State(state): State<SharedGameState>,
    Json(payload): Json<BanRequest>,
) -> Result<Json<BanResponse>, AppError> {
    payload
        .validate()
        .map_err(|err| AppError::BadInput(err.to_string()))?;
    if payload.duration_seconds == -1 {
        return Err(AppError::BadInput(
            "use /game/admin/unban to lift a ban".to_owned(),
        ));
    }

    let is_permanent = payload.duration_seconds == 0;
    let expires_at =
        (!is_permanent).then(|| game_service::now_unix_secs() + payload.duration_seconds);

    game_service::ban_player(&state, &payload.uuid, expires_at, payload.reason).await?;

    let message = match expires_at {
        Some(expires_at) => format!("player {} banned until {expires_at}", payload.uuid),
        None => format!("player {} permanently banned", payload.uuid),
    };
    Ok(Json(BanResponse {
        message,
        uuid: payload.uuid,
        expires_at: expires_at.unwrap_or(0),
        is_permanent,
    }))
}

/// Lift a ban.
#[utoipa::path(
    post,
    path = "/game/admin/unban",
    tag = "admin",
    request_body = PlayerUuidRequest,
    responses((status = 200, description = "Player unbanned", body = PlayerAckResponse))
)]
pub async fn unban(
    State(state): State<SharedGameState>,
    Json(payload): Json<PlayerUuidRequest>,
) -> Result<Json<PlayerAckResponse>, AppError> {
    payload
        .validate()
        .map_err(|err| AppError::BadInput(err.to_string()))?;
    game_service::unban_player(&state, &payload.uuid).await?;
    Ok(Json(PlayerAckResponse {
        message: "player unbanned".to_owned(),
        uuid: payload.uuid,
    }))
}

/// Current ban record of a player.
#[utoipa::path(
    get,
    path = "/game/admin/ban-info/{uuid}",
    tag = "admin",
    params(("uuid" = Uuid, Path, description = "Player uuid")),
    responses(
        (status = 200, body = BanInfoResponse),
        (status = 404, description = "Player is not banned")
    )
)]
pub async fn ban_info(
    State(state): State<SharedGameState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<BanInfoResponse>, AppError> {
    let uuid = uuid.to_string();
    let info = game_service::ban_info(&state, &uuid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("player {uuid} is not banned")))?;
    Ok(Json(info.into()))
}

/// Every active ban across the cluster.
#[utoipa::path(
    get,
    path = "/game/admin/bans",
    tag = "admin",
    responses((status = 200, body = BanListResponse))
)]
pub async fn ban_list(
    State(state): State<SharedGameState>,
) -> Result<Json<BanListResponse>, AppError> {
    let bans: Vec<BanInfoResponse> = game_service::banned_players(&state)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let count = bans.len();
    Ok(Json(BanListResponse { bans, count }))
}
