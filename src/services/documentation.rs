use utoipa::OpenApi;

use crate::dto::{common, game, health, player};

/// OpenAPI document of the game service.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::game::online,
        crate::routes::game::offline,
        crate::routes::game::refresh_online,
        crate::routes::game::playtime,
        crate::routes::game::deltatime,
        crate::routes::game::is_online,
        crate::routes::game::session_duration,
        crate::routes::game::online_count,
        crate::routes::game::online_sessions,
        crate::routes::game::team_playtime,
        crate::routes::game::ban,
        crate::routes::game::unban,
        crate::routes::game::ban_info,
        crate::routes::game::ban_list,
        crate::routes::health::game_healthcheck,
    ),
    components(schemas(
        game::PlayerUuidRequest,
        game::BanRequest,
        game::PlayerAckResponse,
        game::PlaytimeResponse,
        game::DeltaPlaytimeResponse,
        game::OnlineStatusResponse,
        game::TeamTotalResponse,
        game::OnlineCountResponse,
        game::OnlineSessionEntry,
        game::OnlineSessionsResponse,
        game::SessionDurationResponse,
        game::BanResponse,
        game::BanInfoResponse,
        game::BanListResponse,
        health::HealthResponse,
    ))
)]
pub struct GameApiDoc;

/// OpenAPI document of the player service.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::player::create_profile,
        crate::routes::player::get_profile,
        crate::routes::player::update_playtime,
        crate::routes::player::update_delta_playtime,
        crate::routes::player::update_ban_status,
        crate::routes::player::update_last_login,
        crate::routes::player::sync_team_totals,
        crate::routes::health::player_healthcheck,
    ),
    components(schemas(
        player::CreateProfileRequest,
        player::ProfileDto,
        player::UpdatePlaytimeRequest,
        player::UpdateBanStatusRequest,
        player::SyncTeamTotalsResponse,
        common::MessageResponse,
        health::HealthResponse,
    ))
)]
pub struct PlayerApiDoc;
