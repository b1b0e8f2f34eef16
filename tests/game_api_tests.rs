//! Integration tests for the game service HTTP surface, driven against the
//! in-memory session store and a stub Player service client.

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use futures::future::BoxFuture;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use creature_clash_back::{
    clients::{ClientError, PlayerApi},
    cluster::AssignmentManager,
    dao::session_store::{InMemorySessionStore, SessionStore},
    dto::player::{ProfileDto, SyncTeamTotalsResponse},
    routes,
    services::{syncer::Syncer, updater::Updater},
    state::GameAppState,
};

const UUID: &str = "00000000-0000-0000-0000-000000000001";
const TEAM: &str = "AQUA_CREEPERS";
const ONLINE_TTL: Duration = Duration::from_secs(15);

#[derive(Default)]
struct StubInner {
    profiles: Mutex<HashMap<String, ProfileDto>>,
    persisted: Mutex<HashMap<String, f64>>,
    team_totals: Mutex<HashMap<String, f64>>,
    fail_fetch: AtomicBool,
}

/// Player service double recording persisted playtimes.
#[derive(Clone, Default)]
struct StubPlayerClient(Arc<StubInner>);

impl StubPlayerClient {
    fn with_profile(self, profile: ProfileDto) -> Self {
        self.0
            .profiles
            .lock()
            .unwrap()
            .insert(profile.uuid.clone(), profile);
        self
    }

    fn with_team_total(self, team: &str, total: f64) -> Self {
        self.0
            .team_totals
            .lock()
            .unwrap()
            .insert(team.to_owned(), total);
        self
    }

    fn persisted(&self, uuid: &str) -> Option<f64> {
        self.0.persisted.lock().unwrap().get(uuid).copied()
    }
}

impl PlayerApi for StubPlayerClient {
    fn get_profile(
        &self,
        uuid: &str,
    ) -> BoxFuture<'static, Result<Option<ProfileDto>, ClientError>> {
        let inner = self.0.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move {
            if inner.fail_fetch.load(Ordering::Relaxed) {
                return Err(ClientError::Status {
                    url: "stub://player-service".to_owned(),
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                });
            }
            Ok(inner.profiles.lock().unwrap().get(&uuid).cloned())
        })
    }

    fn update_playtime(
        &self,
        uuid: &str,
        ticks: f64,
    ) -> BoxFuture<'static, Result<(), ClientError>> {
        let inner = self.0.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move {
            inner.persisted.lock().unwrap().insert(uuid, ticks);
            Ok(())
        })
    }

    fn sync_team_totals(
        &self,
    ) -> BoxFuture<'static, Result<SyncTeamTotalsResponse, ClientError>> {
        let inner = self.0.clone();
        Box::pin(async move {
            Ok(SyncTeamTotalsResponse {
                team_totals: inner.team_totals.lock().unwrap().clone(),
                message: "aggregated".to_owned(),
            })
        })
    }
}

fn profile(uuid: &str, team: &str, total: f64) -> ProfileDto {
    ProfileDto {
        uuid: uuid.to_owned(),
        username: "Steve".to_owned(),
        team: Some(team.to_owned()),
        team_username: "Creeper1".to_owned(),
        total_playtime_ticks: total,
        delta_playtime_ticks: 1.0,
        banned: false,
        ban_expires_at: None,
        created_at: "2026-01-01T00:00:00Z".to_owned(),
        last_login_at: "2026-01-01T00:00:00Z".to_owned(),
    }
}

struct Harness {
    app: axum::Router,
    session: Arc<InMemorySessionStore>,
    players: StubPlayerClient,
}

fn harness(players: StubPlayerClient) -> Harness {
    let session = Arc::new(InMemorySessionStore::new(ONLINE_TTL));
    let state = GameAppState::new(session.clone(), Arc::new(players.clone()));
    Harness {
        app: routes::game_router(state),
        session,
        players,
    }
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().uri(uri).method(method);
    let request = match body {
        Some(json_body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&bytes).unwrap_or(json!({}))
    };
    (status, value)
}

#[tokio::test]
async fn online_seeds_session_from_profile() {
    let h = harness(StubPlayerClient::default().with_profile(profile(UUID, TEAM, 10.0)));

    let (status, _) = send(&h.app, "POST", "/game/player/online", Some(json!({"uuid": UUID}))).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(h.session.get_player_total(UUID).await.unwrap(), Some(10.0));
    assert_eq!(h.session.get_player_delta(UUID).await.unwrap(), Some(1.0));
    assert_eq!(
        h.session.get_player_team(UUID).await.unwrap(),
        Some(TEAM.to_owned())
    );
    assert!(h.session.is_online(UUID).await.unwrap());
}

#[tokio::test]
async fn online_degrades_to_defaults_when_profile_service_fails() {
    let h = harness(StubPlayerClient::default());
    h.players.0.fail_fetch.store(true, Ordering::Relaxed);

    let (status, _) = send(&h.app, "POST", "/game/player/online", Some(json!({"uuid": UUID}))).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(h.session.get_player_total(UUID).await.unwrap(), Some(0.0));
    assert_eq!(h.session.get_player_delta(UUID).await.unwrap(), Some(1.0));
    assert_eq!(h.session.get_player_team(UUID).await.unwrap(), None);
}

#[tokio::test]
async fn single_session_accrual_and_offline_persistence() {
    let h = harness(StubPlayerClient::default().with_profile(profile(UUID, TEAM, 10.0)));
    let (status, _) = send(&h.app, "POST", "/game/player/online", Some(json!({"uuid": UUID}))).await;
    assert_eq!(status, StatusCode::OK);

    let assignment = Arc::new(AssignmentManager::new("instance-a"));
    let updater = Updater::new(h.session.clone(), assignment, Duration::from_millis(50));

    // One hundred ticks; the game mesh re-arms the delta between ticks.
    for _ in 0..100 {
        updater.tick().await;
        h.session.set_player_delta(UUID, 1.0).await.unwrap();
    }

    assert_eq!(h.session.get_player_total(UUID).await.unwrap(), Some(110.0));
    assert_eq!(
        h.session.get_team_total(TEAM).await.unwrap(),
        Some(100.0)
    );

    let (status, _) = send(&h.app, "POST", "/game/player/offline", Some(json!({"uuid": UUID}))).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(h.players.persisted(UUID), Some(110.0));
    assert!(!h.session.is_online(UUID).await.unwrap());
    assert_eq!(h.session.get_player_total(UUID).await.unwrap(), None);
    assert_eq!(h.session.get_player_delta(UUID).await.unwrap(), None);
    assert_eq!(h.session.get_player_team(UUID).await.unwrap(), None);
}

#[tokio::test]
async fn updater_skips_players_owned_by_peers() {
    let h = harness(StubPlayerClient::default().with_profile(profile(UUID, TEAM, 0.0)));
    send(&h.app, "POST", "/game/player/online", Some(json!({"uuid": UUID}))).await;

    let assignment = Arc::new(AssignmentManager::new("instance-a"));
    // All peers gone from the registry: the ring is empty, nothing is owned.
    assignment.refresh(Vec::new());
    let updater = Updater::new(h.session.clone(), assignment, Duration::from_millis(50));

    updater.tick().await;
    assert_eq!(h.session.get_player_total(UUID).await.unwrap(), Some(0.0));
    assert_eq!(h.session.get_player_delta(UUID).await.unwrap(), Some(1.0));
}

#[tokio::test]
async fn offline_for_an_already_offline_player_is_a_noop() {
    let h = harness(StubPlayerClient::default());

    let (status, _) = send(&h.app, "POST", "/game/player/offline", Some(json!({"uuid": UUID}))).await;
    assert_eq!(status, StatusCode::OK);
    // No spurious zero is pushed over the durable profile.
    assert_eq!(h.players.persisted(UUID), None);
}

#[tokio::test]
async fn refresh_online_always_succeeds() {
    let h = harness(StubPlayerClient::default());

    let (status, _) = send(
        &h.app,
        "POST",
        "/game/player/refresh-online",
        Some(json!({"uuid": UUID})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn delta_defaults_to_one_without_a_session() {
    let h = harness(StubPlayerClient::default());

    let (status, body) = send(&h.app, "GET", &format!("/game/player/{UUID}/deltatime"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deltatime"], json!(1.0));
}

#[tokio::test]
async fn playtime_reads_zero_for_unknown_players() {
    let h = harness(StubPlayerClient::default());

    let (status, body) = send(&h.app, "GET", &format!("/game/player/{UUID}/playtime"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["playtime"], json!(0.0));
}

#[tokio::test]
async fn permanent_ban_blocks_online_and_forces_offline() {
    let h = harness(StubPlayerClient::default().with_profile(profile(UUID, TEAM, 10.0)));
    send(&h.app, "POST", "/game/player/online", Some(json!({"uuid": UUID}))).await;

    let (status, body) = send(
        &h.app,
        "POST",
        "/game/admin/ban",
        Some(json!({"uuid": UUID, "duration_seconds": 0, "reason": "cheating"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_permanent"], json!(true));
    assert_eq!(body["expires_at"], json!(0));

    // Ban-while-online persisted the playtime and cleared the session.
    assert_eq!(h.players.persisted(UUID), Some(10.0));
    assert!(!h.session.is_online(UUID).await.unwrap());

    let (status, _) = send(&h.app, "POST", "/game/player/online", Some(json!({"uuid": UUID}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&h.app, "GET", &format!("/game/admin/ban-info/{UUID}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_permanent"], json!(true));
    assert_eq!(body["reason"], json!("cheating"));
}

#[tokio::test]
async fn temporary_ban_expires_on_its_own() {
    let h = harness(StubPlayerClient::default());

    let (status, body) = send(
        &h.app,
        "POST",
        "/game/admin/ban",
        Some(json!({"uuid": UUID, "duration_seconds": 1, "reason": "spam"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_permanent"], json!(false));

    let (status, _) = send(&h.app, "POST", "/game/player/online", Some(json!({"uuid": UUID}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    tokio::time::sleep(Duration::from_millis(1_300)).await;

    let (status, _) = send(&h.app, "POST", "/game/player/online", Some(json!({"uuid": UUID}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&h.app, "GET", &format!("/game/admin/ban-info/{UUID}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unban_restores_access() {
    let h = harness(StubPlayerClient::default());

    send(
        &h.app,
        "POST",
        "/game/admin/ban",
        Some(json!({"uuid": UUID, "duration_seconds": 0})),
    )
    .await;
    let (status, _) = send(&h.app, "POST", "/game/player/online", Some(json!({"uuid": UUID}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&h.app, "POST", "/game/admin/unban", Some(json!({"uuid": UUID}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&h.app, "POST", "/game/player/online", Some(json!({"uuid": UUID}))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ban_rejects_unban_sentinel_and_bad_input() {
    let h = harness(StubPlayerClient::default());

    let (status, _) = send(
        &h.app,
        "POST",
        "/game/admin/ban",
        Some(json!({"uuid": UUID, "duration_seconds": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &h.app,
        "POST",
        "/game/admin/ban",
        Some(json!({"uuid": "not-a-uuid", "duration_seconds": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &h.app,
        "POST",
        "/game/player/online",
        Some(json!({"uuid": "not-a-uuid"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn online_count_tracks_marked_players() {
    let h = harness(StubPlayerClient::default());
    let other = "00000000-0000-0000-0000-000000000002";

    send(&h.app, "POST", "/game/player/online", Some(json!({"uuid": UUID}))).await;
    send(&h.app, "POST", "/game/player/online", Some(json!({"uuid": other}))).await;

    let (status, body) = send(&h.app, "GET", "/game/players/online-count", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(2));

    let (status, body) = send(&h.app, "GET", &format!("/game/player/{UUID}/is-online"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isOnline"], json!(true));
}

#[tokio::test]
async fn online_listing_and_session_duration() {
    let h = harness(StubPlayerClient::default());

    send(&h.app, "POST", "/game/player/online", Some(json!({"uuid": UUID}))).await;

    let (status, body) = send(&h.app, "GET", "/game/players/online", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["players"][0]["uuid"], json!(UUID));
    assert!(body["players"][0]["sessionStart"].as_i64().unwrap() > 0);

    let (status, body) = send(
        &h.app,
        "GET",
        &format!("/game/player/{UUID}/session-duration"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["durationSeconds"].as_i64().unwrap() >= 0);

    // Offline players have no session to measure.
    let other = "00000000-0000-0000-0000-000000000002";
    let (status, _) = send(
        &h.app,
        "GET",
        &format!("/game/player/{other}/session-duration"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ban_list_reports_active_bans_only() {
    let h = harness(StubPlayerClient::default());
    let other = "00000000-0000-0000-0000-000000000002";

    send(
        &h.app,
        "POST",
        "/game/admin/ban",
        Some(json!({"uuid": UUID, "duration_seconds": 0, "reason": "cheating"})),
    )
    .await;
    send(
        &h.app,
        "POST",
        "/game/admin/ban",
        Some(json!({"uuid": other, "duration_seconds": 3600, "reason": "spam"})),
    )
    .await;

    let (status, body) = send(&h.app, "GET", "/game/admin/bans", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(2));

    send(&h.app, "POST", "/game/admin/unban", Some(json!({"uuid": other}))).await;

    let (status, body) = send(&h.app, "GET", "/game/admin/bans", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["bans"][0]["uuid"], json!(UUID));
    assert_eq!(body["bans"][0]["is_permanent"], json!(true));
}

#[tokio::test]
async fn syncer_leader_persists_totals_and_reconciles_teams() {
    let h = harness(
        StubPlayerClient::default()
            .with_profile(profile(UUID, TEAM, 0.0))
            .with_team_total(TEAM, 42.0),
    );

    h.session.set_player_total(UUID, 77.0).await.unwrap();
    h.session.set_team_total(TEAM, 5.0).await.unwrap();

    // Single instance: owner of the sentinel key by construction.
    let assignment = Arc::new(AssignmentManager::new("instance-a"));
    let syncer = Syncer::new(
        h.session.clone(),
        Arc::new(h.players.clone()),
        assignment,
        Duration::from_secs(30),
        Duration::from_secs(60),
        Duration::from_secs(30),
    );

    syncer.cycle().await;

    assert_eq!(h.players.persisted(UUID), Some(77.0));
    // Authoritative team total overwrote the cached value.
    assert_eq!(h.session.get_team_total(TEAM).await.unwrap(), Some(42.0));
}

#[tokio::test]
async fn syncer_follower_does_nothing() {
    let h = harness(
        StubPlayerClient::default()
            .with_profile(profile(UUID, TEAM, 0.0))
            .with_team_total(TEAM, 42.0),
    );
    h.session.set_player_total(UUID, 77.0).await.unwrap();

    let assignment = Arc::new(AssignmentManager::new("instance-a"));
    assignment.refresh(Vec::new());
    let syncer = Syncer::new(
        h.session.clone(),
        Arc::new(h.players.clone()),
        assignment,
        Duration::from_secs(30),
        Duration::from_secs(60),
        Duration::from_secs(30),
    );

    syncer.cycle().await;

    assert_eq!(h.players.persisted(UUID), None);
    assert_eq!(h.session.get_team_total(TEAM).await.unwrap(), None);
}

#[tokio::test]
async fn healthcheck_reports_ok_with_a_live_store() {
    let h = harness(StubPlayerClient::default());

    let (status, body) = send(&h.app, "GET", "/healthcheck", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}
