//! Integration tests for the player service HTTP surface, driven against the
//! in-memory profile/team stores and a stub identity service.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
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
    clients::{ClientError, IdentityApi},
    dao::profile_store::{InMemoryProfileStore, InMemoryTeamStore, ProfileStore, TeamStore},
    routes,
    state::PlayerAppState,
};

const TEAMS: [&str; 2] = ["AQUA_CREEPERS", "PURPLE_AXOLOTLS"];

/// Identity double resolving uuids from a fixed table.
#[derive(Clone, Default)]
struct StubIdentityClient {
    usernames: Arc<Mutex<HashMap<String, String>>>,
}

impl StubIdentityClient {
    fn knowing(self, uuid: &str, username: &str) -> Self {
        self.usernames
            .lock()
            .unwrap()
            .insert(uuid.to_owned(), username.to_owned());
        self
    }
}

impl IdentityApi for StubIdentityClient {
    fn username_for(
        &self,
        uuid: &str,
    ) -> BoxFuture<'static, Result<Option<String>, ClientError>> {
        let usernames = self.usernames.clone();
        let uuid = uuid.to_owned();
        Box::pin(async move { Ok(usernames.lock().unwrap().get(&uuid).cloned()) })
    }
}

struct Harness {
    app: axum::Router,
    profiles: Arc<InMemoryProfileStore>,
    teams: Arc<InMemoryTeamStore>,
}

async fn harness(identity: StubIdentityClient) -> Harness {
    let profiles = Arc::new(InMemoryProfileStore::new());
    let teams = Arc::new(InMemoryTeamStore::new());
    teams
        .ensure_teams(TEAMS.iter().map(|team| team.to_string()).collect())
        .await
        .unwrap();

    let state = PlayerAppState::new(
        profiles.clone(),
        teams.clone(),
        Arc::new(identity),
        TEAMS.iter().map(|team| team.to_string()).collect(),
    );
    Harness {
        app: routes::player_router(state),
        profiles,
        teams,
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

fn test_uuid(n: u32) -> String {
    format!("00000000-0000-0000-0000-{n:012}")
}

#[tokio::test]
async fn create_profile_balances_teams_and_numbers_members() {
    let h = harness(StubIdentityClient::default()).await;

    let mut team_usernames = HashSet::new();
    for n in 1..=4 {
        let (status, body) = send(
            &h.app,
            "POST",
            "/profiles",
            Some(json!({"uuid": test_uuid(n)})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        team_usernames.insert(body["teamUsername"].as_str().unwrap().to_owned());
    }

    // Two per team, numbered sequentially within each team.
    assert_eq!(h.teams.player_count("AQUA_CREEPERS").await.unwrap(), 2);
    assert_eq!(h.teams.player_count("PURPLE_AXOLOTLS").await.unwrap(), 2);
    assert_eq!(
        team_usernames,
        HashSet::from([
            "Creeper1".to_owned(),
            "Creeper2".to_owned(),
            "Axolotl1".to_owned(),
            "Axolotl2".to_owned(),
        ])
    );
}

#[tokio::test]
async fn create_profile_rejects_duplicates_and_bad_uuids() {
    let h = harness(StubIdentityClient::default()).await;
    let uuid = test_uuid(1);

    let (status, _) = send(&h.app, "POST", "/profiles", Some(json!({"uuid": uuid}))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&h.app, "POST", "/profiles", Some(json!({"uuid": uuid}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&h.app, "POST", "/profiles", Some(json!({"uuid": "steve"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn created_profile_is_returned_with_neutral_counters() {
    let h = harness(StubIdentityClient::default()).await;
    let uuid = test_uuid(7);

    let (status, body) = send(&h.app, "POST", "/profiles", Some(json!({"uuid": uuid}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["uuid"], json!(uuid));
    assert_eq!(body["totalPlaytimeTicks"], json!(0.0));
    assert_eq!(body["deltaPlaytimeTicks"], json!(1.0));
    assert_eq!(body["banned"], json!(false));
    assert!(TEAMS.contains(&body["team"].as_str().unwrap()));

    let (status, body) = send(&h.app, "GET", &format!("/profiles/{uuid}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["uuid"], json!(uuid));
}

#[tokio::test]
async fn get_profile_misses_with_404() {
    let h = harness(StubIdentityClient::default()).await;

    let (status, _) = send(&h.app, "GET", &format!("/profiles/{}", test_uuid(9)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn username_is_enriched_asynchronously() {
    let uuid = test_uuid(3);
    let h = harness(StubIdentityClient::default().knowing(&uuid, "Herobrine")).await;

    let (status, body) = send(&h.app, "POST", "/profiles", Some(json!({"uuid": uuid}))).await;
    assert_eq!(status, StatusCode::CREATED);
    // The creation response never waits for the identity lookup.
    assert_eq!(body["username"], json!(""));

    let mut enriched = String::new();
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if let Some(profile) = h.profiles.get(&uuid).await.unwrap() {
            if !profile.username.is_empty() {
                enriched = profile.username;
                break;
            }
        }
    }
    assert_eq!(enriched, "Herobrine");
}

#[tokio::test]
async fn playtime_updates_hit_only_existing_profiles() {
    let h = harness(StubIdentityClient::default()).await;
    let uuid = test_uuid(4);
    send(&h.app, "POST", "/profiles", Some(json!({"uuid": uuid}))).await;

    let (status, _) = send(
        &h.app,
        "PUT",
        &format!("/profiles/{uuid}/playtime"),
        Some(json!({"ticksToSet": 123.5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&h.app, "GET", &format!("/profiles/{uuid}"), None).await;
    assert_eq!(body["totalPlaytimeTicks"], json!(123.5));

    let (status, _) = send(
        &h.app,
        "PUT",
        &format!("/profiles/{}/playtime", test_uuid(99)),
        Some(json!({"ticksToSet": 1.0})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &h.app,
        "PUT",
        &format!("/profiles/{uuid}/deltaplaytime"),
        Some(json!({"ticksToSet": 2.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ban_status_updates_validate_timestamps() {
    let h = harness(StubIdentityClient::default()).await;
    let uuid = test_uuid(5);
    send(&h.app, "POST", "/profiles", Some(json!({"uuid": uuid}))).await;

    let (status, _) = send(
        &h.app,
        "PUT",
        &format!("/profiles/{uuid}/ban"),
        Some(json!({"banned": true, "banExpiresAt": "2026-09-01T12:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&h.app, "GET", &format!("/profiles/{uuid}"), None).await;
    assert_eq!(body["banned"], json!(true));

    let (status, _) = send(
        &h.app,
        "PUT",
        &format!("/profiles/{uuid}/ban"),
        Some(json!({"banned": true, "banExpiresAt": "next tuesday"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &h.app,
        "PUT",
        &format!("/profiles/{uuid}/lastlogin"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn sync_team_totals_aggregates_and_is_idempotent() {
    let h = harness(StubIdentityClient::default()).await;

    // Four profiles, then pin their totals directly in the store.
    let mut by_team: HashMap<String, Vec<String>> = HashMap::new();
    for n in 1..=4 {
        let uuid = test_uuid(n);
        let (_, body) = send(&h.app, "POST", "/profiles", Some(json!({"uuid": uuid}))).await;
        by_team
            .entry(body["team"].as_str().unwrap().to_owned())
            .or_default()
            .push(uuid);
    }
    let mut expected: HashMap<String, f64> = HashMap::new();
    let mut ticks = 10.0;
    for (team, members) in &by_team {
        for uuid in members {
            h.profiles.set_playtime(uuid, ticks).await.unwrap();
            *expected.entry(team.clone()).or_insert(0.0) += ticks;
            ticks += 10.0;
        }
    }

    let (status, first) = send(&h.app, "POST", "/teams/sync-totals", None).await;
    assert_eq!(status, StatusCode::OK);
    for (team, total) in &expected {
        assert_eq!(first["teamTotals"][team], json!(total));
    }

    let team_docs_after_first: HashMap<String, f64> = h
        .teams
        .all_teams()
        .await
        .unwrap()
        .into_iter()
        .map(|team| (team.name, team.total_playtime))
        .collect();

    // Second run with no profile changes: identical response, unchanged docs.
    let (status, second) = send(&h.app, "POST", "/teams/sync-totals", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["teamTotals"], second["teamTotals"]);

    for team in h.teams.all_teams().await.unwrap() {
        assert_eq!(team.total_playtime, team_docs_after_first[&team.name]);
    }
}

#[tokio::test]
async fn healthcheck_reports_ok() {
    let h = harness(StubIdentityClient::default()).await;

    let (status, body) = send(&h.app, "GET", "/healthcheck", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}
