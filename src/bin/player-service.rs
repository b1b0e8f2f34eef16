//! Player service binary wiring the durable profile stores, the identity
//! enrichment worker and the registry heartbeat behind the HTTP surface.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use redis::cluster::ClusterClientBuilder;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use creature_clash_back::{
    PLAYER_SERVICE_TYPE,
    clients::{HttpIdentityClient, IdentityApi},
    config::PlayerServiceConfig,
    dao::profile_store::{
        MongoProfileStore, MongoTeamStore, ProfileStore, TeamStore, mongodb,
    },
    registry::Registrar,
    routes,
    services::enrichment::EnrichmentWorker,
    state::PlayerAppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = PlayerServiceConfig::load().context("loading player service configuration")?;
    info!(listen_addr = %config.listen_addr, "player service configuration loaded");

    let database = mongodb::connect(&config.mongo_uri, &config.mongo_database)
        .await
        .context("connecting to MongoDB")?;
    info!(database = %config.mongo_database, "connected to MongoDB");

    let profiles: Arc<dyn ProfileStore> = Arc::new(MongoProfileStore::new(
        database.clone(),
        &config.players_collection,
    ));
    let teams: Arc<dyn TeamStore> =
        Arc::new(MongoTeamStore::new(&database, &config.teams_collection));

    teams
        .ensure_teams(config.default_teams.clone())
        .await
        .context("initializing default teams")?;

    let identity: Arc<dyn IdentityApi> =
        Arc::new(HttpIdentityClient::new(config.identity_base_url.clone()));

    let mut builder = ClusterClientBuilder::new(config.common.redis_addrs.clone());
    if let Some(password) = &config.common.redis_password {
        builder = builder.password(password.clone());
    }
    let cluster_client = builder.build().context("building redis cluster client")?;
    let conn = cluster_client
        .get_async_connection()
        .await
        .context("connecting to the redis cluster")?;
    info!("connected to the redis cluster");

    let cancel = CancellationToken::new();

    let registrar = Arc::new(Registrar::new(conn, PLAYER_SERVICE_TYPE, config.common.clone()));
    let registrar_task = tokio::spawn({
        let registrar = registrar.clone();
        let cancel = cancel.clone();
        async move { registrar.run(cancel).await }
    });

    let enrichment = EnrichmentWorker::new(
        profiles.clone(),
        identity.clone(),
        config.username_filler_interval,
    );
    tokio::spawn({
        let cancel = cancel.clone();
        async move { enrichment.run(cancel).await }
    });

    let state = PlayerAppState::new(profiles, teams, identity, config.default_teams.clone());
    let app = routes::player_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.service_port));
    let listener = TcpListener::bind(addr)
        .await
        .context("binding player service listener")?;
    info!(%addr, "player service listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving player api")?;

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), registrar_task).await;

    info!("player service stopped");
    Ok(())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
