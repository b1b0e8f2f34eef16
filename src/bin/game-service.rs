//! Game service binary wiring the session store, registry, partitioning and
//! background accumulation/sync loops behind the HTTP surface.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use redis::cluster::ClusterClientBuilder;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use creature_clash_back::{
    GAME_SERVICE_TYPE,
    clients::{HttpPlayerClient, PlayerApi},
    cluster::AssignmentManager,
    config::GameServiceConfig,
    dao::session_store::{RedisSessionStore, SessionStore},
    registry::{Registrar, RegistryClient},
    routes,
    services::{syncer::Syncer, updater::Updater},
    state::GameAppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = GameServiceConfig::load().context("loading game service configuration")?;
    info!(listen_addr = %config.listen_addr, "game service configuration loaded");

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

    let session: Arc<dyn SessionStore> = Arc::new(RedisSessionStore::new(
        conn.clone(),
        config.online_ttl,
        config.common.redis_password.clone(),
    ));
    let players: Arc<dyn PlayerApi> =
        Arc::new(HttpPlayerClient::new(config.player_service_url.clone()));

    let cancel = CancellationToken::new();

    let registrar = Arc::new(Registrar::new(
        conn.clone(),
        GAME_SERVICE_TYPE,
        config.common.clone(),
    ));
    let assignment = Arc::new(AssignmentManager::new(registrar.instance_id()));
    let registry = RegistryClient::new(conn, config.common.heartbeat_ttl);

    let registrar_task = tokio::spawn({
        let registrar = registrar.clone();
        let cancel = cancel.clone();
        async move { registrar.run(cancel).await }
    });

    tokio::spawn({
        let assignment = assignment.clone();
        let cancel = cancel.clone();
        let update_interval = config.common.heartbeat_interval;
        async move {
            assignment
                .run(registry, GAME_SERVICE_TYPE, update_interval, cancel)
                .await;
        }
    });

    let updater = Updater::new(session.clone(), assignment.clone(), config.tick_interval);
    tokio::spawn({
        let cancel = cancel.clone();
        async move { updater.run(cancel).await }
    });

    let syncer = Syncer::new(
        session.clone(),
        players.clone(),
        assignment,
        config.persistence_interval,
        config.backup_timeout,
        config.sync_timeout,
    );
    tokio::spawn({
        let cancel = cancel.clone();
        async move { syncer.run(cancel).await }
    });

    let state = GameAppState::new(session, players);
    let app = routes::game_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.service_port));
    let listener = TcpListener::bind(addr)
        .await
        .context("binding game service listener")?;
    info!(%addr, "game service listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving game api")?;

    // Stop the background loops and give the registrar a moment to
    // deregister before the process exits.
    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), registrar_task).await;

    info!("game service stopped");
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
