//! Environment-driven configuration for the game and player services.

use std::{env, time::Duration};

use thiserror::Error;
use tracing::warn;

/// Environment variable that lists the Redis cluster seed addresses.
const REDIS_ADDRS_ENV: &str = "REDIS_ADDRS";
/// Default seed address used inside the cluster namespace.
const DEFAULT_REDIS_ADDR: &str = "redis-cluster-headless.creature-clash.svc.cluster.local:6379";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid duration `{value}` for {var} (expected e.g. `50ms`, `5s`, `1m`)")]
    InvalidDuration { var: &'static str, value: String },
    #[error("cannot extract port from listen address `{addr}`")]
    InvalidListenAddr { addr: String },
}

#[derive(Debug, Clone)]
/// Settings shared by every service instance regardless of its role.
pub struct CommonConfig {
    pub redis_addrs: Vec<String>,
    pub redis_password: Option<String>,
    /// Cadence of registry heartbeats.
    pub heartbeat_interval: Duration,
    /// Age after which a registry entry is considered dead.
    pub heartbeat_ttl: Duration,
    /// Cadence of the stale-entry cleanup pass; zero disables it.
    pub registry_cleanup_interval: Duration,
    /// Host advertised in the registry (the orchestrator injects `POD_IP`).
    pub advertised_host: String,
    /// Port advertised in the registry, derived from the listen address.
    pub service_port: u16,
}

impl CommonConfig {
    fn load() -> Result<Self, ConfigError> {
        let redis_addrs = match env::var(REDIS_ADDRS_ENV) {
            Ok(raw) if !raw.trim().is_empty() => raw
                .split(',')
                .map(|addr| addr.trim().to_owned())
                .filter(|addr| !addr.is_empty())
                .collect(),
            _ => vec![DEFAULT_REDIS_ADDR.to_owned()],
        };

        let redis_password = env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty());

        let advertised_host = match env::var("POD_IP") {
            Ok(ip) if !ip.is_empty() => ip,
            _ => {
                warn!("POD_IP not set; advertising 0.0.0.0");
                "0.0.0.0".to_owned()
            }
        };

        Ok(Self {
            redis_addrs,
            redis_password,
            heartbeat_interval: env_duration("SERVICE_HEARTBEAT_INTERVAL", Duration::from_secs(5))?,
            heartbeat_ttl: env_duration("SERVICE_HEARTBEAT_TTL", Duration::from_secs(15))?,
            registry_cleanup_interval: env_duration(
                "SERVICE_REGISTRY_CLEANUP_INTERVAL",
                Duration::from_secs(30),
            )?,
            advertised_host,
            // Filled in once the role-specific listen address is known.
            service_port: 0,
        })
    }
}

#[derive(Debug, Clone)]
/// Configuration for the game service binary.
pub struct GameServiceConfig {
    pub common: CommonConfig,
    pub listen_addr: String,
    /// TTL of `online:{uuid}:` keys; heartbeats must arrive faster than this.
    pub online_ttl: Duration,
    pub tick_interval: Duration,
    pub persistence_interval: Duration,
    pub backup_timeout: Duration,
    pub sync_timeout: Duration,
    pub player_service_url: String,
}

impl GameServiceConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut common = CommonConfig::load()?;

        let listen_addr =
            env::var("GAME_SERVICE_LISTEN_ADDR").unwrap_or_else(|_| ":8082".to_owned());
        common.service_port = extract_port(&listen_addr)?;

        let player_service_url = env::var("PLAYERS_SERVICE_URL")
            .unwrap_or_else(|_| "http://player-service:8081".to_owned());

        Ok(Self {
            common,
            listen_addr,
            online_ttl: env_duration("REDIS_ONLINE_TTL", Duration::from_secs(15))?,
            tick_interval: env_duration("GAME_SERVICE_TICK_INTERVAL", Duration::from_millis(50))?,
            persistence_interval: env_duration(
                "GAME_SERVICE_PERSISTENCE_INTERVAL",
                Duration::from_secs(30),
            )?,
            backup_timeout: env_duration("GAME_BACKUP_TIMEOUT", Duration::from_secs(60))?,
            sync_timeout: env_duration("GAME_SYNC_TIMEOUT", Duration::from_secs(30))?,
            player_service_url,
        })
    }
}

#[derive(Debug, Clone)]
/// Configuration for the player service binary.
pub struct PlayerServiceConfig {
    pub common: CommonConfig,
    pub listen_addr: String,
    pub mongo_uri: String,
    pub mongo_database: String,
    pub players_collection: String,
    pub teams_collection: String,
    pub username_filler_interval: Duration,
    pub default_teams: Vec<String>,
    pub identity_base_url: String,
}

impl PlayerServiceConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut common = CommonConfig::load()?;

        let listen_addr =
            env::var("PLAYER_SERVICE_LISTEN_ADDR").unwrap_or_else(|_| ":8081".to_owned());
        common.service_port = extract_port(&listen_addr)?;

        let default_teams = match env::var("DEFAULT_TEAMS") {
            Ok(raw) if !raw.trim().is_empty() => raw
                .split(',')
                .map(|team| team.trim().to_owned())
                .filter(|team| !team.is_empty())
                .collect(),
            _ => vec!["AQUA_CREEPERS".to_owned(), "PURPLE_AXOLOTLS".to_owned()],
        };

        Ok(Self {
            common,
            listen_addr,
            mongo_uri: env::var("MONGODB_CONN_STR")
                .unwrap_or_else(|_| "mongodb://mongodb-service:27017".to_owned()),
            mongo_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "creature_clash".to_owned()),
            players_collection: env::var("MONGODB_PLAYERS_COLLECTION")
                .unwrap_or_else(|_| "players".to_owned()),
            teams_collection: env::var("MONGODB_TEAM_COLLECTION")
                .unwrap_or_else(|_| "teams".to_owned()),
            username_filler_interval: env_duration(
                "USERNAME_FILLER_INTERVAL",
                Duration::from_secs(30),
            )?,
            default_teams,
            identity_base_url: env::var("IDENTITY_SERVICE_URL").unwrap_or_else(|_| {
                "https://sessionserver.mojang.com/session/minecraft/profile".to_owned()
            }),
        })
    }
}

/// Read a duration from the environment, falling back to `default` when unset.
fn env_duration(var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => {
            parse_duration(raw.trim()).ok_or(ConfigError::InvalidDuration { var, value: raw })
        }
        _ => Ok(default),
    }
}

/// Parse durations of the form `<integer><unit>` with unit `ms`, `s`, `m` or `h`.
fn parse_duration(value: &str) -> Option<Duration> {
    let split = value.find(|c: char| !c.is_ascii_digit())?;
    let (digits, unit) = value.split_at(split);
    let amount: u64 = digits.parse().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(amount)),
        "s" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_secs(amount * 60)),
        "h" => Some(Duration::from_secs(amount * 3600)),
        _ => None,
    }
}

/// Extract the numeric port from a listen address such as `:8082` or `0.0.0.0:8082`.
fn extract_port(addr: &str) -> Result<u16, ConfigError> {
    addr.rsplit(':')
        .next()
        .and_then(|port| port.parse().ok())
        .ok_or_else(|| ConfigError::InvalidListenAddr {
            addr: addr.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_suffixed_durations() {
        assert_eq!(parse_duration("50ms"), Some(Duration::from_millis(50)));
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("5"), None);
        assert_eq!(parse_duration("s"), None);
        assert_eq!(parse_duration("5d"), None);
        assert_eq!(parse_duration("-5s"), None);
    }

    #[test]
    fn extracts_ports_from_listen_addrs() {
        assert_eq!(extract_port(":8082").unwrap(), 8082);
        assert_eq!(extract_port("0.0.0.0:8081").unwrap(), 8081);
        assert!(extract_port("no-port").is_err());
    }
}
