//! Emberhold server entry point.
//!
//! Settings come from the environment:
//!
//! | Variable               | Default            |
//! |------------------------|--------------------|
//! | `EMBERHOLD_BIND`       | `127.0.0.1:4000`   |
//! | `EMBERHOLD_TRANSPORT`  | `telnet`           |
//! | `EMBERHOLD_DATA`       | `emberhold-data`   |
//! | `EMBERHOLD_SEED`       | built-in seed      |
//! | `EMBERHOLD_CONFIG`     | built-in defaults  |
//! | `EMBERHOLD_USERS`      | `guest:guest`      |
//! | `EMBERHOLD_TICK_MS`    | `1000`             |
//! | `EMBERHOLD_AUTOSAVE_SECS` | `300`           |
//!
//! `EMBERHOLD_DATA` is the directory of the on-disk record store.
//! `EMBERHOLD_SEED` and `EMBERHOLD_CONFIG` are paths to JSON files.
//! `EMBERHOLD_USERS` is a comma-separated list of `name:password` pairs.
//! The tick and autosave variables override whatever the config file says.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use emberhold::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const BUILTIN_SEED: &str = include_str!("../data/seed.json");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emberhold=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let bind = std::env::var("EMBERHOLD_BIND").unwrap_or_else(|_| "127.0.0.1:4000".into());
    let transport = std::env::var("EMBERHOLD_TRANSPORT").unwrap_or_else(|_| "telnet".into());
    let seed = load_seed(std::env::var("EMBERHOLD_SEED").ok().as_deref())?;
    let mut config = load_config(std::env::var("EMBERHOLD_CONFIG").ok().as_deref())?;
    if let Some(ms) = env_number("EMBERHOLD_TICK_MS")? {
        config.tick.period = Duration::from_millis(ms);
    }
    if let Some(secs) = env_number("EMBERHOLD_AUTOSAVE_SECS")? {
        config.autosave_interval = Duration::from_secs(secs);
    }
    let data = std::env::var("EMBERHOLD_DATA").unwrap_or_else(|_| "emberhold-data".into());
    let store = Arc::new(
        SledStore::open(&data).with_context(|| format!("opening record store at {data}"))?,
    );
    let auth = parse_users(&std::env::var("EMBERHOLD_USERS").unwrap_or_else(|_| "guest:guest".into()))?;

    tracing::info!(
        %bind,
        %transport,
        %data,
        rooms = seed.rooms.len(),
        tick_ms = config.tick.period.as_millis() as u64,
        "Starting Emberhold"
    );

    let shutdown = CancellationToken::new();
    setup_shutdown_signal(shutdown.clone());

    let builder = EmberholdServerBuilder::new().bind(&bind).config(config).seed(seed);
    match transport.as_str() {
        "telnet" => {
            let server = builder.build_telnet(auth, Arc::clone(&store)).await?;
            server.run(shutdown).await?;
        }
        "websocket" | "ws" => {
            let server = builder.build_websocket(auth, Arc::clone(&store)).await?;
            server.run(shutdown).await?;
        }
        other => bail!("unknown transport {other:?}; expected telnet or websocket"),
    }
    store.flush().await.context("flushing record store")?;

    tracing::info!("Emberhold stopped");
    Ok(())
}

/// Cancels `token` on Ctrl+C or SIGTERM.
fn setup_shutdown_signal(token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
            _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
        }
        token.cancel();
    });
}

fn load_seed(path: Option<&str>) -> Result<SeedData> {
    match path {
        Some(path) => {
            let raw = read(path)?;
            serde_json::from_str(&raw).with_context(|| format!("parsing seed {path}"))
        }
        None => serde_json::from_str(BUILTIN_SEED).context("parsing built-in seed"),
    }
}

fn load_config(path: Option<&str>) -> Result<GameConfig> {
    let Some(path) = path else {
        return Ok(GameConfig::default());
    };
    let raw = read(path)?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {path}"))
}

fn env_number(var: &str) -> Result<Option<u64>> {
    match std::env::var(var) {
        Ok(raw) => parse_positive(&raw).map(Some).with_context(|| var.to_string()),
        Err(_) => Ok(None),
    }
}

fn parse_positive(raw: &str) -> Result<u64> {
    let n: u64 = raw.trim().parse().with_context(|| format!("{raw:?} is not a number"))?;
    if n == 0 {
        bail!("must be greater than zero");
    }
    Ok(n)
}

fn read(path: &str) -> Result<String> {
    std::fs::read_to_string(Path::new(path)).with_context(|| format!("reading {path}"))
}

fn parse_users(list: &str) -> Result<StaticAuthenticator> {
    let mut auth = StaticAuthenticator::new();
    let mut any = false;
    for pair in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((name, password)) = pair.split_once(':') else {
            bail!("user entry {pair:?} is not name:password");
        };
        if name.is_empty() {
            bail!("user entry {pair:?} has an empty name");
        }
        auth = auth.with_user(name, password);
        any = true;
    }
    if !any {
        bail!("no users configured");
    }
    Ok(auth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_seed_parses() {
        let seed = load_seed(None).unwrap();
        assert_eq!(seed.rooms.len(), 4);
        assert_eq!(seed.archetypes.len(), 2);
        assert!(!seed.motd.is_empty());
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.max_login_attempts, 3);
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive(" 250 ").unwrap(), 250);
        assert!(parse_positive("0").is_err());
        assert!(parse_positive("soon").is_err());
    }

    #[test]
    fn test_parse_users() {
        assert!(parse_users("ann:secret, bob:hunter2").is_ok());
        assert!(parse_users("ann").is_err());
        assert!(parse_users(":pw").is_err());
        assert!(parse_users(" , ").is_err());
    }

    #[tokio::test]
    async fn test_builtin_seed_loads_into_a_game() {
        let game = Game::load(load_seed(None).unwrap(), GameConfig::default(), MemoryStore::new())
            .await
            .unwrap();
        assert!(game.world().room(game.world().start_room()).is_ok());
    }
}
