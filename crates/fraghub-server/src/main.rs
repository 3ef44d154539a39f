use anyhow::Result;
use clap::Parser;
use tower::limit::ConcurrencyLimitLayer;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fraghub=info,tower_http=debug"));
    if args.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let mut config = config::Config::load(&args.config)?;
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    if config.ensure_jwt_secret() {
        tracing::warn!(
            "No JWT secret configured (set auth.jwt_secret or {}); generated a random one, \
             sessions will not survive a restart",
            config::JWT_SECRET_ENV
        );
    }

    ensure_database_dir(&config.database.url);
    let db = fraghub_db::create_pool(&config.database.url, config.database.max_connections).await?;
    fraghub_db::run_migrations(&db).await?;

    let state = fraghub_core::AppState::new(db, config.app_config());
    let mut app = fraghub_api::build_router().with_state(state);
    if config.server.max_concurrent_requests > 0 {
        app = app.layer(ConcurrencyLimitLayer::new(config.server.max_concurrent_requests));
    }

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(
        bind = %config.server.bind_address,
        database = %config.database.url,
        "FragHub listening"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        })
        .await?;

    Ok(())
}

/// Creates the parent directory of a file-backed SQLite database.
fn ensure_database_dir(url: &str) {
    let Some(path) = url
        .strip_prefix("sqlite://")
        .and_then(|s| s.split('?').next())
    else {
        return;
    };
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Could not create database directory {:?}: {}", parent, e);
            }
        }
    }
}
