//! usermgmt - session-secured user management web service

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::{Config, LogFormat};
use ums_api::{AppInfo, AppState, create_router, routes::ADMIN_ROLE};
use ums_auth::{
    AccessRules, AuthenticationManager, DatabaseUserDetailsService, PasswordEncoder,
    SessionConfig, SessionManager, WebSecurity, spawn_purge_task,
};
use ums_db::{Database, NewUser};

const USER_ROLE: &str = "USER";
const LOGIN_PAGE: &str = "/login";
const LOGOUT_URL: &str = "/logout";

/// usermgmt - user management web service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "UMS_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "UMS_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;

    init_logging(&config.logging.level, config.logging.format);
    info!("{}", Config::describe_source(&args.config));

    info!("Starting {} {}", config.app.name, config.app.version);
    config.warn_insecure();

    // Create the database directory
    if let Some(parent) = Path::new(&config.database.path).parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create database directory {:?}", parent))?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", config.database.path);
    let db = Database::new(&db_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.path))?;

    let encoder = PasswordEncoder::new(config.auth.bcrypt_cost);
    seed_defaults(&db, &config, encoder).await?;

    let users = Arc::new(DatabaseUserDetailsService::new(db.clone()));
    let auth = Arc::new(
        AuthenticationManager::new(users.clone(), encoder)
            .context("Failed to initialize authentication manager")?,
    );

    let sessions = Arc::new(SessionManager::new(
        db.clone(),
        users,
        SessionConfig::new(
            config.auth.session_cookie_name.clone(),
            config.auth.session_timeout_minutes,
            config.auth.cookie_secure,
        ),
    ));
    spawn_purge_task(
        sessions.clone(),
        Duration::from_secs(config.auth.session_purge_interval_secs),
    );

    let rules = AccessRules::new(&config.auth.public_paths);
    let security = Arc::new(WebSecurity::new(rules, sessions, LOGIN_PAGE, LOGOUT_URL));
    info!(
        "Public paths: {}",
        security.rules().patterns().collect::<Vec<_>>().join(", ")
    );

    let metrics_handle = if config.metrics.enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(Arc::new(handle))
    } else {
        None
    };

    let state = AppState::new(
        db,
        auth,
        security,
        AppInfo {
            name: config.app.name.clone(),
            version: config.app.version.clone(),
        },
    );

    let app = create_router(state, metrics_handle).layer(TraceLayer::new_for_http());

    // Determine bind address
    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind_addr, port))?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Create the default roles, and an admin account when there are no users
async fn seed_defaults(db: &Database, config: &Config, encoder: PasswordEncoder) -> Result<()> {
    let admin_role = db.ensure_role(ADMIN_ROLE).await?;
    let user_role = db.ensure_role(USER_ROLE).await?;

    if db.has_users().await? {
        return Ok(());
    }

    info!("Creating default admin user");
    let password = config.auth.admin_password.clone();
    let password_hash = tokio::task::spawn_blocking(move || encoder.encode(&password))
        .await
        .context("Password hashing task failed")??;

    let admin = db
        .insert_user(NewUser {
            username: config.auth.admin_username.clone(),
            password_hash,
            enabled: true,
        })
        .await?;
    db.set_user_roles(admin.id, &[admin_role.roleid, user_role.roleid])
        .await?;

    info!("Default admin user created (username: {})", admin.username);
    Ok(())
}

/// Initialize logging
fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
