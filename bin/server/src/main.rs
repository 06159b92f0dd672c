use gatehouse_access::{AuthGate, Settings, resolve};
use gatehouse_core::Result;
use gatehouse_server::{
    app,
    auth::{AppState, OidcStrategy},
    config::{ServerConfig, provider_environment, validate_routes},
    error::StartupError,
    sessions::{MemorySessionStore, PgSessionStore, SessionStore},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(report) = run().await {
        tracing::error!("{:?}", report);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = ServerConfig::from_env().map_err(|e| StartupError::Configuration {
        details: e.to_string(),
    })?;
    let environment = provider_environment(None).map_err(|e| StartupError::Configuration {
        details: e.to_string(),
    })?;
    tracing::info!(
        listen_addr = %config.listen_addr,
        public_url = %config.public_url,
        "Loaded configuration"
    );

    let settings = resolve(&Settings::builtin(), &environment, &config.gate);
    validate_routes(&settings)?;
    tracing::info!(?settings, "Resolved gate settings");

    config.session.validate()?;
    let cookie_key = config.session.cookie_key()?;
    if config.session.cookie_secret.is_none() {
        tracing::warn!("SESSION__COOKIE_SECRET is not set; sessions will not survive a restart");
    }

    let sessions = open_session_store(config.database_url.as_deref()).await?;

    let strategy = OidcStrategy::discover(&settings.provider, &config.public_url)
        .await
        .map_err(|e| StartupError::Strategy {
            details: e.to_string(),
        })?;
    tracing::info!("Discovered identity provider");

    spawn_session_cleanup(
        sessions.clone(),
        Duration::from_secs(config.session.cleanup_interval_seconds),
    );

    let state = AppState::new(
        AuthGate::new(settings),
        Arc::new(strategy),
        sessions,
        config.session.clone(),
        cookie_key,
    );
    let router = app::router(state, app::demo_routes());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| StartupError::Bind {
            addr: config.listen_addr.clone(),
            details: e.to_string(),
        })?;
    tracing::info!("Listening on http://{}", config.listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::Serve {
            details: e.to_string(),
        })?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn open_session_store(
    database_url: Option<&str>,
) -> Result<Arc<dyn SessionStore>, StartupError> {
    let Some(database_url) = database_url else {
        tracing::info!("DATABASE_URL is not set; keeping sessions in memory");
        return Ok(Arc::new(MemorySessionStore::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|e| StartupError::Database {
            details: format!("failed to connect: {}", e),
        })?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| StartupError::Database {
            details: format!("failed to run migrations: {}", e),
        })?;

    Ok(Arc::new(PgSessionStore::new(pool)))
}

fn spawn_session_cleanup(sessions: Arc<dyn SessionStore>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match sessions.delete_expired().await {
                Ok(0) => {}
                Ok(count) => tracing::info!(count, "Cleaned up expired sessions"),
                Err(report) => tracing::warn!("Session cleanup failed: {:?}", report),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
