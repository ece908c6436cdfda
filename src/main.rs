mod app;
mod auth;
mod body;
mod config;
mod error;
mod scores;
mod state;
#[cfg(test)]
mod test_support;

use crate::auth::services::ensure_superuser;
use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "cosmic_tracer=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    tracing::info!(environment = ?config.environment, secure_cookies = config.cookies.secure, "config loaded");

    let superuser = config.superuser.clone();
    let app_state = AppState::init(config).await?;

    if let Some(cfg) = superuser {
        match ensure_superuser(app_state.users.as_ref(), &cfg).await {
            Ok(Some(user)) => tracing::info!(user_id = user.id, "superuser created"),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "could not create superuser; continuing"),
        }
    }
    tracing::info!(providers = ?app_state.providers.names(), "identity providers registered");

    app::serve(app::build_app(app_state)).await
}
