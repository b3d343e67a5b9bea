use std::sync::Arc;

use anyhow::Context;

use orgusers_api::app::{build_app, AppServices};
use orgusers_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    orgusers_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    let services = AppServices::from_config(&config)
        .await
        .context("failed to initialise directory services")?;

    let app = build_app(Arc::new(services), config.jwt_secret.clone());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
