use std::net::SocketAddr;

use anyhow::Context;

use adminhub_api::app::{build_app, build_services};
use adminhub_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    adminhub_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = build_services(&config)
        .await
        .context("failed to wire services")?;

    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
