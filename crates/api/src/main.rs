use anyhow::{Context, Result};
use coral_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("coral_api");

    let app = coral_api::build_app().await?;

    let addr = std::env::var("CORAL_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed binding {addr}"))?;

    tracing::info!(addr = %addr, "coral desk api listening");
    axum::serve(listener, app).await?;

    Ok(())
}
