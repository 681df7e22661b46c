pub mod api;
pub mod config;
pub mod core_state;
pub mod db;
pub mod models;
pub mod pipeline;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Start the service and block until Ctrl-C.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = config::ServiceConfig::from_env();
    std::fs::create_dir_all(&settings.uploads_dir)?;
    tracing::info!(
        data_dir = %settings.data_dir.display(),
        uploads_dir = %settings.uploads_dir.display(),
        "Configuration loaded"
    );

    let bind_addr = settings.bind_addr;
    let core = Arc::new(core_state::CoreState::new(settings)?);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let mut server = api::start_api_server(core, bind_addr).await?;

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
        }
        server.shutdown();
        server.stopped().await;
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
