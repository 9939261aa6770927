use anyhow::Context;
use server::{AppState, app};
use services::services::{
    auth::AdminGate, config::Config, family::FamilyService, sample::sample_family,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    utils::logging::init_tracing("info,server=debug");

    let config = Config::from_env().context("invalid configuration")?;
    let store = config
        .store
        .connect(config.build_policy)
        .await
        .context("failed to open the family store")?;
    let family = FamilyService::new(store);
    info!(backend = family.backend(), "Family store ready");

    if config.seed_sample {
        let inserted = family
            .seed_if_empty(&sample_family())
            .await
            .context("failed to seed the sample family")?;
        if inserted == 0 {
            info!("Store already has members, skipping sample seed");
        }
    }

    match family.member_count().await {
        Ok(members) => info!(members, "Family tree loaded"),
        Err(e) => warn!(error = %e, "Family tree could not be loaded yet"),
    }

    let address = config.bind_address();
    let gate = AdminGate::new(config.admin, config.session_ttl);
    let router = app(AppState::new(family, gate));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("Server running on http://{address}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
