use std::sync::Arc;

use anyhow::Context;
use certkeeper_api::{ApiContext, config::CertkeeperApiConfig, reload::NginxReloader, server};
use certkeeper_db::storage::{self, MemoryStorage};
use certkeeper_lifecycle::{CertificateManager, ValidationRecordReaper};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CertkeeperApiConfig::parse();

    if config.dump_openapi {
        let manager = CertificateManager::new(Arc::new(MemoryStorage::new()), &config.cert_dir);
        let (_, api) = server::make(ApiContext::new(manager));
        print!("{}", api.to_pretty_json()?);
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or(
            "certkeeper_api=info,certkeeper_lifecycle=info,certkeeper_cloud=info,certkeeper_db=info"
                .into(),
        ))
        .pretty()
        .init();

    let storage = storage::connect(&config.mongodb_uri)
        .await
        .context("failed to open storage")?;

    let cloud = config.cloud_settings();
    let mut manager = CertificateManager::new(storage, &config.cert_dir)
        .with_dns_providers(cloud.build_dns_providers()?)
        .with_revoke_reason(&config.revoke_reason);
    if let Some(ca) = cloud.build_ca()? {
        manager = manager.with_ca(ca);
    } else {
        warn!("no certificate authority configured, certificate operations will fail");
    }

    let reaper = ValidationRecordReaper::for_manager(&manager, config.cleanup_interval());
    if let Some(reaper) = &reaper {
        reaper.start()?;
    }

    let mut context = ApiContext::new(manager);
    if let Some(nginx) = &config.nginx_path {
        context = context.with_reloader(NginxReloader::new(nginx));
    }

    let (router, _) = server::make(context);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!("Listening on http://{:?}", config.bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    if let Some(reaper) = reaper {
        reaper.stop().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
