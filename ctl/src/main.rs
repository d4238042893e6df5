use std::path::PathBuf;

use anyhow::Context;
use certkeeper_db::storage;
use certkeeper_lifecycle::{CertificateManager, CloudSettings, setup};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(about = "Operator commands for certkeeper")]
pub struct Args {
    #[clap(subcommand)]
    command: Command,

    #[clap(
        short = 'D',
        long,
        env = "CERTKEEPER_MONGODB_URI",
        default_value = "mongodb://localhost:27017/certkeeper"
    )]
    db_url: String,

    #[clap(long, env = "CERTKEEPER_CERT_DIR", default_value = "./certs")]
    cert_dir: PathBuf,

    #[clap(long, env = "TENCENT_SECRET_ID")]
    tencent_secret_id: Option<String>,

    #[clap(long, env = "TENCENT_SECRET_KEY", hide_env_values = true)]
    tencent_secret_key: Option<String>,

    #[clap(long, env = "TENCENT_REGION", default_value = setup::DEFAULT_TENCENT_REGION)]
    tencent_region: String,

    #[clap(long, default_value = setup::DEFAULT_SSL_ENDPOINT)]
    ssl_endpoint: String,

    #[clap(long, default_value = setup::DEFAULT_DNSPOD_ENDPOINT)]
    dnspod_endpoint: String,

    #[clap(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    cloudflare_api_token: Option<String>,

    #[clap(long, default_value = setup::DEFAULT_CLOUDFLARE_ENDPOINT)]
    cloudflare_endpoint: String,
}

impl Args {
    fn cloud_settings(&self) -> CloudSettings {
        CloudSettings {
            tencent_secret_id: self.tencent_secret_id.clone(),
            tencent_secret_key: self.tencent_secret_key.clone(),
            tencent_region: self.tencent_region.clone(),
            ssl_endpoint: self.ssl_endpoint.clone(),
            dnspod_endpoint: self.dnspod_endpoint.clone(),
            cloudflare_api_token: self.cloudflare_api_token.clone(),
            cloudflare_endpoint: self.cloudflare_endpoint.clone(),
        }
    }
}

#[derive(Clone, Subcommand)]
pub enum Command {
    /// List the certificates held by the CA.
    List,

    /// Revoke every issued certificate.
    #[command(name = "revoke-all")]
    RevokeAll,

    /// Cancel revocation of every certificate that is being revoked.
    #[command(name = "cancel-revoke-all")]
    CancelRevokeAll,

    /// Remove validation records the CA no longer needs, once.
    Sweep,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "certkeeper_lifecycle=info,certkeeper_cloud=warn".into()),
        )
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cloud = args.cloud_settings();

    let stg = storage::connect(&args.db_url)
        .await
        .context("failed to connect to storage")?;

    let mut manager = CertificateManager::new(stg, &args.cert_dir)
        .with_dns_providers(cloud.build_dns_providers()?);
    if let Some(ca) = cloud.build_ca()? {
        manager = manager.with_ca(ca);
    }

    match args.command {
        Command::List => commands::list(&manager).await,
        Command::RevokeAll => commands::revoke_all(&manager).await,
        Command::CancelRevokeAll => commands::cancel_revoke_all(&manager).await,
        Command::Sweep => commands::sweep(&manager).await,
    }
}
