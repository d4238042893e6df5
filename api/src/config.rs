use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, time::Duration};

use certkeeper_lifecycle::{CloudSettings, manager::DEFAULT_REVOKE_REASON, setup};

#[derive(Clone, Debug, Parser)]
pub struct CertkeeperApiConfig {
    #[clap(
        short,
        long,
        env = "CERTKEEPER_BIND_ADDR",
        default_value = "0.0.0.0:8080"
    )]
    pub bind_addr: SocketAddr,

    #[clap(long, default_value_t = false)]
    pub dump_openapi: bool,

    /// MongoDB connection string. `memory:` keeps everything in process,
    /// which is only useful for trying the API out.
    #[clap(
        long,
        env = "CERTKEEPER_MONGODB_URI",
        default_value = "mongodb://localhost:27017/certkeeper"
    )]
    pub mongodb_uri: String,

    /// Directory certificate chains and keys are written to.
    #[clap(long, env = "CERTKEEPER_CERT_DIR", default_value = "./certs")]
    pub cert_dir: PathBuf,

    /// Tencent Cloud secret id. Without it (and the key) the certificate
    /// endpoints answer 503.
    #[clap(long, env = "TENCENT_SECRET_ID")]
    pub tencent_secret_id: Option<String>,

    #[clap(long, env = "TENCENT_SECRET_KEY", hide_env_values = true)]
    pub tencent_secret_key: Option<String>,

    #[clap(long, env = "TENCENT_REGION", default_value = setup::DEFAULT_TENCENT_REGION)]
    pub tencent_region: String,

    #[clap(long, default_value = setup::DEFAULT_SSL_ENDPOINT)]
    pub ssl_endpoint: String,

    #[clap(long, default_value = setup::DEFAULT_DNSPOD_ENDPOINT)]
    pub dnspod_endpoint: String,

    #[clap(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    pub cloudflare_api_token: Option<String>,

    #[clap(long, default_value = setup::DEFAULT_CLOUDFLARE_ENDPOINT)]
    pub cloudflare_endpoint: String,

    /// Seconds between validation record sweeps.
    #[clap(long, env = "CERTKEEPER_CLEANUP_INTERVAL_SECS", default_value_t = 60)]
    pub cleanup_interval_secs: u64,

    /// Reason sent to the CA when certkeeper revokes a certificate.
    #[clap(long, default_value = DEFAULT_REVOKE_REASON)]
    pub revoke_reason: String,

    /// nginx binary to test and reload after a renewal repoints proxy rules.
    /// Reloading is skipped when unset.
    #[clap(long, env = "CERTKEEPER_NGINX_PATH")]
    pub nginx_path: Option<PathBuf>,
}

impl CertkeeperApiConfig {
    pub fn cloud_settings(&self) -> CloudSettings {
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

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}
