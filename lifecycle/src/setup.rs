//! Building the remote clients from configuration.

use std::{sync::Arc, time::Duration};

use certkeeper_cloud::{
    CertificateAuthority, Cloudflare, DnsProviderError, Dnspod, TencentCloudClient,
    TencentCloudError, TencentCredentials, TencentSsl, dns::CLOUDFLARE_API_BASE,
};
use tracing::{info, warn};

use crate::providers::DnsProviders;

pub const DEFAULT_SSL_ENDPOINT: &str = "https://ssl.tencentcloudapi.com";
pub const DEFAULT_DNSPOD_ENDPOINT: &str = "https://dnspod.tencentcloudapi.com";
pub const DEFAULT_CLOUDFLARE_ENDPOINT: &str = CLOUDFLARE_API_BASE;
pub const DEFAULT_TENCENT_REGION: &str = "ap-beijing";

const CLOUDFLARE_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials and endpoints for the CA and the DNS providers. Anything
/// without credentials is simply left out.
#[derive(Clone)]
pub struct CloudSettings {
    pub tencent_secret_id: Option<String>,
    pub tencent_secret_key: Option<String>,
    pub tencent_region: String,
    pub ssl_endpoint: String,
    pub dnspod_endpoint: String,
    pub cloudflare_api_token: Option<String>,
    pub cloudflare_endpoint: String,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            tencent_secret_id: None,
            tencent_secret_key: None,
            tencent_region: DEFAULT_TENCENT_REGION.to_string(),
            ssl_endpoint: DEFAULT_SSL_ENDPOINT.to_string(),
            dnspod_endpoint: DEFAULT_DNSPOD_ENDPOINT.to_string(),
            cloudflare_api_token: None,
            cloudflare_endpoint: DEFAULT_CLOUDFLARE_ENDPOINT.to_string(),
        }
    }
}

impl std::fmt::Debug for CloudSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudSettings")
            .field("tencent_secret_id", &self.tencent_secret_id)
            .field("tencent_secret_key", &self.tencent_secret_key.as_ref().map(|_| "<redacted>"))
            .field("tencent_region", &self.tencent_region)
            .field("ssl_endpoint", &self.ssl_endpoint)
            .field("dnspod_endpoint", &self.dnspod_endpoint)
            .field("cloudflare_api_token", &self.cloudflare_api_token.as_ref().map(|_| "<redacted>"))
            .field("cloudflare_endpoint", &self.cloudflare_endpoint)
            .finish()
    }
}

impl CloudSettings {
    fn tencent_credentials(&self) -> Option<TencentCredentials> {
        match (&self.tencent_secret_id, &self.tencent_secret_key) {
            (Some(id), Some(key)) if !id.is_empty() && !key.is_empty() => {
                Some(TencentCredentials::new(id, key))
            }
            (None, None) => None,
            _ => {
                warn!("only one of the Tencent Cloud secret id and key is set, ignoring both");
                None
            }
        }
    }

    /// The CA client, or `None` when no Tencent Cloud credentials are set.
    pub fn build_ca(&self) -> Result<Option<Arc<dyn CertificateAuthority>>, TencentCloudError> {
        let Some(credentials) = self.tencent_credentials() else {
            info!("no Tencent Cloud credentials, certificate authority disabled");
            return Ok(None);
        };

        let client = TencentCloudClient::ssl(&self.ssl_endpoint, &self.tencent_region, credentials)?;
        let ca: Arc<dyn CertificateAuthority> = Arc::new(TencentSsl::new(client));
        Ok(Some(ca))
    }

    /// Every DNS provider that has credentials.
    pub fn build_dns_providers(&self) -> Result<DnsProviders, DnsProviderError> {
        let mut providers = DnsProviders::new();

        if let Some(credentials) = self.tencent_credentials() {
            let client = TencentCloudClient::dnspod(&self.dnspod_endpoint, credentials)?;
            providers = providers.with(Arc::new(Dnspod::new(client)));
        }

        if let Some(token) = self.cloudflare_api_token.as_deref().filter(|t| !t.is_empty()) {
            let cloudflare = Cloudflare::new(token, &self.cloudflare_endpoint, CLOUDFLARE_TIMEOUT)?;
            providers = providers.with(Arc::new(cloudflare));
        }

        let kinds: Vec<String> = providers.kinds().map(|k| k.to_string()).collect();
        info!(providers = ?kinds, "configured DNS providers");
        Ok(providers)
    }
}
