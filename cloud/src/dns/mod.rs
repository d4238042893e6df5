//! DNS providers used to publish and remove domain validation records.

use std::fmt::Debug;

use async_trait::async_trait;
use certkeeper_common::params::DnsProviderKind;
use thiserror::Error;

use crate::tencent::TencentCloudError;

mod cloudflare;
mod dnspod;

pub use cloudflare::{CLOUDFLARE_API_BASE, Cloudflare};
pub use dnspod::Dnspod;

pub type DnsResult<T> = Result<T, DnsProviderError>;

#[derive(Debug, Error)]
pub enum DnsProviderError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Zone not found for domain '{domain}'")]
    ZoneNotFound { domain: String },

    #[error("Failed to create TXT record '{record_name}': {message}")]
    RecordCreation { record_name: String, message: String },

    #[error("Failed to delete TXT record '{record_id}': {message}")]
    RecordDeletion { record_id: String, message: String },

    #[error("API request failed: {0}")]
    ApiRequest(String),

    #[error("Rate limited by DNS provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl From<TencentCloudError> for DnsProviderError {
    fn from(value: TencentCloudError) -> Self {
        match value {
            TencentCloudError::Api { ref code, .. } if code.starts_with("AuthFailure") => {
                DnsProviderError::Authentication(value.to_string())
            }
            TencentCloudError::InvalidEndpoint(_) => {
                DnsProviderError::Configuration(value.to_string())
            }
            other => DnsProviderError::ApiRequest(other.to_string()),
        }
    }
}

/// A validation TXT record: `name` under `domain`, holding `value`.
///
/// `name` may be relative (`_dnsauth`) or already fully qualified
/// (`_dnsauth.example.com`); providers normalize it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxtRecord<'a> {
    pub domain: &'a str,
    pub name: &'a str,
    pub value: &'a str,
}

impl TxtRecord<'_> {
    /// Fully qualified record name.
    pub fn fqdn(&self) -> String {
        let domain = root_domain(self.domain);
        if self.name == domain || self.name.ends_with(&format!(".{domain}")) {
            self.name.to_string()
        } else {
            format!("{}.{domain}", self.name)
        }
    }

    /// Record name relative to the root domain, `@` for the apex.
    pub fn relative_name(&self) -> String {
        let domain = root_domain(self.domain);
        if self.name == domain {
            "@".to_string()
        } else {
            self.name
                .strip_suffix(&format!(".{domain}"))
                .unwrap_or(self.name)
                .to_string()
        }
    }
}

/// Outcome of a deletion. Both variants are success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Nothing matched; somebody already removed the record.
    NotFound,
}

#[async_trait]
pub trait DnsProvider: Send + Sync + Debug {
    fn kind(&self) -> DnsProviderKind;

    /// Publishes a validation record.
    async fn create_validation_record(&self, record: TxtRecord<'_>) -> DnsResult<()>;

    /// Removes the record matching name and value exactly. An absent record
    /// is [`DeleteOutcome::NotFound`], never an error.
    async fn delete_validation_record(&self, record: TxtRecord<'_>) -> DnsResult<DeleteOutcome>;
}

/// Registrable domain for `domain`: a leading `*.` is dropped and only the
/// last two labels are kept.
pub fn root_domain(domain: &str) -> &str {
    let domain = domain.strip_prefix("*.").unwrap_or(domain);
    match domain.rmatch_indices('.').nth(1) {
        Some((idx, _)) => &domain[idx + 1..],
        None => domain,
    }
}
