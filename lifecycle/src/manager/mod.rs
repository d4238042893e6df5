//! The certificate lifecycle orchestrator.
//!
//! Every operation runs to completion inside the caller's task. Persistent
//! state lives in the [`Storage`] handed to [`CertificateManager::new`]; the
//! manager itself only holds clients and settings and is cheap to clone.

use std::{path::PathBuf, sync::Arc};

use certkeeper_cloud::{CertificateAuthority, ca::CertificateSummary};
use certkeeper_common::views::DnsValidation;
use certkeeper_db::{
    models::{DbCertificate, DbValidationRecord},
    storage::{CertificateStore, Storage, ValidationRecordStore},
};
use tracing::{debug, instrument, warn};

use crate::{error::LifecycleError, providers::DnsProviders};

mod issue;
mod renewal;
mod retire;

pub use issue::Downloaded;
pub use renewal::RenewalProgress;
pub use retire::BulkOutcome;

/// Reason given to the CA when a certificate is revoked by certkeeper.
pub const DEFAULT_REVOKE_REASON: &str = "superseded";

#[derive(Debug, Clone)]
pub struct CertificateManager {
    storage: Arc<dyn Storage>,
    ca: Option<Arc<dyn CertificateAuthority>>,
    dns: DnsProviders,
    cert_dir: PathBuf,
    revoke_reason: String,
}

impl CertificateManager {
    /// A manager without a CA. Operations that need one fail with
    /// [`LifecycleError::NotConfigured`] until [`Self::with_ca`] is used.
    pub fn new(storage: Arc<dyn Storage>, cert_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            ca: None,
            dns: DnsProviders::default(),
            cert_dir: cert_dir.into(),
            revoke_reason: DEFAULT_REVOKE_REASON.to_string(),
        }
    }

    pub fn with_ca(mut self, ca: Arc<dyn CertificateAuthority>) -> Self {
        self.ca = Some(ca);
        self
    }

    pub fn with_dns_providers(mut self, dns: DnsProviders) -> Self {
        self.dns = dns;
        self
    }

    pub fn with_revoke_reason(mut self, reason: impl Into<String>) -> Self {
        self.revoke_reason = reason.into();
        self
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn ca(&self) -> Option<&Arc<dyn CertificateAuthority>> {
        self.ca.as_ref()
    }

    pub fn dns_providers(&self) -> &DnsProviders {
        &self.dns
    }

    fn require_ca(&self) -> Result<&Arc<dyn CertificateAuthority>, LifecycleError> {
        self.ca.as_ref().ok_or(LifecycleError::NotConfigured)
    }

    pub async fn list(&self) -> Result<Vec<DbCertificate>, LifecycleError> {
        Ok(CertificateStore::list(&*self.storage).await?)
    }

    pub async fn get(&self, id: &str) -> Result<DbCertificate, LifecycleError> {
        CertificateStore::get(&*self.storage, id)
            .await?
            .ok_or_else(|| LifecycleError::CertificateNotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn rename(&self, id: &str, name: &str) -> Result<DbCertificate, LifecycleError> {
        let mut cert = self.get(id).await?;
        cert.name = name.to_string();
        cert.touch();
        let cert = CertificateStore::update(&*self.storage, cert).await?;
        debug!(certificate_id = %cert.id, "renamed certificate");
        Ok(cert)
    }

    /// Outstanding validation records, oldest first.
    pub async fn list_validation_records(&self) -> Result<Vec<DbValidationRecord>, LifecycleError> {
        Ok(ValidationRecordStore::list(&*self.storage).await?)
    }

    /// Everything the CA account holds, whether or not it is tracked locally.
    pub async fn list_ca_certificates(&self) -> Result<Vec<CertificateSummary>, LifecycleError> {
        Ok(self.require_ca()?.list().await?)
    }

    /// DV details for display, if the CA has them yet. Never fails the caller.
    async fn validation_info(&self, certificate_id: &str) -> Option<DnsValidation> {
        let ca = self.ca.as_ref()?;
        match ca.describe(certificate_id).await {
            Ok(detail) => detail.dv_auth.map(|dv| DnsValidation {
                domain: dv.domain,
                record: dv.key,
                value: dv.value,
            }),
            Err(e) => {
                warn!(certificate_id, error = %e, "could not fetch validation details");
                None
            }
        }
    }
}
