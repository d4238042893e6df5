use std::path::Path;

use certkeeper_cloud::{CaError, CaStatus};
use certkeeper_db::storage::{CertificateStore, ProxyRuleStore};
use tracing::{info, instrument, warn};

use super::{CertificateManager, renewal::remove_file_quietly};
use crate::error::LifecycleError;

/// Result of a bulk CA operation. Individual failures do not stop the batch.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub attempted: usize,
    pub failures: Vec<(String, CaError)>,
}

impl BulkOutcome {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl CertificateManager {
    /// Stops tracking a certificate and removes its files.
    ///
    /// Refused while any proxy rule still serves the certificate's files. The
    /// CA-side revoke is attempted but its failure does not stop the delete.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), LifecycleError> {
        let cert = self.get(id).await?;

        if !cert.cert_path.is_empty() || !cert.key_path.is_empty() {
            let rules =
                ProxyRuleStore::count_referencing(&*self.storage, &cert.cert_path, &cert.key_path)
                    .await?;
            if rules > 0 {
                return Err(LifecycleError::InUse {
                    id: cert.id.clone(),
                    rules,
                });
            }
        }

        if let Some(ca) = &self.ca {
            if let Err(e) = ca.revoke(&cert.source_id, &self.revoke_reason).await {
                warn!(certificate_id = %cert.source_id, error = %e, "could not revoke certificate");
            }
        }

        for path in [&cert.cert_path, &cert.key_path] {
            if !path.is_empty() {
                remove_file_quietly(Path::new(path)).await;
            }
        }

        CertificateStore::delete(&*self.storage, &cert.id).await?;
        info!(certificate_id = %cert.id, "deleted certificate");
        Ok(())
    }

    /// Revokes every certificate the CA reports as issued.
    #[instrument(skip(self))]
    pub async fn revoke_all_issued(&self) -> Result<BulkOutcome, LifecycleError> {
        let ca = self.require_ca()?;
        let mut outcome = BulkOutcome::default();

        for summary in ca.list().await? {
            if summary.status != CaStatus::Issued {
                continue;
            }
            outcome.attempted += 1;
            match ca.revoke(&summary.certificate_id, &self.revoke_reason).await {
                Ok(()) => info!(certificate_id = %summary.certificate_id, domain = %summary.domain, "revoked"),
                Err(e) => {
                    warn!(certificate_id = %summary.certificate_id, error = %e, "revoke failed");
                    outcome.failures.push((summary.certificate_id, e));
                }
            }
        }

        Ok(outcome)
    }

    /// Cancels every revocation the CA still has in progress.
    #[instrument(skip(self))]
    pub async fn cancel_all_revoking(&self) -> Result<BulkOutcome, LifecycleError> {
        let ca = self.require_ca()?;
        let mut outcome = BulkOutcome::default();

        for summary in ca.list().await? {
            if summary.status != CaStatus::Revoking {
                continue;
            }
            outcome.attempted += 1;
            match ca.cancel_revoke(&summary.certificate_id).await {
                Ok(()) => info!(certificate_id = %summary.certificate_id, "revocation cancelled"),
                Err(e) => {
                    warn!(certificate_id = %summary.certificate_id, error = %e, "cancel revoke failed");
                    outcome.failures.push((summary.certificate_id, e));
                }
            }
        }

        Ok(outcome)
    }
}
