use std::path::Path;

use certkeeper_cloud::CaStatus;
use certkeeper_common::{params::ValidationMethod, views::RenewCertificateResponse};
use certkeeper_db::{
    models::DbCertificate,
    storage::{CertificateStore, ProxyRuleStore},
};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::CertificateManager;
use crate::{artifact::ArtifactPaths, error::LifecycleError};

/// Outcome of one renewal completion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalProgress {
    /// The replacement is not issued yet. Nothing was changed.
    NotReady(CaStatus),
    /// The replacement row `new_id` took over from the original.
    Completed { new_id: String, rules_updated: bool },
}

impl CertificateManager {
    /// Requests a replacement for a certificate.
    ///
    /// The row is marked renewing before the CA is called and rolled back to
    /// active if the CA refuses. A certificate that is already renewing is
    /// rejected without contacting the CA.
    #[instrument(skip(self))]
    pub async fn renew(&self, id: &str) -> Result<RenewCertificateResponse, LifecycleError> {
        let ca = self.require_ca()?;
        let mut cert = self.get(id).await?;

        cert.lifecycle = cert
            .lifecycle
            .request_renewal()
            .map_err(|_| LifecycleError::AlreadyRenewing(cert.id.clone()))?;
        cert.touch();
        let mut cert = CertificateStore::update(&*self.storage, cert).await?;

        let alias = renewal_alias(&cert.name);
        let new_id = match ca.apply(&cert.domain, ValidationMethod::DnsAuto, Some(&alias)).await {
            Ok(new_id) => new_id,
            Err(e) => {
                warn!(certificate_id = %cert.id, error = %e, "CA refused renewal, rolling back");
                cert.lifecycle = cert.lifecycle.renewal_rejected()?;
                cert.touch();
                CertificateStore::update(&*self.storage, cert).await?;
                return Err(e.into());
            }
        };

        cert.lifecycle = cert.lifecycle.renewal_accepted(new_id.clone())?;
        cert.touch();
        let cert = CertificateStore::update(&*self.storage, cert).await?;
        info!(certificate_id = %cert.id, renewal_source_id = %new_id, "renewal requested");

        Ok(RenewCertificateResponse {
            old_certificate_id: cert.id,
            validate_info: self.validation_info(&new_id).await,
            new_certificate_id: new_id,
        })
    }

    /// Swaps a renewing certificate for its replacement once the CA has
    /// issued it.
    ///
    /// Safe to call repeatedly: until the replacement is issued nothing is
    /// written, and once the swap is done the original no longer exists and
    /// the call fails with [`LifecycleError::CertificateNotFound`].
    #[instrument(skip(self))]
    pub async fn complete_renewal(&self, source_id: &str) -> Result<RenewalProgress, LifecycleError> {
        let ca = self.require_ca()?;
        let original = CertificateStore::find_by_source_id(&*self.storage, source_id)
            .await?
            .ok_or_else(|| LifecycleError::CertificateNotFound(source_id.to_string()))?;
        let renewal_id = original
            .lifecycle
            .renewal_source_id()
            .ok_or_else(|| LifecycleError::NotRenewing(original.id.clone()))?
            .to_string();

        let detail = ca.describe(&renewal_id).await?;
        if detail.status != CaStatus::Issued {
            return Ok(RenewalProgress::NotReady(detail.status));
        }

        let downloaded = self.download_artifact(&renewal_id).await?;

        let mut replacement = DbCertificate::new(&renewal_id, &original.name, &original.domain);
        replacement.cert_path = downloaded.paths.cert_path_str();
        replacement.key_path = downloaded.paths.key_path_str();
        replacement.original_source_id = Some(original.source_id.clone());
        replacement.expires_at = detail.expires_at.or(downloaded.expires_at);

        // Insert before delete: a crash in between leaves both rows and the
        // next poll finishes the swap.
        let replacement = CertificateStore::upsert(&*self.storage, replacement).await?;
        if original.id != replacement.id {
            CertificateStore::delete(&*self.storage, &original.id).await?;
        }
        info!(
            old_certificate_id = %original.id,
            new_certificate_id = %replacement.id,
            "renewal completed"
        );

        let rules_updated = self.repoint_rules(&original, &downloaded.paths).await;
        remove_stale_files(&original, &downloaded.paths).await;

        if let Err(e) = ca.revoke(&original.source_id, &self.revoke_reason).await {
            warn!(certificate_id = %original.source_id, error = %e, "could not revoke superseded certificate");
        }

        Ok(RenewalProgress::Completed {
            new_id: replacement.id,
            rules_updated,
        })
    }

    /// Points every rule serving the original's files at `paths`. Returns
    /// whether any rule was changed.
    async fn repoint_rules(&self, original: &DbCertificate, paths: &ArtifactPaths) -> bool {
        if !original.has_artifacts() {
            return false;
        }

        let rules = match ProxyRuleStore::find_referencing(
            &*self.storage,
            &original.cert_path,
            &original.key_path,
        )
        .await
        {
            Ok(rules) => rules,
            Err(e) => {
                warn!(certificate_id = %original.id, error = %e, "could not look up proxy rules");
                return false;
            }
        };

        let (cert_path, key_path) = (paths.cert_path_str(), paths.key_path_str());
        let mut updated = false;
        for rule in rules {
            // Only the fields that served the original move; a rule sharing
            // just the chain keeps its own key.
            let new_cert = (rule.ssl_cert == original.cert_path).then_some(cert_path.as_str());
            let new_key = (rule.ssl_key == original.key_path).then_some(key_path.as_str());
            match ProxyRuleStore::set_certificate_paths(&*self.storage, &rule.id, new_cert, new_key)
                .await
            {
                Ok(()) => {
                    debug!(rule_id = %rule.id, server_name = %rule.server_name, "repointed proxy rule");
                    updated = true;
                }
                Err(e) => warn!(rule_id = %rule.id, error = %e, "could not repoint proxy rule"),
            }
        }
        updated
    }
}

/// `{name}_renewed_{YYYYMMDD}`.
fn renewal_alias(name: &str) -> String {
    format!("{name}_renewed_{}", Utc::now().format("%Y%m%d"))
}

async fn remove_stale_files(original: &DbCertificate, current: &ArtifactPaths) {
    let stale = [
        (&original.cert_path, &current.cert_path),
        (&original.key_path, &current.key_path),
    ];
    for (old, new) in stale {
        if old.is_empty() || Path::new(old) == new.as_path() {
            continue;
        }
        remove_file_quietly(Path::new(old)).await;
    }
}

/// Removes a file, treating an already missing one as removed.
pub(super) async fn remove_file_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed certificate file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove certificate file"),
    }
}
