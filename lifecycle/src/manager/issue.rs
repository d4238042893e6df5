use certkeeper_cloud::{CaStatus, TxtRecord, ca::CertificateDetail, dns::root_domain};
use certkeeper_common::{
    params::{DnsProviderKind, ValidationMethod},
    views::{ApplyCertificateResponse, CertificateStatusReport},
};
use certkeeper_db::{
    models::{DbCertificate, DbValidationRecord, Lifecycle},
    storage::{CertificateStore, StoreError, ValidationRecordStore},
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use super::{CertificateManager, RenewalProgress};
use crate::{
    artifact::{self, ArtifactPaths},
    error::LifecycleError,
};

/// Files written for a certificate and the expiry read from its chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Downloaded {
    pub paths: ArtifactPaths,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CertificateManager {
    /// Asks the CA for a certificate and starts tracking it.
    ///
    /// For manual DNS validation the record the operator has to publish is
    /// returned alongside the new id.
    #[instrument(skip(self))]
    pub async fn apply(
        &self,
        domain: &str,
        method: ValidationMethod,
        alias: Option<&str>,
    ) -> Result<ApplyCertificateResponse, LifecycleError> {
        let ca = self.require_ca()?;
        let alias = alias.filter(|a| !a.is_empty());
        let certificate_id = ca.apply(domain, method, alias).await?;

        match CertificateStore::find_by_source_id(&*self.storage, &certificate_id).await? {
            Some(existing) => {
                debug!(certificate_id = %existing.id, "certificate already tracked");
            }
            None => {
                let cert = DbCertificate::new(&certificate_id, alias.unwrap_or(domain), domain);
                match CertificateStore::create(&*self.storage, cert).await {
                    Ok(cert) => info!(certificate_id = %cert.id, %domain, "tracking new certificate"),
                    Err(StoreError::Conflict { .. }) => {
                        debug!(%certificate_id, "certificate row created concurrently");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        let validate_info = if method.requires_manual_dns() {
            self.validation_info(&certificate_id).await
        } else {
            None
        };

        Ok(ApplyCertificateResponse {
            certificate_id,
            validate_info,
        })
    }

    /// Polls the CA for a tracked certificate.
    ///
    /// A renewing certificate gets a renewal completion attempt. An active,
    /// issued one has its files re-downloaded so they exist even when an
    /// earlier download failed. `reloaded` in the report is set when proxy
    /// rules were repointed.
    #[instrument(skip(self))]
    pub async fn check_status(&self, id: &str) -> Result<CertificateStatusReport, LifecycleError> {
        let ca = self.require_ca()?;
        let mut cert = self.get(id).await?;
        let detail = ca.describe(&cert.source_id).await?;

        let mut report = CertificateStatusReport {
            certificate_id: cert.id.clone(),
            status: detail.status.to_string(),
            domain: cert.domain.clone(),
            expires_at: detail.expires_at.or(cert.expires_at),
            reloaded: false,
            replaced_by: None,
        };

        match cert.lifecycle.clone() {
            Lifecycle::Renewing { renewal_source_id } => {
                match self.complete_renewal(&cert.source_id).await {
                    Ok(RenewalProgress::Completed {
                        new_id,
                        rules_updated,
                    }) => {
                        report.reloaded = rules_updated;
                        report.replaced_by = Some(new_id);
                    }
                    Ok(RenewalProgress::NotReady(status)) => {
                        debug!(%renewal_source_id, %status, "renewal not issued yet");
                    }
                    Err(e) => {
                        warn!(certificate_id = %cert.id, %renewal_source_id, error = %e, "renewal completion failed");
                    }
                }
            }
            Lifecycle::RenewalRequested => {
                // The CA never answered the renewal request, so there is
                // nothing to wait for. Put the row back so it can be renewed.
                warn!(certificate_id = %cert.id, "renewal was interrupted before the CA answered, resetting to active");
                cert.lifecycle = cert.lifecycle.renewal_rejected()?;
                cert.touch();
                CertificateStore::update(&*self.storage, cert).await?;
            }
            Lifecycle::Active => {
                if self.refresh_active(&mut cert, &detail).await {
                    cert.touch();
                    let cert = CertificateStore::update(&*self.storage, cert).await?;
                    report.expires_at = cert.expires_at;
                }
            }
        }

        Ok(report)
    }

    /// Brings an active row in line with the CA. Returns whether it changed.
    async fn refresh_active(&self, cert: &mut DbCertificate, detail: &CertificateDetail) -> bool {
        let mut changed = false;

        if let Some(alias) = detail.alias.as_deref().filter(|a| !a.is_empty()) {
            if alias != cert.name {
                cert.name = alias.to_string();
                changed = true;
            }
        }

        if detail.status != CaStatus::Issued {
            return changed;
        }

        match self.download_artifact(&cert.source_id).await {
            Ok(downloaded) => {
                cert.cert_path = downloaded.paths.cert_path_str();
                cert.key_path = downloaded.paths.key_path_str();
                cert.expires_at = detail.expires_at.or(downloaded.expires_at);
                true
            }
            Err(e) => {
                warn!(certificate_id = %cert.id, error = %e, "could not refresh certificate files");
                changed
            }
        }
    }

    /// Downloads a tracked certificate and records where its files live.
    #[instrument(skip(self))]
    pub async fn download(&self, id: &str) -> Result<DbCertificate, LifecycleError> {
        let ca = self.require_ca()?;
        let mut cert = self.get(id).await?;
        let downloaded = self.download_artifact(&cert.source_id).await?;

        let ca_expiry = match ca.describe(&cert.source_id).await {
            Ok(detail) => detail.expires_at,
            Err(e) => {
                debug!(error = %e, "no end time from CA, using the chain");
                None
            }
        };

        cert.cert_path = downloaded.paths.cert_path_str();
        cert.key_path = downloaded.paths.key_path_str();
        cert.expires_at = ca_expiry.or(downloaded.expires_at);
        cert.touch();
        Ok(CertificateStore::update(&*self.storage, cert).await?)
    }

    /// Fetches the CA archive for `source_id` and writes `{source_id}.crt`
    /// and `{source_id}.key` into the certificate directory. Nothing is
    /// written unless both files are present in the archive.
    #[instrument(skip(self))]
    pub async fn download_artifact(&self, source_id: &str) -> Result<Downloaded, LifecycleError> {
        let ca = self.require_ca()?;
        let archive = ca.download(source_id).await?;
        let bundle = artifact::extract_bundle_base64(&archive)?;
        let paths = artifact::write_bundle(&self.cert_dir, source_id, &bundle).await?;
        debug!(cert_path = %paths.cert_path.display(), "wrote certificate files");

        Ok(Downloaded {
            paths,
            expires_at: bundle.leaf_expiry(),
        })
    }

    /// Publishes the CA's DV record through `provider` and records it in the
    /// ledger so the reaper removes it once the CA is done with it.
    ///
    /// While a renewal is in flight the record is provisioned for the
    /// replacement certificate.
    #[instrument(skip(self))]
    pub async fn provision_validation_record(
        &self,
        id: &str,
        provider: DnsProviderKind,
    ) -> Result<DbValidationRecord, LifecycleError> {
        let ca = self.require_ca()?;
        let dns = self.dns.get(provider)?;
        let cert = self.get(id).await?;
        let target = cert
            .lifecycle
            .renewal_source_id()
            .unwrap_or(&cert.source_id)
            .to_string();

        let dv = ca
            .describe(&target)
            .await?
            .dv_auth
            .ok_or_else(|| LifecycleError::NoValidationDetails(target.clone()))?;

        let domain = root_domain(&dv.domain).to_string();
        dns.create_validation_record(TxtRecord {
            domain: &domain,
            name: &dv.key,
            value: &dv.value,
        })
        .await?;

        let record = DbValidationRecord::txt(domain, dv.key, dv.value, provider.to_string())
            .for_certificate(target);
        let record = ValidationRecordStore::create(&*self.storage, record).await?;
        info!(record = %record, "provisioned validation record");
        Ok(record)
    }
}
