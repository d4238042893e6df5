use async_trait::async_trait;
use certkeeper_common::params::ValidationMethod;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    ca::{
        CaError, CaResult, CertificateAuthority, CertificateDetail, CertificateSummary, DvAuth,
        parse_end_time,
    },
    status::CaStatus,
    tencent::TencentCloudClient,
};

/// Page size of `DescribeCertificates`; the API caps it at 100.
const LIST_PAGE_SIZE: u64 = 100;

/// Revoke answers that mean there is nothing left to revoke.
const ALREADY_REVOKED_CODES: &[&str] = &[
    "InvalidParameter.CertificateNotFound",
    "InvalidParameter.CertificateStatusInvalid",
];

/// Tencent Cloud SSL certificate service.
#[derive(Debug, Clone)]
pub struct TencentSsl {
    client: TencentCloudClient,
}

impl TencentSsl {
    pub fn new(client: TencentCloudClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CertificateAuthority for TencentSsl {
    #[instrument(skip(self))]
    async fn apply(
        &self,
        domain: &str,
        method: ValidationMethod,
        alias: Option<&str>,
    ) -> CaResult<String> {
        let request = ApplyCertificateRequest {
            dv_auth_method: method.as_str(),
            domain_name: domain,
            alias: alias.filter(|a| !a.is_empty()),
        };
        let response: ApplyCertificateResponse =
            self.client.call("ApplyCertificate", &request).await?;

        info!(certificate_id = %response.certificate_id, "certificate requested");
        Ok(response.certificate_id)
    }

    #[instrument(skip(self))]
    async fn describe(&self, certificate_id: &str) -> CaResult<CertificateDetail> {
        let response: DescribeCertificateDetailResponse = self
            .client
            .call("DescribeCertificateDetail", &CertificateIdRequest { certificate_id })
            .await?;

        let status = response
            .status
            .map(CaStatus::from_code)
            .unwrap_or(CaStatus::Unknown);
        let domain = response.domain.unwrap_or_default();

        let dv_auth = response.dv_auth_detail.and_then(|dv| {
            Some(DvAuth {
                domain: dv
                    .dv_auth_domain
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| domain.clone()),
                key: dv.dv_auth_key.filter(|k| !k.is_empty())?,
                value: dv.dv_auth_value.filter(|v| !v.is_empty())?,
            })
        });

        debug!(%status, "described certificate");

        Ok(CertificateDetail {
            certificate_id: response
                .certificate_id
                .unwrap_or_else(|| certificate_id.to_string()),
            status,
            expires_at: response.cert_end_time.as_deref().and_then(parse_end_time),
            alias: response.alias.filter(|a| !a.is_empty()),
            domain,
            dv_auth,
        })
    }

    #[instrument(skip(self))]
    async fn download(&self, certificate_id: &str) -> CaResult<String> {
        let response: DownloadCertificateResponse = self
            .client
            .call("DownloadCertificate", &CertificateIdRequest { certificate_id })
            .await?;

        response
            .content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| CaError::Decode(format!("no archive content for {certificate_id}")))
    }

    #[instrument(skip(self))]
    async fn revoke(&self, certificate_id: &str, reason: &str) -> CaResult<()> {
        let request = RevokeCertificateRequest {
            certificate_id,
            reason,
        };
        match self
            .client
            .call::<_, serde_json::Value>("RevokeCertificate", &request)
            .await
        {
            Ok(_) => {
                info!("certificate revoked");
                Ok(())
            }
            Err(e) if e.code().is_some_and(|c| ALREADY_REVOKED_CODES.contains(&c)) => {
                debug!(error = %e, "certificate already revoked or gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn cancel_revoke(&self, certificate_id: &str) -> CaResult<()> {
        self.client
            .call::<_, serde_json::Value>("CancelRevoke", &CertificateIdRequest { certificate_id })
            .await?;
        info!("revocation cancelled");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self) -> CaResult<Vec<CertificateSummary>> {
        let mut certificates = Vec::new();
        let mut offset = 0;

        loop {
            let page: DescribeCertificatesResponse = self
                .client
                .call(
                    "DescribeCertificates",
                    &DescribeCertificatesRequest {
                        offset,
                        limit: LIST_PAGE_SIZE,
                    },
                )
                .await?;

            let listed = page.certificates.unwrap_or_default();
            let received = listed.len() as u64;
            if received == 0 {
                break;
            }

            certificates.extend(listed.into_iter().filter_map(|c| {
                Some(CertificateSummary {
                    certificate_id: c.certificate_id?,
                    domain: c.domain.unwrap_or_default(),
                    alias: c.alias.unwrap_or_default(),
                    status: c.status.map(CaStatus::from_code).unwrap_or(CaStatus::Unknown),
                    expires_at: c.cert_end_time.as_deref().and_then(parse_end_time),
                })
            }));

            offset += received;
            match page.total_count {
                Some(total) if offset < total => continue,
                _ => break,
            }
        }

        debug!(count = certificates.len(), "listed certificates");
        Ok(certificates)
    }
}

// Tencent SSL API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ApplyCertificateRequest<'a> {
    dv_auth_method: &'a str,
    domain_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApplyCertificateResponse {
    certificate_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CertificateIdRequest<'a> {
    certificate_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RevokeCertificateRequest<'a> {
    certificate_id: &'a str,
    reason: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeCertificateDetailResponse {
    #[serde(default)]
    certificate_id: Option<String>,
    #[serde(default)]
    status: Option<u64>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    alias: Option<String>,
    #[serde(default)]
    cert_end_time: Option<String>,
    #[serde(default)]
    dv_auth_detail: Option<DvAuthDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DvAuthDetail {
    #[serde(default)]
    dv_auth_domain: Option<String>,
    #[serde(default)]
    dv_auth_key: Option<String>,
    #[serde(default)]
    dv_auth_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DownloadCertificateResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeCertificatesRequest {
    offset: u64,
    limit: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeCertificatesResponse {
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default)]
    certificates: Option<Vec<ListedCertificate>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedCertificate {
    #[serde(default)]
    certificate_id: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    alias: Option<String>,
    #[serde(default)]
    status: Option<u64>,
    #[serde(default)]
    cert_end_time: Option<String>,
}
