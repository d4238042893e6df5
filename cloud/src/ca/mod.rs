//! Certificate authority client.

use std::fmt::Debug;

use async_trait::async_trait;
use certkeeper_common::params::ValidationMethod;
use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

use crate::{status::CaStatus, tencent::TencentCloudError};

mod tencent_ssl;
pub use tencent_ssl::TencentSsl;

pub type CaResult<T> = Result<T, CaError>;

#[derive(Debug, Error)]
pub enum CaError {
    /// The CA rejected the call. Surfaced to callers as-is.
    #[error("CA error {code}: {message}")]
    Api { code: String, message: String },

    #[error("CA unreachable: {0}")]
    Transport(String),

    #[error("unexpected CA response: {0}")]
    Decode(String),

    #[error("no certificate authority configured")]
    NotConfigured,
}

impl From<TencentCloudError> for CaError {
    fn from(value: TencentCloudError) -> Self {
        match value {
            TencentCloudError::Api { code, message, .. } => CaError::Api { code, message },
            TencentCloudError::Transport(e) => CaError::Transport(e.to_string()),
            other => CaError::Decode(other.to_string()),
        }
    }
}

/// DNS record the CA wants to see before it issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DvAuth {
    pub domain: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CertificateDetail {
    pub certificate_id: String,
    pub status: CaStatus,
    pub domain: String,
    pub alias: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub dv_auth: Option<DvAuth>,
}

/// One entry of the CA-side certificate list.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateSummary {
    pub certificate_id: String,
    pub domain: String,
    pub alias: String,
    pub status: CaStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Lifecycle intents against a certificate authority.
///
/// Implementations translate one call into one API request and never retry.
#[async_trait]
pub trait CertificateAuthority: Send + Sync + Debug {
    /// Requests a new certificate and returns the CA's identifier for it.
    async fn apply(
        &self,
        domain: &str,
        method: ValidationMethod,
        alias: Option<&str>,
    ) -> CaResult<String>;

    async fn describe(&self, certificate_id: &str) -> CaResult<CertificateDetail>;

    /// Fetches the issued archive, base64 encoded as delivered by the CA.
    async fn download(&self, certificate_id: &str) -> CaResult<String>;

    /// Revokes a certificate. Revoking one that is already gone or already
    /// revoked succeeds.
    async fn revoke(&self, certificate_id: &str, reason: &str) -> CaResult<()>;

    async fn cancel_revoke(&self, certificate_id: &str) -> CaResult<()>;

    /// Every certificate the account holds.
    async fn list(&self) -> CaResult<Vec<CertificateSummary>>;
}

/// End times come back as `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn parse_end_time(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|t| t.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn parses_ca_end_time_as_utc() {
        assert_eq!(
            parse_end_time("2025-03-01 08:30:00"),
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap())
        );
        assert_eq!(parse_end_time(""), None);
        assert_eq!(parse_end_time("2025-03-01T08:30:00Z"), None);
    }

    #[test]
    fn api_errors_keep_code_and_message() {
        let err = CaError::from(TencentCloudError::Api {
            code: "FailedOperation.CertificateNotFound".into(),
            message: "missing".into(),
            request_id: None,
        });
        match err {
            CaError::Api { code, message } => {
                assert_eq!(code, "FailedOperation.CertificateNotFound");
                assert_eq!(message, "missing");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
