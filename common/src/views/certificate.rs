use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A locally tracked TLS certificate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Certificate {
    /// Local identifier. Equal to `source_id` for every certificate issued
    /// through the CA.
    pub id: String,

    /// Identifier assigned by the CA.
    pub source_id: String,

    /// User facing label.
    pub name: String,

    pub domain: String,

    /// Location of the PEM chain on disk. Empty until the first download.
    pub cert_path: String,

    /// Location of the PEM private key on disk. Empty until the first download.
    pub key_path: String,

    /// Either `active` or `renewing`.
    pub status: String,

    /// CA identifier of the replacement certificate while a renewal is in flight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renewal_source_id: Option<String>,

    /// CA identifier of the certificate this one replaced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_source_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DNS record the operator has to publish for a manual DNS validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DnsValidation {
    /// Domain the record has to be created under.
    pub domain: String,

    /// TXT record name.
    pub record: String,

    /// TXT record value.
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplyCertificateResponse {
    pub certificate_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate_info: Option<DnsValidation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RenewCertificateResponse {
    pub old_certificate_id: String,
    pub new_certificate_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate_info: Option<DnsValidation>,
}

/// Result of polling the CA for a certificate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CertificateStatusReport {
    pub certificate_id: String,

    /// Normalized CA status, e.g. `issued` or `pending-review`.
    pub status: String,

    pub domain: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Set when the poll changed certificate paths referenced by proxy rules
    /// and the reverse proxy configuration should be regenerated.
    pub reloaded: bool,

    /// Id of the row that replaced this certificate when the poll completed
    /// a renewal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<String>,
}

/// A certificate as known to the CA, independent of local records.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CaCertificate {
    pub certificate_id: String,
    pub domain: String,
    pub alias: String,
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}
