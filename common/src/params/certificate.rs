use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How the CA should verify ownership of the requested domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationMethod {
    /// The CA publishes the validation record itself (domain hosted with the
    /// CA's own DNS service).
    DnsAuto,

    /// The operator publishes the TXT record shown in the apply response.
    Dns,

    /// File based validation served over HTTP.
    FileValidation,
}

impl ValidationMethod {
    /// Wire name expected by the CA.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DnsAuto => "DNS_AUTO",
            Self::Dns => "DNS",
            Self::FileValidation => "FILE_VALIDATION",
        }
    }

    /// Whether somebody other than the CA has to publish a DNS record.
    pub fn requires_manual_dns(&self) -> bool {
        matches!(self, Self::Dns)
    }
}

impl fmt::Display for ValidationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body for applying for a new certificate.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ApplyCertificateParams {
    /// Domain the certificate is issued for.
    pub domain: String,

    /// Domain validation method.
    pub validate_type: ValidationMethod,

    /// Optional alias, also used as the local display name.
    #[serde(default)]
    pub cert_alias: Option<String>,
}

/// Request body for renaming a certificate.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RenameCertificateParams {
    pub name: String,
}
