use std::fmt::Display;

use bson::DateTime as BsonDateTime;
use certkeeper_common::views::Certificate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Lifecycle, LifecycleDecodeError};

/// A certificate row. The lifecycle is kept as a typed state in memory and
/// flattened into `status` + `renewal_source_id` when stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CertificateDocument", into = "CertificateDocument")]
pub struct DbCertificate {
    pub id: String,
    pub source_id: String,
    pub name: String,
    pub domain: String,
    pub cert_path: String,
    pub key_path: String,
    pub lifecycle: Lifecycle,
    pub original_source_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbCertificate {
    /// A freshly applied certificate: local id and CA id are the same and
    /// nothing has been written to disk yet.
    pub fn new(source_id: impl Into<String>, name: impl Into<String>, domain: impl Into<String>) -> Self {
        let source_id = source_id.into();
        let now = Utc::now();
        Self {
            id: source_id.clone(),
            source_id,
            name: name.into(),
            domain: domain.into(),
            cert_path: String::new(),
            key_path: String::new(),
            lifecycle: Lifecycle::Active,
            original_source_id: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_artifacts(&self) -> bool {
        !self.cert_path.is_empty() && !self.key_path.is_empty()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Display for DbCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DbCertificate {{ id: {}, domain: {}, status: {} }}",
            self.id, self.domain, self.lifecycle
        )
    }
}

impl From<DbCertificate> for Certificate {
    fn from(value: DbCertificate) -> Self {
        Self {
            status: value.lifecycle.status().to_string(),
            renewal_source_id: value.lifecycle.renewal_source_id().map(str::to_string),
            id: value.id,
            source_id: value.source_id,
            name: value.name,
            domain: value.domain,
            cert_path: value.cert_path,
            key_path: value.key_path,
            original_source_id: value.original_source_id,
            expires_at: value.expires_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CertificateDocument {
    #[serde(rename = "_id")]
    id: String,
    source_id: String,
    name: String,
    domain: String,
    #[serde(default)]
    cert_path: String,
    #[serde(default)]
    key_path: String,
    status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    renewal_source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original_source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<BsonDateTime>,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

impl TryFrom<CertificateDocument> for DbCertificate {
    type Error = LifecycleDecodeError;

    fn try_from(doc: CertificateDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            lifecycle: Lifecycle::from_parts(&doc.status, doc.renewal_source_id)?,
            id: doc.id,
            source_id: doc.source_id,
            name: doc.name,
            domain: doc.domain,
            cert_path: doc.cert_path,
            key_path: doc.key_path,
            original_source_id: doc.original_source_id,
            expires_at: doc.expires_at.map(BsonDateTime::to_chrono),
            created_at: doc.created_at.to_chrono(),
            updated_at: doc.updated_at.to_chrono(),
        })
    }
}

impl From<DbCertificate> for CertificateDocument {
    fn from(cert: DbCertificate) -> Self {
        Self {
            status: cert.lifecycle.status().to_string(),
            renewal_source_id: cert.lifecycle.renewal_source_id().map(str::to_string),
            id: cert.id,
            source_id: cert.source_id,
            name: cert.name,
            domain: cert.domain,
            cert_path: cert.cert_path,
            key_path: cert.key_path,
            original_source_id: cert.original_source_id,
            expires_at: cert.expires_at.map(BsonDateTime::from_chrono),
            created_at: BsonDateTime::from_chrono(cert.created_at),
            updated_at: BsonDateTime::from_chrono(cert.updated_at),
        }
    }
}
