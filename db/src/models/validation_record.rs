use std::fmt::Display;

use certkeeper_common::views::ValidationRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::RecordId;

pub const RECORD_TYPE_TXT: &str = "TXT";

/// A DNS record created to satisfy domain validation that has not been removed
/// from its provider yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbValidationRecord {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub domain: String,
    pub key: String,
    pub value: String,
    pub record_type: String,
    /// Provider tag as written, kept as a string so rows written with a tag
    /// this build does not understand still load.
    pub dns_provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,
}

impl DbValidationRecord {
    pub fn txt(
        domain: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        dns_provider: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            domain: domain.into(),
            key: key.into(),
            value: value.into(),
            record_type: RECORD_TYPE_TXT.to_string(),
            dns_provider: dns_provider.into(),
            certificate_id: None,
        }
    }

    pub fn for_certificate(mut self, certificate_id: impl Into<String>) -> Self {
        self.certificate_id = Some(certificate_id.into());
        self
    }

    /// Creation time, taken from the id's timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.id.ulid().datetime().into()
    }
}

impl Display for DbValidationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}.{} via {}",
            self.record_type, self.key, self.domain, self.dns_provider
        )
    }
}

impl From<DbValidationRecord> for ValidationRecord {
    fn from(value: DbValidationRecord) -> Self {
        Self {
            id: value.id.to_string(),
            created_at: value.created_at(),
            domain: value.domain,
            key: value.key,
            value: value.value,
            record_type: value.record_type,
            dns_provider: value.dns_provider,
            certificate_id: value.certificate_id,
        }
    }
}
