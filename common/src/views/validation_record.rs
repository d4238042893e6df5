use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A DNS validation record that still has to be removed from its provider.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidationRecord {
    pub id: String,

    /// Root domain the record was created under.
    pub domain: String,

    /// TXT record name.
    pub key: String,

    /// TXT record value.
    pub value: String,

    pub record_type: String,

    pub dns_provider: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,

    pub created_at: DateTime<Utc>,
}
