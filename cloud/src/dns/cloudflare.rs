//! Cloudflare DNS provider implementation
//!
//! Uses the Cloudflare v4 API with a scoped API token.
//! API documentation: <https://developers.cloudflare.com/api/resources/dns/>

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use certkeeper_common::params::DnsProviderKind;
use parking_lot::RwLock;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, trace};

use crate::dns::{
    DeleteOutcome, DnsProvider, DnsProviderError, DnsResult, TxtRecord, root_domain,
};

pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// TTL for validation records; the lowest Cloudflare accepts besides "auto".
const VALIDATION_TTL: u32 = 120;

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug)]
pub struct Cloudflare {
    client: Client,
    base_url: String,
    token: String,
    /// Cache of root domain -> zone id
    zone_cache: Arc<RwLock<HashMap<String, String>>>,
}

impl Cloudflare {
    pub fn new(token: &str, base_url: &str, timeout: Duration) -> DnsResult<Self> {
        if token.is_empty() {
            return Err(DnsProviderError::Configuration(
                "Cloudflare API token is empty".to_string(),
            ));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            DnsProviderError::Configuration(format!("Failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            zone_cache: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    async fn zone_id(&self, domain: &str) -> DnsResult<String> {
        let root = root_domain(domain);

        {
            let cache = self.zone_cache.read();
            if let Some(zone_id) = cache.get(root) {
                trace!(domain = %root, zone_id = %zone_id, "Zone ID found in cache");
                return Ok(zone_id.clone());
            }
        }

        let response = self
            .client
            .get(format!("{}/zones", self.base_url))
            .bearer_auth(&self.token)
            .query(&[("name", root)])
            .send()
            .await
            .map_err(|e| DnsProviderError::ApiRequest(format!("Failed to list zones: {e}")))?;

        let zones: Vec<Zone> = decode(response, "list zones").await?;
        let zone = zones
            .into_iter()
            .find(|z| z.name == root)
            .ok_or_else(|| DnsProviderError::ZoneNotFound {
                domain: root.to_string(),
            })?;

        self.zone_cache
            .write()
            .insert(root.to_string(), zone.id.clone());

        debug!(domain = %root, zone_id = %zone.id, "Found zone for domain");
        Ok(zone.id)
    }

    async fn list_txt_records(&self, zone_id: &str, fqdn: &str) -> DnsResult<Vec<DnsRecord>> {
        let response = self
            .client
            .get(format!("{}/zones/{zone_id}/dns_records", self.base_url))
            .bearer_auth(&self.token)
            .query(&[("type", "TXT"), ("name", fqdn)])
            .send()
            .await
            .map_err(|e| DnsProviderError::ApiRequest(format!("Failed to list records: {e}")))?;

        decode(response, "list records").await
    }
}

#[async_trait]
impl DnsProvider for Cloudflare {
    fn kind(&self) -> DnsProviderKind {
        DnsProviderKind::Cloudflare
    }

    #[instrument(skip(self, record), fields(domain = %record.domain, name = %record.name))]
    async fn create_validation_record(&self, record: TxtRecord<'_>) -> DnsResult<()> {
        let zone_id = self.zone_id(record.domain).await?;
        let fqdn = record.fqdn();

        let request = CreateRecordRequest {
            r#type: "TXT",
            name: &fqdn,
            content: record.value,
            ttl: VALIDATION_TTL,
        };

        let response = self
            .client
            .post(format!("{}/zones/{zone_id}/dns_records", self.base_url))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| DnsProviderError::RecordCreation {
                record_name: fqdn.clone(),
                message: e.to_string(),
            })?;

        let created: DnsRecord = decode(response, "create record")
            .await
            .map_err(|e| match e {
                DnsProviderError::ApiRequest(message) => DnsProviderError::RecordCreation {
                    record_name: fqdn.clone(),
                    message,
                },
                other => other,
            })?;

        debug!(record_id = %created.id, "TXT record created");
        Ok(())
    }

    #[instrument(skip(self, record), fields(domain = %record.domain, name = %record.name))]
    async fn delete_validation_record(&self, record: TxtRecord<'_>) -> DnsResult<DeleteOutcome> {
        let zone_id = self.zone_id(record.domain).await?;
        let fqdn = record.fqdn();

        let records = self.list_txt_records(&zone_id, &fqdn).await?;
        let Some(target) = records
            .into_iter()
            .find(|r| r.name == fqdn && unquote(&r.content) == record.value)
        else {
            debug!(%fqdn, "No matching TXT record, nothing to delete");
            return Ok(DeleteOutcome::NotFound);
        };

        let response = self
            .client
            .delete(format!(
                "{}/zones/{zone_id}/dns_records/{}",
                self.base_url, target.id
            ))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| DnsProviderError::RecordDeletion {
                record_id: target.id.clone(),
                message: e.to_string(),
            })?;

        // 404 is fine - deleted between listing and now
        if response.status() == StatusCode::NOT_FOUND {
            debug!(record_id = %target.id, "Record already deleted");
            return Ok(DeleteOutcome::NotFound);
        }

        let _: serde_json::Value = decode(response, "delete record")
            .await
            .map_err(|e| match e {
                DnsProviderError::ApiRequest(message) => DnsProviderError::RecordDeletion {
                    record_id: target.id.clone(),
                    message,
                },
                other => other,
            })?;

        debug!(record_id = %target.id, "TXT record deleted");
        Ok(DeleteOutcome::Deleted)
    }
}

/// Cloudflare stores TXT content with surrounding quotes in some responses.
fn unquote(content: &str) -> &str {
    content
        .strip_prefix('"')
        .and_then(|c| c.strip_suffix('"'))
        .unwrap_or(content)
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> DnsResult<T> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(DnsProviderError::Authentication(format!(
            "Cloudflare refused token ({status}) on {what}"
        )));
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(DnsProviderError::RateLimited { retry_after_secs });
    }

    let body = response.text().await.map_err(|e| {
        DnsProviderError::ApiRequest(format!("Failed to read {what} response: {e}"))
    })?;

    let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
        DnsProviderError::ApiRequest(format!("Failed to parse {what} response: HTTP {status} - {e}"))
    })?;

    if !status.is_success() || !envelope.success {
        let messages: Vec<_> = envelope
            .errors
            .iter()
            .map(|e| format!("{} {}", e.code, e.message))
            .collect();
        return Err(DnsProviderError::ApiRequest(format!(
            "Failed to {what}: HTTP {status} - {}",
            messages.join("; ")
        )));
    }

    envelope.result.ok_or_else(|| {
        DnsProviderError::ApiRequest(format!("Failed to {what}: response had no result"))
    })
}

// Cloudflare API types

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DnsRecord {
    id: String,
    name: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct CreateRecordRequest<'a> {
    r#type: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
}
