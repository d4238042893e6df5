//! DNSPod (Tencent Cloud DNS) provider implementation
//!
//! Shares the signed Tencent Cloud API 3.0 transport with the SSL client.
//! API documentation: <https://cloud.tencent.com/document/api/1427/56153>

use async_trait::async_trait;
use certkeeper_common::params::DnsProviderKind;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    dns::{DeleteOutcome, DnsProvider, DnsProviderError, DnsResult, TxtRecord, root_domain},
    tencent::{TencentCloudClient, TencentCloudError},
};

/// Upper bound on records fetched per listing; the API maximum.
const RECORD_LIST_LIMIT: u32 = 3000;

/// DNSPod's default resolution line.
const DEFAULT_RECORD_LINE: &str = "默认";

const VALIDATION_TTL: u32 = 600;

/// Returned instead of an empty list when a domain has no records of a type.
const NO_DATA_OF_RECORD: &str = "ResourceNotFound.NoDataOfRecord";

#[derive(Debug, Clone)]
pub struct Dnspod {
    client: TencentCloudClient,
}

impl Dnspod {
    pub fn new(client: TencentCloudClient) -> Self {
        Self { client }
    }

    async fn list_txt_records(&self, domain: &str) -> DnsResult<Vec<RecordListItem>> {
        let request = DescribeRecordListRequest {
            domain,
            record_type: "TXT",
            limit: RECORD_LIST_LIMIT,
        };

        match self
            .client
            .call::<_, DescribeRecordListResponse>("DescribeRecordList", &request)
            .await
        {
            Ok(response) => Ok(response.record_list.unwrap_or_default()),
            Err(TencentCloudError::Api { code, .. }) if code == NO_DATA_OF_RECORD => {
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl DnsProvider for Dnspod {
    fn kind(&self) -> DnsProviderKind {
        DnsProviderKind::Dnspod
    }

    #[instrument(skip(self, record), fields(domain = %record.domain, name = %record.name))]
    async fn create_validation_record(&self, record: TxtRecord<'_>) -> DnsResult<()> {
        let sub_domain = record.relative_name();
        let request = CreateRecordRequest {
            domain: root_domain(record.domain),
            sub_domain: &sub_domain,
            record_type: "TXT",
            record_line: DEFAULT_RECORD_LINE,
            value: record.value,
            ttl: VALIDATION_TTL,
        };

        let created: CreateRecordResponse = self
            .client
            .call("CreateRecord", &request)
            .await
            .map_err(|e| DnsProviderError::RecordCreation {
                record_name: sub_domain.clone(),
                message: e.to_string(),
            })?;

        debug!(record_id = ?created.record_id, "TXT record created");
        Ok(())
    }

    #[instrument(skip(self, record), fields(domain = %record.domain, name = %record.name))]
    async fn delete_validation_record(&self, record: TxtRecord<'_>) -> DnsResult<DeleteOutcome> {
        let domain = root_domain(record.domain);
        let name = record.relative_name();

        let records = self.list_txt_records(domain).await?;
        let Some(target) = records
            .into_iter()
            .find(|r| r.name == name && r.value == record.value)
        else {
            debug!(%name, "No matching TXT record, nothing to delete");
            return Ok(DeleteOutcome::NotFound);
        };

        let request = DeleteRecordRequest {
            domain,
            record_id: target.record_id,
        };
        self.client
            .call::<_, serde_json::Value>("DeleteRecord", &request)
            .await
            .map_err(|e| DnsProviderError::RecordDeletion {
                record_id: target.record_id.to_string(),
                message: e.to_string(),
            })?;

        debug!(record_id = target.record_id, "TXT record deleted");
        Ok(DeleteOutcome::Deleted)
    }
}

// DNSPod API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeRecordListRequest<'a> {
    domain: &'a str,
    record_type: &'a str,
    limit: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeRecordListResponse {
    #[serde(default)]
    record_list: Option<Vec<RecordListItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordListItem {
    record_id: u64,
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateRecordRequest<'a> {
    domain: &'a str,
    sub_domain: &'a str,
    record_type: &'a str,
    record_line: &'a str,
    value: &'a str,
    #[serde(rename = "TTL")]
    ttl: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateRecordResponse {
    #[serde(default)]
    record_id: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteRecordRequest<'a> {
    domain: &'a str,
    record_id: u64,
}
