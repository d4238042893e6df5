use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{DbCertificate, DbProxyRule, DbValidationRecord, RecordId};

pub mod memory;
pub mod mongodb;

pub use memory::MemoryStorage;
pub use mongodb::MongoDBStorage;

/// Storage URI selecting [`MemoryStorage`].
pub const MEMORY_URI: &str = "memory:";

/// Opens the storage named by `uri`: [`MEMORY_URI`] for an in-process store,
/// anything else is a MongoDB connection string.
pub async fn connect(uri: &str) -> Result<Arc<dyn Storage>, StoreError> {
    if uri == MEMORY_URI {
        return Ok(Arc::new(MemoryStorage::new()));
    }
    Ok(Arc::new(MongoDBStorage::new(uri).await?))
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Query Error: {0}")]
    MongoDB(#[from] ::mongodb::error::Error),

    #[error("{entity} `{id}` already exists")]
    Conflict { entity: &'static str, id: String },

    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

#[async_trait]
pub trait Storage:
    CertificateStore + ValidationRecordStore + ProxyRuleStore + Debug + Send + Sync + 'static
{
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CertificateStore {
    async fn get(&self, id: &str) -> Result<Option<DbCertificate>, StoreError>;

    /// First row whose CA identifier is `source_id`.
    async fn find_by_source_id(&self, source_id: &str) -> Result<Option<DbCertificate>, StoreError>;

    async fn list(&self) -> Result<Vec<DbCertificate>, StoreError>;

    /// Inserts a new row; [`StoreError::Conflict`] if the id is taken.
    async fn create(&self, cert: DbCertificate) -> Result<DbCertificate, StoreError>;

    /// Replaces an existing row; [`StoreError::NotFound`] if there is none.
    async fn update(&self, cert: DbCertificate) -> Result<DbCertificate, StoreError>;

    /// Inserts or replaces by id.
    async fn upsert(&self, cert: DbCertificate) -> Result<DbCertificate, StoreError>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ValidationRecordStore {
    /// All outstanding entries, oldest first.
    async fn list(&self) -> Result<Vec<DbValidationRecord>, StoreError>;

    async fn create(&self, record: DbValidationRecord) -> Result<DbValidationRecord, StoreError>;

    async fn delete(&self, id: &RecordId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ProxyRuleStore {
    /// Rules serving `cert_path` or `key_path`.
    async fn find_referencing(
        &self,
        cert_path: &str,
        key_path: &str,
    ) -> Result<Vec<DbProxyRule>, StoreError>;

    async fn count_referencing(&self, cert_path: &str, key_path: &str) -> Result<u64, StoreError>;

    /// Points a rule at new certificate files. A `None` path leaves that
    /// field as it is.
    async fn set_certificate_paths(
        &self,
        rule_id: &str,
        cert_path: Option<&str>,
        key_path: Option<&str>,
    ) -> Result<(), StoreError>;
}
