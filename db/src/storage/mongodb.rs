use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Client, Collection, Database,
    bson::{Document, doc},
    options::FindOptions,
};

use crate::{
    models::{DbCertificate, DbProxyRule, DbValidationRecord, RecordId},
    storage::{CertificateStore, ProxyRuleStore, Storage, StoreError, ValidationRecordStore},
};

pub const MONGODB_COLLECTION_CERTIFICATES: &str = "certificates";
pub const MONGODB_COLLECTION_VALIDATION_RECORDS: &str = "validation_records";
pub const MONGODB_COLLECTION_RULES: &str = "rules";

#[derive(Debug)]
pub struct MongoDBStorage(Client);

impl MongoDBStorage {
    pub async fn new(uri: &str) -> Result<Self, mongodb::error::Error> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self(client))
    }

    fn get_db(&self) -> Database {
        self.0
            .default_database()
            .unwrap_or_else(|| self.0.database("certkeeper"))
    }

    fn certificates(&self) -> Collection<DbCertificate> {
        self.get_db().collection(MONGODB_COLLECTION_CERTIFICATES)
    }

    fn validation_records(&self) -> Collection<DbValidationRecord> {
        self.get_db().collection(MONGODB_COLLECTION_VALIDATION_RECORDS)
    }

    fn rules(&self) -> Collection<DbProxyRule> {
        self.get_db().collection(MONGODB_COLLECTION_RULES)
    }
}

/// `{ $or: [...] }` over whichever of the two paths is non-empty, or `None`
/// when neither can match anything.
fn referencing_filter(cert_path: &str, key_path: &str) -> Option<Document> {
    let mut clauses = Vec::new();
    if !cert_path.is_empty() {
        clauses.push(doc! { "ssl_cert": cert_path });
    }
    if !key_path.is_empty() {
        clauses.push(doc! { "ssl_key": key_path });
    }
    (!clauses.is_empty()).then(|| doc! { "$or": clauses })
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == 11000
    )
}

#[async_trait]
impl Storage for MongoDBStorage {
    async fn ping(&self) -> Result<(), StoreError> {
        self.get_db().run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

#[async_trait]
impl CertificateStore for MongoDBStorage {
    async fn get(&self, id: &str) -> Result<Option<DbCertificate>, StoreError> {
        Ok(self.certificates().find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_source_id(&self, source_id: &str) -> Result<Option<DbCertificate>, StoreError> {
        Ok(self
            .certificates()
            .find_one(doc! { "source_id": source_id })
            .await?)
    }

    async fn list(&self) -> Result<Vec<DbCertificate>, StoreError> {
        let find_options = FindOptions::builder().sort(doc! { "created_at": 1 });

        self.certificates()
            .find(doc! {})
            .with_options(find_options.build())
            .await?
            .try_collect()
            .await
            .map_err(StoreError::MongoDB)
    }

    async fn create(&self, cert: DbCertificate) -> Result<DbCertificate, StoreError> {
        match self.certificates().insert_one(&cert).await {
            Ok(_) => Ok(cert),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Conflict {
                entity: "certificate",
                id: cert.id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, cert: DbCertificate) -> Result<DbCertificate, StoreError> {
        let result = self
            .certificates()
            .replace_one(doc! { "_id": &cert.id }, &cert)
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound {
                entity: "certificate",
                id: cert.id,
            });
        }
        Ok(cert)
    }

    async fn upsert(&self, cert: DbCertificate) -> Result<DbCertificate, StoreError> {
        self.certificates()
            .replace_one(doc! { "_id": &cert.id }, &cert)
            .upsert(true)
            .await?;
        Ok(cert)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let result = self.certificates().delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl ValidationRecordStore for MongoDBStorage {
    async fn list(&self) -> Result<Vec<DbValidationRecord>, StoreError> {
        // ULID ids sort by creation time.
        let find_options = FindOptions::builder().sort(doc! { "_id": 1 });

        self.validation_records()
            .find(doc! {})
            .with_options(find_options.build())
            .await?
            .try_collect()
            .await
            .map_err(StoreError::MongoDB)
    }

    async fn create(&self, record: DbValidationRecord) -> Result<DbValidationRecord, StoreError> {
        self.validation_records().insert_one(&record).await?;
        Ok(record)
    }

    async fn delete(&self, id: &RecordId) -> Result<bool, StoreError> {
        let result = self
            .validation_records()
            .delete_one(doc! { "_id": *id })
            .await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl ProxyRuleStore for MongoDBStorage {
    async fn find_referencing(
        &self,
        cert_path: &str,
        key_path: &str,
    ) -> Result<Vec<DbProxyRule>, StoreError> {
        let Some(filter) = referencing_filter(cert_path, key_path) else {
            return Ok(Vec::new());
        };

        self.rules()
            .find(filter)
            .await?
            .try_collect()
            .await
            .map_err(StoreError::MongoDB)
    }

    async fn count_referencing(&self, cert_path: &str, key_path: &str) -> Result<u64, StoreError> {
        let Some(filter) = referencing_filter(cert_path, key_path) else {
            return Ok(0);
        };
        Ok(self.rules().count_documents(filter).await?)
    }

    async fn set_certificate_paths(
        &self,
        rule_id: &str,
        cert_path: Option<&str>,
        key_path: Option<&str>,
    ) -> Result<(), StoreError> {
        // $set only: the rest of the rule document belongs to the proxy config.
        let mut fields = Document::new();
        if let Some(cert_path) = cert_path {
            fields.insert("ssl_cert", cert_path);
        }
        if let Some(key_path) = key_path {
            fields.insert("ssl_key", key_path);
        }
        if fields.is_empty() {
            return Ok(());
        }

        let result = self
            .rules()
            .update_one(doc! { "_id": rule_id }, doc! { "$set": fields })
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound {
                entity: "rule",
                id: rule_id.to_string(),
            });
        }
        Ok(())
    }
}
