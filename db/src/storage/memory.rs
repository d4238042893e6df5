use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    models::{DbCertificate, DbProxyRule, DbValidationRecord, RecordId},
    storage::{CertificateStore, ProxyRuleStore, Storage, StoreError, ValidationRecordStore},
};

/// Process-local storage with the same semantics as [`super::MongoDBStorage`].
///
/// Backs tests and `--mongodb-uri memory:` runs; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    certificates: RwLock<BTreeMap<String, DbCertificate>>,
    validation_records: RwLock<BTreeMap<RecordId, DbValidationRecord>>,
    rules: RwLock<BTreeMap<String, DbProxyRule>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules are created by the proxy configuration, never by certkeeper
    /// itself, so this lives outside [`ProxyRuleStore`].
    pub fn insert_rule(&self, rule: DbProxyRule) {
        self.rules.write().insert(rule.id.clone(), rule);
    }

    pub fn rule(&self, id: &str) -> Option<DbProxyRule> {
        self.rules.read().get(id).cloned()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl CertificateStore for MemoryStorage {
    async fn get(&self, id: &str) -> Result<Option<DbCertificate>, StoreError> {
        Ok(self.certificates.read().get(id).cloned())
    }

    async fn find_by_source_id(&self, source_id: &str) -> Result<Option<DbCertificate>, StoreError> {
        Ok(self
            .certificates
            .read()
            .values()
            .find(|c| c.source_id == source_id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<DbCertificate>, StoreError> {
        let mut certs: Vec<_> = self.certificates.read().values().cloned().collect();
        certs.sort_by_key(|c| c.created_at);
        Ok(certs)
    }

    async fn create(&self, cert: DbCertificate) -> Result<DbCertificate, StoreError> {
        let mut certs = self.certificates.write();
        if certs.contains_key(&cert.id) {
            return Err(StoreError::Conflict {
                entity: "certificate",
                id: cert.id,
            });
        }
        certs.insert(cert.id.clone(), cert.clone());
        Ok(cert)
    }

    async fn update(&self, cert: DbCertificate) -> Result<DbCertificate, StoreError> {
        let mut certs = self.certificates.write();
        match certs.get_mut(&cert.id) {
            Some(existing) => {
                *existing = cert.clone();
                Ok(cert)
            }
            None => Err(StoreError::NotFound {
                entity: "certificate",
                id: cert.id,
            }),
        }
    }

    async fn upsert(&self, cert: DbCertificate) -> Result<DbCertificate, StoreError> {
        self.certificates
            .write()
            .insert(cert.id.clone(), cert.clone());
        Ok(cert)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.certificates.write().remove(id).is_some())
    }
}

#[async_trait]
impl ValidationRecordStore for MemoryStorage {
    async fn list(&self) -> Result<Vec<DbValidationRecord>, StoreError> {
        Ok(self.validation_records.read().values().cloned().collect())
    }

    async fn create(&self, record: DbValidationRecord) -> Result<DbValidationRecord, StoreError> {
        self.validation_records
            .write()
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete(&self, id: &RecordId) -> Result<bool, StoreError> {
        Ok(self.validation_records.write().remove(id).is_some())
    }
}

#[async_trait]
impl ProxyRuleStore for MemoryStorage {
    async fn find_referencing(
        &self,
        cert_path: &str,
        key_path: &str,
    ) -> Result<Vec<DbProxyRule>, StoreError> {
        Ok(self
            .rules
            .read()
            .values()
            .filter(|r| r.references(cert_path, key_path))
            .cloned()
            .collect())
    }

    async fn count_referencing(&self, cert_path: &str, key_path: &str) -> Result<u64, StoreError> {
        Ok(self
            .rules
            .read()
            .values()
            .filter(|r| r.references(cert_path, key_path))
            .count() as u64)
    }

    async fn set_certificate_paths(
        &self,
        rule_id: &str,
        cert_path: Option<&str>,
        key_path: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut rules = self.rules.write();
        let rule = rules.get_mut(rule_id).ok_or_else(|| StoreError::NotFound {
            entity: "rule",
            id: rule_id.to_string(),
        })?;
        if let Some(cert_path) = cert_path {
            rule.ssl_cert = cert_path.to_string();
        }
        if let Some(key_path) = key_path {
            rule.ssl_key = key_path.to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Lifecycle;

    #[tokio::test]
    async fn create_refuses_duplicate_ids() {
        let store = MemoryStorage::new();
        let cert = DbCertificate::new("abc", "example", "example.com");

        CertificateStore::create(&store, cert.clone()).await.unwrap();
        let err = CertificateStore::create(&store, cert).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn update_requires_an_existing_row() {
        let store = MemoryStorage::new();
        let mut cert = DbCertificate::new("abc", "example", "example.com");

        let err = CertificateStore::update(&store, cert.clone()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        CertificateStore::create(&store, cert.clone()).await.unwrap();
        cert.lifecycle = Lifecycle::RenewalRequested;
        CertificateStore::update(&store, cert).await.unwrap();

        let stored = CertificateStore::get(&store, "abc").await.unwrap().unwrap();
        assert_eq!(stored.lifecycle, Lifecycle::RenewalRequested);
    }

    #[tokio::test]
    async fn finds_rows_by_ca_identifier() {
        let store = MemoryStorage::new();
        let mut cert = DbCertificate::new("abc", "example", "example.com");
        cert.id = "local".into();
        CertificateStore::create(&store, cert).await.unwrap();

        let found = CertificateStore::find_by_source_id(&store, "abc").await.unwrap();
        assert_eq!(found.map(|c| c.id).as_deref(), Some("local"));
        assert!(
            CertificateStore::find_by_source_id(&store, "zzz")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn ledger_lists_oldest_first_and_deletes() {
        let store = MemoryStorage::new();
        let first = DbValidationRecord::txt("example.com", "_dnsauth", "v1", "cloudflare");
        let second = DbValidationRecord::txt("example.org", "_dnsauth", "v2", "tencent_cloud");
        ValidationRecordStore::create(&store, second.clone()).await.unwrap();
        ValidationRecordStore::create(&store, first.clone()).await.unwrap();

        let listed = ValidationRecordStore::list(&store).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].id <= listed[1].id);

        assert!(ValidationRecordStore::delete(&store, &first.id).await.unwrap());
        assert!(!ValidationRecordStore::delete(&store, &first.id).await.unwrap());
        assert_eq!(ValidationRecordStore::list(&store).await.unwrap(), vec![second]);
    }

    #[tokio::test]
    async fn rule_paths_are_rewritten_in_place() {
        let store = MemoryStorage::new();
        store.insert_rule(DbProxyRule {
            id: "r1".into(),
            server_name: "example.com".into(),
            ssl_cert: "/certs/old.crt".into(),
            ssl_key: "/certs/old.key".into(),
        });

        assert_eq!(
            store
                .count_referencing("/certs/old.crt", "/certs/old.key")
                .await
                .unwrap(),
            1
        );
        store
            .set_certificate_paths("r1", Some("/certs/new.crt"), Some("/certs/new.key"))
            .await
            .unwrap();

        let rule = store.rule("r1").unwrap();
        assert_eq!(rule.ssl_cert, "/certs/new.crt");
        assert_eq!(
            store
                .count_referencing("/certs/old.crt", "/certs/old.key")
                .await
                .unwrap(),
            0
        );
        assert!(
            store
                .set_certificate_paths("nope", Some("a"), Some("b"))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn rule_fields_are_rewritten_independently() {
        let store = MemoryStorage::new();
        store.insert_rule(DbProxyRule {
            id: "r1".into(),
            server_name: "example.com".into(),
            ssl_cert: "/certs/old.crt".into(),
            ssl_key: "/etc/nginx/own.key".into(),
        });

        store
            .set_certificate_paths("r1", Some("/certs/new.crt"), None)
            .await
            .unwrap();

        let rule = store.rule("r1").unwrap();
        assert_eq!(rule.ssl_cert, "/certs/new.crt");
        assert_eq!(rule.ssl_key, "/etc/nginx/own.key");
    }
}
