use serde::{Deserialize, Serialize};

/// The part of a reverse proxy rule certkeeper cares about: which certificate
/// files it serves. Rules are owned elsewhere; only the two paths are ever
/// written from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbProxyRule {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub server_name: String,
    #[serde(default)]
    pub ssl_cert: String,
    #[serde(default)]
    pub ssl_key: String,
}

impl DbProxyRule {
    /// A rule references a certificate when it serves either of its files.
    /// Empty paths never match.
    pub fn references(&self, cert_path: &str, key_path: &str) -> bool {
        (!cert_path.is_empty() && self.ssl_cert == cert_path)
            || (!key_path.is_empty() && self.ssl_key == key_path)
    }
}
