use std::{collections::HashMap, str::FromStr, sync::Arc};

use certkeeper_cloud::DnsProvider;
use certkeeper_common::params::DnsProviderKind;

use crate::error::LifecycleError;

/// The configured DNS providers, keyed by the tag stored on ledger entries.
#[derive(Debug, Clone, Default)]
pub struct DnsProviders(HashMap<DnsProviderKind, Arc<dyn DnsProvider>>);

impl DnsProviders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` under its own kind, replacing any previous one.
    pub fn with(mut self, provider: Arc<dyn DnsProvider>) -> Self {
        self.0.insert(provider.kind(), provider);
        self
    }

    pub fn get(&self, kind: DnsProviderKind) -> Result<&Arc<dyn DnsProvider>, LifecycleError> {
        self.0
            .get(&kind)
            .ok_or_else(|| LifecycleError::ProviderNotConfigured(kind.to_string()))
    }

    /// Looks up a provider by its stored tag. Unknown tags fail closed.
    pub fn resolve(&self, tag: &str) -> Result<&Arc<dyn DnsProvider>, LifecycleError> {
        let kind = DnsProviderKind::from_str(tag)
            .map_err(|_| LifecycleError::UnsupportedProvider(tag.to_string()))?;
        self.get(kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn kinds(&self) -> impl Iterator<Item = DnsProviderKind> + '_ {
        self.0.keys().copied()
    }
}
