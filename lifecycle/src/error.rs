use certkeeper_cloud::{CaError, DnsProviderError};
use certkeeper_db::{models::TransitionError, storage::StoreError};
use thiserror::Error;

use crate::artifact::ArtifactError;

/// Coarse classification of a [`LifecycleError`], for callers that need to
/// pick a response without looking at the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotConfigured,
    NotFound,
    Conflict,
    Upstream,
    Internal,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("no certificate authority configured")]
    NotConfigured,

    #[error("DNS provider `{0}` is not configured")]
    ProviderNotConfigured(String),

    #[error("unsupported dns provider: {0}")]
    UnsupportedProvider(String),

    #[error("certificate `{0}` not found")]
    CertificateNotFound(String),

    #[error("certificate `{0}` is already being renewed")]
    AlreadyRenewing(String),

    #[error("certificate `{0}` has no renewal in flight")]
    NotRenewing(String),

    #[error("certificate `{id}` is still used by {rules} proxy rule(s)")]
    InUse { id: String, rules: u64 },

    #[error("CA returned no DNS validation details for `{0}`")]
    NoValidationDetails(String),

    #[error(transparent)]
    Ca(#[from] CaError),

    #[error(transparent)]
    Dns(#[from] DnsProviderError),

    #[error("failed to materialize certificate: {0}")]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::NotConfigured
            | LifecycleError::ProviderNotConfigured(_)
            | LifecycleError::Ca(CaError::NotConfigured) => ErrorKind::NotConfigured,

            LifecycleError::CertificateNotFound(_)
            | LifecycleError::Store(StoreError::NotFound { .. }) => ErrorKind::NotFound,

            LifecycleError::AlreadyRenewing(_)
            | LifecycleError::NotRenewing(_)
            | LifecycleError::InUse { .. }
            | LifecycleError::UnsupportedProvider(_)
            | LifecycleError::Transition(_)
            | LifecycleError::Store(StoreError::Conflict { .. }) => ErrorKind::Conflict,

            LifecycleError::NoValidationDetails(_)
            | LifecycleError::Ca(_)
            | LifecycleError::Dns(_) => ErrorKind::Upstream,

            LifecycleError::Artifact(e) if e.is_io() => ErrorKind::Internal,
            LifecycleError::Artifact(_) => ErrorKind::Upstream,

            LifecycleError::Store(_) => ErrorKind::Internal,
        }
    }
}
