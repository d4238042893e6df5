//! Certificate lifecycle orchestration.
//!
//! [`CertificateManager`] drives certificates through apply, poll, download,
//! renewal and retirement against a [`CertificateAuthority`]. The
//! [`ValidationRecordReaper`] removes DNS validation records once the CA no
//! longer needs them.
//!
//! [`CertificateAuthority`]: certkeeper_cloud::CertificateAuthority

pub mod artifact;
pub mod error;
pub mod manager;
pub mod providers;
pub mod reaper;
pub mod setup;

#[cfg(test)]
mod testing;

pub use error::{ErrorKind, LifecycleError};
pub use manager::{BulkOutcome, CertificateManager, RenewalProgress};
pub use providers::DnsProviders;
pub use reaper::{ReaperError, SweepReport, ValidationRecordReaper};
pub use setup::CloudSettings;
