//! Clients for the remote services certkeeper depends on: the certificate
//! authority and the DNS hosting providers used for domain validation.

pub mod ca;
pub mod dns;
pub mod status;
pub mod tencent;

pub use ca::{CaError, CertificateAuthority, TencentSsl};
pub use dns::{Cloudflare, DeleteOutcome, DnsProvider, DnsProviderError, Dnspod, TxtRecord};
pub use status::CaStatus;
pub use tencent::{TencentCloudClient, TencentCloudError, TencentCredentials};
