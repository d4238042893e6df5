use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// The DNS hosting providers a validation record can live in.
///
/// Ledger entries persist the tag as a plain string so that entries written
/// with a tag this build does not know about can still be loaded (and skipped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, ToSchema)]
pub enum DnsProviderKind {
    #[serde(rename = "cloudflare")]
    Cloudflare,

    #[serde(rename = "tencent_cloud")]
    Dnspod,
}

impl DnsProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cloudflare => "cloudflare",
            Self::Dnspod => "tencent_cloud",
        }
    }
}

impl fmt::Display for DnsProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unsupported dns provider: {0}")]
pub struct UnsupportedProvider(pub String);

impl FromStr for DnsProviderKind {
    type Err = UnsupportedProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cloudflare" => Ok(Self::Cloudflare),
            "tencent_cloud" | "dnspod" => Ok(Self::Dnspod),
            other => Err(UnsupportedProvider(other.to_string())),
        }
    }
}

/// Request body for provisioning the DNS validation record of a pending
/// certificate.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ProvisionValidationRecordParams {
    pub dns_provider: DnsProviderKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_tag_parses_known_and_rejects_unknown() {
        assert_eq!(
            "cloudflare".parse::<DnsProviderKind>().unwrap(),
            DnsProviderKind::Cloudflare
        );
        assert_eq!(
            "tencent_cloud".parse::<DnsProviderKind>().unwrap(),
            DnsProviderKind::Dnspod
        );

        let err = "route53".parse::<DnsProviderKind>().unwrap_err();
        assert_eq!(err.to_string(), "unsupported dns provider: route53");
    }

    #[test]
    fn provider_tag_display_matches_stored_form() {
        for kind in [DnsProviderKind::Cloudflare, DnsProviderKind::Dnspod] {
            assert_eq!(kind.to_string().parse::<DnsProviderKind>().unwrap(), kind);
        }
    }
}
