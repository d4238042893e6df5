use std::fmt;

use thiserror::Error;

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_RENEWING: &str = "renewing";

/// Where a stored certificate is in its renewal lifecycle.
///
/// On disk this is the pair `(status, renewal_source_id)`. `RenewalRequested`
/// is persisted as `renewing` without an id: the row is marked before the CA
/// is asked for a replacement so a crash in between leaves it visibly
/// mid-renewal rather than silently active until the next poll resets it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Active,
    RenewalRequested,
    Renewing {
        renewal_source_id: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot apply `{event}` to a certificate that is {from}")]
pub struct TransitionError {
    pub from: &'static str,
    pub event: &'static str,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleDecodeError {
    #[error("unknown certificate status `{0}`")]
    UnknownStatus(String),
    #[error("active certificate carries renewal source id `{0}`")]
    DanglingRenewal(String),
}

impl Lifecycle {
    pub fn status(&self) -> &'static str {
        match self {
            Lifecycle::Active => STATUS_ACTIVE,
            Lifecycle::RenewalRequested | Lifecycle::Renewing { .. } => STATUS_RENEWING,
        }
    }

    pub fn renewal_source_id(&self) -> Option<&str> {
        match self {
            Lifecycle::Renewing { renewal_source_id } => Some(renewal_source_id),
            _ => None,
        }
    }

    pub fn is_renewing(&self) -> bool {
        !matches!(self, Lifecycle::Active)
    }

    /// `Active -> RenewalRequested`. Any renewal already in flight refuses.
    pub fn request_renewal(&self) -> Result<Lifecycle, TransitionError> {
        match self {
            Lifecycle::Active => Ok(Lifecycle::RenewalRequested),
            _ => Err(self.refuse("request_renewal")),
        }
    }

    /// `RenewalRequested -> Renewing` once the CA hands back a new id.
    pub fn renewal_accepted(&self, renewal_source_id: String) -> Result<Lifecycle, TransitionError> {
        match self {
            Lifecycle::RenewalRequested if !renewal_source_id.is_empty() => {
                Ok(Lifecycle::Renewing { renewal_source_id })
            }
            _ => Err(self.refuse("renewal_accepted")),
        }
    }

    /// `RenewalRequested -> Active` when the CA rejected the renewal request.
    pub fn renewal_rejected(&self) -> Result<Lifecycle, TransitionError> {
        match self {
            Lifecycle::RenewalRequested => Ok(Lifecycle::Active),
            _ => Err(self.refuse("renewal_rejected")),
        }
    }

    pub fn from_parts(
        status: &str,
        renewal_source_id: Option<String>,
    ) -> Result<Lifecycle, LifecycleDecodeError> {
        let renewal_source_id = renewal_source_id.filter(|id| !id.is_empty());
        match (status, renewal_source_id) {
            (STATUS_ACTIVE, None) => Ok(Lifecycle::Active),
            (STATUS_ACTIVE, Some(id)) => Err(LifecycleDecodeError::DanglingRenewal(id)),
            (STATUS_RENEWING, None) => Ok(Lifecycle::RenewalRequested),
            (STATUS_RENEWING, Some(renewal_source_id)) => Ok(Lifecycle::Renewing { renewal_source_id }),
            (other, _) => Err(LifecycleDecodeError::UnknownStatus(other.to_string())),
        }
    }

    fn refuse(&self, event: &'static str) -> TransitionError {
        let from = match self {
            Lifecycle::Active => "active",
            Lifecycle::RenewalRequested => "awaiting a renewal id",
            Lifecycle::Renewing { .. } => "renewing",
        };
        TransitionError { from, event }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renewal_happy_path() {
        let requested = Lifecycle::Active.request_renewal().unwrap();
        assert_eq!(requested, Lifecycle::RenewalRequested);
        assert_eq!(requested.status(), STATUS_RENEWING);
        assert_eq!(requested.renewal_source_id(), None);

        let renewing = requested.renewal_accepted("NEW".into()).unwrap();
        assert_eq!(renewing.renewal_source_id(), Some("NEW"));
        assert!(renewing.is_renewing());
    }

    #[test]
    fn rejected_renewal_rolls_back() {
        let requested = Lifecycle::Active.request_renewal().unwrap();
        assert_eq!(requested.renewal_rejected().unwrap(), Lifecycle::Active);
    }

    #[test]
    fn renewing_refuses_a_second_request() {
        let renewing = Lifecycle::Renewing {
            renewal_source_id: "NEW".into(),
        };
        let err = renewing.request_renewal().unwrap_err();
        assert_eq!(err.from, "renewing");
        assert!(Lifecycle::RenewalRequested.request_renewal().is_err());
    }

    #[test]
    fn accepted_needs_a_pending_request_and_an_id() {
        assert!(Lifecycle::Active.renewal_accepted("NEW".into()).is_err());
        assert!(Lifecycle::RenewalRequested.renewal_accepted(String::new()).is_err());
    }

    #[test]
    fn decodes_stored_pairs() {
        assert_eq!(Lifecycle::from_parts("active", None), Ok(Lifecycle::Active));
        assert_eq!(
            Lifecycle::from_parts("active", Some(String::new())),
            Ok(Lifecycle::Active)
        );
        assert_eq!(
            Lifecycle::from_parts("renewing", None),
            Ok(Lifecycle::RenewalRequested)
        );
        assert_eq!(
            Lifecycle::from_parts("renewing", Some("X".into())),
            Ok(Lifecycle::Renewing {
                renewal_source_id: "X".into()
            })
        );
        assert!(matches!(
            Lifecycle::from_parts("active", Some("X".into())),
            Err(LifecycleDecodeError::DanglingRenewal(_))
        ));
        assert!(matches!(
            Lifecycle::from_parts("bogus", None),
            Err(LifecycleDecodeError::UnknownStatus(_))
        ));
    }
}
