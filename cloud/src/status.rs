use std::fmt;

/// Normalized certificate status as reported by the CA.
///
/// The CA reports a small closed set of numeric codes. Anything outside that
/// set becomes [`CaStatus::Unknown`], which is never terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaStatus {
    PendingReview,
    Issued,
    ReviewFailed,
    Expired,
    DnsRecordPending,
    PendingSubmission,
    Cancelling,
    Cancelled,
    PendingConfirmation,
    Revoking,
    Revoked,
    Reissuing,
    PendingRevokeConfirmation,
    Unknown,
}

/// CA code to status, indexed by code.
const STATUS_CODES: [CaStatus; 13] = [
    CaStatus::PendingReview,
    CaStatus::Issued,
    CaStatus::ReviewFailed,
    CaStatus::Expired,
    CaStatus::DnsRecordPending,
    CaStatus::PendingSubmission,
    CaStatus::Cancelling,
    CaStatus::Cancelled,
    CaStatus::PendingConfirmation,
    CaStatus::Revoking,
    CaStatus::Revoked,
    CaStatus::Reissuing,
    CaStatus::PendingRevokeConfirmation,
];

impl CaStatus {
    pub fn from_code(code: u64) -> CaStatus {
        usize::try_from(code)
            .ok()
            .and_then(|i| STATUS_CODES.get(i).copied())
            .unwrap_or(CaStatus::Unknown)
    }

    /// No further automatic progress happens from a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, CaStatus::Issued | CaStatus::Revoked)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CaStatus::PendingReview => "pending-review",
            CaStatus::Issued => "issued",
            CaStatus::ReviewFailed => "review-failed",
            CaStatus::Expired => "expired",
            CaStatus::DnsRecordPending => "dns-record-pending",
            CaStatus::PendingSubmission => "pending-submission",
            CaStatus::Cancelling => "cancelling",
            CaStatus::Cancelled => "cancelled",
            CaStatus::PendingConfirmation => "pending-confirmation",
            CaStatus::Revoking => "revoking",
            CaStatus::Revoked => "revoked",
            CaStatus::Reissuing => "reissuing",
            CaStatus::PendingRevokeConfirmation => "pending-revoke-confirmation",
            CaStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
