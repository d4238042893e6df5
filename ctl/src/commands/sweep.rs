use std::time::Duration;

use anyhow::Context;
use certkeeper_lifecycle::{CertificateManager, ValidationRecordReaper};

/// Runs a single reconciliation pass over the validation record ledger.
pub async fn sweep(manager: &CertificateManager) -> anyhow::Result<()> {
    let reaper = ValidationRecordReaper::for_manager(manager, Duration::ZERO)
        .context("sweeping needs a certificate authority, set the Tencent Cloud credentials")?;

    let report = reaper.sweep().await?;
    println!(
        "examined {}, removed {}, pending {}, failed {}",
        report.examined, report.removed, report.pending, report.failed
    );
    Ok(())
}
