use anyhow::bail;
use certkeeper_lifecycle::{BulkOutcome, CertificateManager};

pub async fn revoke_all(manager: &CertificateManager) -> anyhow::Result<()> {
    report("revoke", manager.revoke_all_issued().await?)
}

pub async fn cancel_revoke_all(manager: &CertificateManager) -> anyhow::Result<()> {
    report("cancel revoke", manager.cancel_all_revoking().await?)
}

fn report(action: &str, outcome: BulkOutcome) -> anyhow::Result<()> {
    for (id, err) in &outcome.failures {
        eprintln!("{action} failed for {id}: {err}");
    }
    println!(
        "{action}: {} succeeded, {} failed",
        outcome.succeeded(),
        outcome.failures.len()
    );

    if !outcome.is_clean() {
        bail!("{} {action} request(s) failed", outcome.failures.len());
    }
    Ok(())
}
