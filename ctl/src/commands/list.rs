use certkeeper_lifecycle::CertificateManager;

/// Prints every certificate the CA knows about, one per line.
pub async fn list(manager: &CertificateManager) -> anyhow::Result<()> {
    let certs = manager.list_ca_certificates().await?;

    for cert in &certs {
        let expires = cert
            .expires_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}\t{}\t{}\t{}\t{}",
            cert.certificate_id, cert.status, cert.domain, expires, cert.alias
        );
    }
    println!("{} certificate(s)", certs.len());

    Ok(())
}
