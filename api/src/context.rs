use certkeeper_lifecycle::CertificateManager;
use tracing::warn;

use crate::reload::NginxReloader;

#[derive(Debug, Clone)]
pub struct ApiContext {
    pub manager: CertificateManager,
    pub reloader: Option<NginxReloader>,
}

impl ApiContext {
    pub fn new(manager: CertificateManager) -> Self {
        Self {
            manager,
            reloader: None,
        }
    }

    pub fn with_reloader(mut self, reloader: NginxReloader) -> Self {
        self.reloader = Some(reloader);
        self
    }

    /// Reloads the reverse proxy if one is configured. Failures are logged
    /// and never reach the caller.
    pub async fn reload_proxy(&self) {
        let Some(reloader) = &self.reloader else {
            return;
        };
        if let Err(e) = reloader.reload().await {
            warn!(error = %e, "could not reload nginx after certificate change");
        }
    }
}
