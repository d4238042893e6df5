//! Turning a CA delivery archive into certificate files on disk.
//!
//! The CA ships a base64 encoded zip with one directory per server flavour.
//! Only the nginx directory is used: its `*_bundle.crt` holds the full chain
//! and its `*.key` the private key.

use std::{
    io::{Cursor, Read},
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::debug;
use zip::ZipArchive;

const CHAIN_MODE: u32 = 0o644;
const KEY_MODE: u32 = 0o600;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("archive is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("archive is not a readable zip: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive has no certificate chain (.crt/.pem/.cer) in its nginx directory")]
    MissingChain,

    #[error("archive has no private key (.key) in its nginx directory")]
    MissingKey,

    #[error("`{0}` in archive is empty")]
    Empty(String),

    #[error("failed to read `{name}` from archive: {source}")]
    Read {
        name: String,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ArtifactError {
    /// Local filesystem failure rather than a bad delivery.
    pub fn is_io(&self) -> bool {
        matches!(self, ArtifactError::Write { .. })
    }
}

/// PEM material pulled out of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBundle {
    pub chain: String,
    pub key: String,
}

impl CertificateBundle {
    /// `notAfter` of the first certificate in the chain.
    pub fn leaf_expiry(&self) -> Option<DateTime<Utc>> {
        let (_, pem) = x509_parser::pem::parse_x509_pem(self.chain.as_bytes()).ok()?;
        let cert = pem.parse_x509().ok()?;
        DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl ArtifactPaths {
    /// `{cert_dir}/{id}.crt` and `{cert_dir}/{id}.key`.
    pub fn for_certificate(cert_dir: &Path, id: &str) -> Self {
        Self {
            cert_path: cert_dir.join(format!("{id}.crt")),
            key_path: cert_dir.join(format!("{id}.key")),
        }
    }

    pub fn cert_path_str(&self) -> String {
        self.cert_path.to_string_lossy().into_owned()
    }

    pub fn key_path_str(&self) -> String {
        self.key_path.to_string_lossy().into_owned()
    }
}

pub fn decode_archive(content: &str) -> Result<Vec<u8>, ArtifactError> {
    Ok(STANDARD.decode(content.trim())?)
}

/// Picks the chain and key out of a zip archive. Nothing is written.
pub fn extract_bundle(archive: &[u8]) -> Result<CertificateBundle, ArtifactError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;

    let mut chain: Option<(bool, String, String)> = None;
    let mut key: Option<(String, String)> = None;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if !in_deploy_dir(&name) {
            continue;
        }

        let lower = name.to_ascii_lowercase();
        let is_chain = [".crt", ".pem", ".cer"].iter().any(|s| lower.ends_with(s));
        let is_key = lower.ends_with(".key");
        if !is_chain && !is_key {
            continue;
        }

        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|source| ArtifactError::Read {
                name: name.clone(),
                source,
            })?;

        if is_key {
            key = Some((name, content));
        } else {
            let bundled = lower.ends_with("_bundle.crt");
            // a bundled chain wins over a bare leaf
            if chain.as_ref().is_none_or(|(was_bundled, _, _)| bundled && !was_bundled) {
                chain = Some((bundled, name, content));
            }
        }
    }

    let (_, chain_name, chain) = chain.ok_or(ArtifactError::MissingChain)?;
    let (key_name, key) = key.ok_or(ArtifactError::MissingKey)?;
    if chain.trim().is_empty() {
        return Err(ArtifactError::Empty(chain_name));
    }
    if key.trim().is_empty() {
        return Err(ArtifactError::Empty(key_name));
    }

    debug!(chain = %chain_name, key = %key_name, "extracted certificate bundle");
    Ok(CertificateBundle { chain, key })
}

/// Decodes and extracts in one step.
pub fn extract_bundle_base64(content: &str) -> Result<CertificateBundle, ArtifactError> {
    extract_bundle(&decode_archive(content)?)
}

/// Writes the bundle as `{id}.crt` (0644) and `{id}.key` (0600) under
/// `cert_dir`, creating the directory if needed. Each file is written to a
/// temporary sibling and renamed into place.
pub async fn write_bundle(
    cert_dir: &Path,
    id: &str,
    bundle: &CertificateBundle,
) -> Result<ArtifactPaths, ArtifactError> {
    tokio::fs::create_dir_all(cert_dir)
        .await
        .map_err(|source| ArtifactError::Write {
            path: cert_dir.to_path_buf(),
            source,
        })?;

    let paths = ArtifactPaths::for_certificate(cert_dir, id);
    write_file_atomic(&paths.key_path, &bundle.key, KEY_MODE).await?;
    write_file_atomic(&paths.cert_path, &bundle.chain, CHAIN_MODE).await?;
    Ok(paths)
}

async fn write_file_atomic(path: &Path, content: &str, mode: u32) -> Result<(), ArtifactError> {
    let wrap = |source| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    // A leftover temp file would keep its old mode, so start from scratch
    // and create the file with `mode` from the first byte.
    match tokio::fs::remove_file(&temp_path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(wrap(e)),
        _ => {}
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(&temp_path)
        .await
        .map_err(wrap)?;
    file.write_all(content.as_bytes()).await.map_err(wrap)?;
    file.sync_all().await.map_err(wrap)?;
    drop(file);

    // The umask may have trimmed `mode` on creation.
    tokio::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(wrap)?;
    tokio::fs::rename(&temp_path, path).await.map_err(wrap)?;
    Ok(())
}

/// Entries live under `Nginx/` or `<domain>_nginx/`, possibly below a top
/// level folder.
fn in_deploy_dir(name: &str) -> bool {
    let mut parts: Vec<&str> = name.split('/').collect();
    parts.pop();
    parts.iter().any(|dir| {
        let dir = dir.to_ascii_lowercase();
        dir == "nginx" || dir.ends_with("_nginx")
    })
}
