//! Tencent Cloud API 3.0 client.
//!
//! Every Tencent Cloud product (SSL certificates, DNSPod) speaks the same
//! protocol: a JSON `POST /` signed with TC3-HMAC-SHA256, the action named in
//! the `X-TC-Action` header, and a `{"Response": {...}}` envelope that carries
//! an `Error` object instead of a non-2xx status when the call is rejected.
//! API documentation: <https://cloud.tencent.com/document/api/1140/40509>

use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, trace};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "TC3-HMAC-SHA256";
const CONTENT_TYPE: &str = "application/json; charset=utf-8";
const SIGNED_HEADERS: &str = "content-type;host;x-tc-action";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const SSL_SERVICE: &str = "ssl";
pub const SSL_VERSION: &str = "2019-12-05";
pub const DNSPOD_SERVICE: &str = "dnspod";
pub const DNSPOD_VERSION: &str = "2021-03-23";

#[derive(Debug, Error)]
pub enum TencentCloudError {
    /// The API answered with an `Error` object.
    #[error("{code}: {message}")]
    Api {
        code: String,
        message: String,
        request_id: Option<String>,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("invalid endpoint `{0}`")]
    InvalidEndpoint(String),

    #[error("failed to sign request")]
    Signing,
}

impl TencentCloudError {
    /// The API error code, if the call reached the API and was rejected.
    pub fn code(&self) -> Option<&str> {
        match self {
            TencentCloudError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct TencentCredentials {
    pub secret_id: String,
    pub secret_key: String,
}

impl TencentCredentials {
    pub fn new(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl fmt::Debug for TencentCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TencentCredentials")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// A signed client for one Tencent Cloud product.
#[derive(Debug, Clone)]
pub struct TencentCloudClient {
    http: Client,
    endpoint: String,
    host: String,
    service: &'static str,
    version: &'static str,
    region: Option<String>,
    credentials: TencentCredentials,
}

impl TencentCloudClient {
    pub fn new(
        endpoint: &str,
        service: &'static str,
        version: &'static str,
        region: Option<String>,
        credentials: TencentCredentials,
    ) -> Result<Self, TencentCloudError> {
        let url = Url::parse(endpoint)
            .map_err(|_| TencentCloudError::InvalidEndpoint(endpoint.to_string()))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(TencentCloudError::InvalidEndpoint(endpoint.to_string())),
        };

        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            host,
            service,
            version,
            region,
            credentials,
        })
    }

    /// Client for the SSL certificate API.
    pub fn ssl(
        endpoint: &str,
        region: impl Into<String>,
        credentials: TencentCredentials,
    ) -> Result<Self, TencentCloudError> {
        Self::new(endpoint, SSL_SERVICE, SSL_VERSION, Some(region.into()), credentials)
    }

    /// Client for the DNSPod API. DNSPod is a global service and takes no region.
    pub fn dnspod(
        endpoint: &str,
        credentials: TencentCredentials,
    ) -> Result<Self, TencentCloudError> {
        Self::new(endpoint, DNSPOD_SERVICE, DNSPOD_VERSION, None, credentials)
    }

    /// Performs `action` with `request` as the JSON body and decodes the
    /// contents of the `Response` envelope.
    pub async fn call<Req, Resp>(&self, action: &str, request: &Req) -> Result<Resp, TencentCloudError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_string(request)
            .map_err(|e| TencentCloudError::Decode(format!("failed to encode request: {e}")))?;
        let now = Utc::now();
        let authorization = self.authorization(action, &payload, now)?;

        trace!(service = self.service, action, "calling tencent cloud");

        let mut builder = self
            .http
            .post(&self.endpoint)
            .header("Authorization", authorization)
            .header("Content-Type", CONTENT_TYPE)
            .header("Host", &self.host)
            .header("X-TC-Action", action)
            .header("X-TC-Version", self.version)
            .header("X-TC-Timestamp", now.timestamp().to_string());
        if let Some(region) = &self.region {
            builder = builder.header("X-TC-Region", region);
        }

        let response = builder.body(payload).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let envelope: Envelope = serde_json::from_str(&body).map_err(|e| {
            TencentCloudError::Decode(format!("HTTP {status}, {e}: {body}"))
        })?;

        if let Some(error) = envelope.response.get("Error") {
            let error: ApiError = serde_json::from_value(error.clone())
                .map_err(|e| TencentCloudError::Decode(format!("malformed error: {e}")))?;
            let request_id = envelope
                .response
                .get("RequestId")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            debug!(
                action,
                code = %error.code,
                request_id = ?request_id,
                "tencent cloud rejected call"
            );
            return Err(TencentCloudError::Api {
                code: error.code,
                message: error.message,
                request_id,
            });
        }

        serde_json::from_value(envelope.response)
            .map_err(|e| TencentCloudError::Decode(format!("{action}: {e}")))
    }

    fn authorization(
        &self,
        action: &str,
        payload: &str,
        at: DateTime<Utc>,
    ) -> Result<String, TencentCloudError> {
        sign(
            &self.credentials,
            &self.host,
            self.service,
            action,
            payload,
            at,
        )
    }
}

/// Builds the `Authorization` header value for one request.
pub fn sign(
    credentials: &TencentCredentials,
    host: &str,
    service: &str,
    action: &str,
    payload: &str,
    at: DateTime<Utc>,
) -> Result<String, TencentCloudError> {
    let timestamp = at.timestamp();
    let date = at.format("%Y-%m-%d").to_string();

    let canonical_request = format!(
        "POST\n/\n\ncontent-type:{CONTENT_TYPE}\nhost:{host}\nx-tc-action:{}\n\n{SIGNED_HEADERS}\n{}",
        action.to_lowercase(),
        hex::encode(Sha256::digest(payload.as_bytes())),
    );

    let scope = format!("{date}/{service}/tc3_request");
    let string_to_sign = format!(
        "{ALGORITHM}\n{timestamp}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes())),
    );

    let secret_date = hmac_sha256(format!("TC3{}", credentials.secret_key).as_bytes(), &date)?;
    let secret_service = hmac_sha256(&secret_date, service)?;
    let secret_signing = hmac_sha256(&secret_service, "tc3_request")?;
    let signature = hex::encode(hmac_sha256(&secret_signing, &string_to_sign)?);

    Ok(format!(
        "{ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
        credentials.secret_id
    ))
}

fn hmac_sha256(key: &[u8], message: &str) -> Result<Vec<u8>, TencentCloudError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| TencentCloudError::Signing)?;
    mac.update(message.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Response")]
    response: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}
