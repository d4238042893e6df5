//! Tencent SSL certificate client against a mocked API endpoint.

use certkeeper_cloud::{
    CaError, CaStatus, CertificateAuthority, TencentCloudClient, TencentCredentials, TencentSsl,
};
use certkeeper_common::params::ValidationMethod;
use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ca(server: &MockServer) -> TencentSsl {
    let client = TencentCloudClient::ssl(
        &server.uri(),
        "ap-beijing",
        TencentCredentials::new("AKID", "secret"),
    )
    .unwrap();
    TencentSsl::new(client)
}

fn respond(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "Response": body }))
}

#[tokio::test]
async fn test_apply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "ApplyCertificate"))
        .and(header("X-TC-Version", "2019-12-05"))
        .and(header("X-TC-Region", "ap-beijing"))
        .and(body_json(json!({
            "DvAuthMethod": "DNS_AUTO",
            "DomainName": "example.com",
            "Alias": "site"
        })))
        .respond_with(respond(json!({ "CertificateId": "C1", "RequestId": "r" })))
        .expect(1)
        .mount(&server)
        .await;

    let id = ca(&server)
        .apply("example.com", ValidationMethod::DnsAuto, Some("site"))
        .await
        .unwrap();
    assert_eq!(id, "C1");
}

#[tokio::test]
async fn test_apply_omits_empty_alias() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "ApplyCertificate"))
        .and(body_json(json!({ "DvAuthMethod": "DNS", "DomainName": "example.com" })))
        .respond_with(respond(json!({ "CertificateId": "C1", "RequestId": "r" })))
        .expect(1)
        .mount(&server)
        .await;

    ca(&server)
        .apply("example.com", ValidationMethod::Dns, Some(""))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_apply_rejection_is_surfaced_verbatim() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "ApplyCertificate"))
        .respond_with(respond(json!({
            "Error": { "Code": "FailedOperation.ExceedsFreeLimit", "Message": "quota" },
            "RequestId": "r"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = ca(&server)
        .apply("example.com", ValidationMethod::DnsAuto, None)
        .await
        .unwrap_err();
    match err {
        CaError::Api { code, message } => {
            assert_eq!(code, "FailedOperation.ExceedsFreeLimit");
            assert_eq!(message, "quota");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_describe() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeCertificateDetail"))
        .and(body_json(json!({ "CertificateId": "C1" })))
        .respond_with(respond(json!({
            "CertificateId": "C1",
            "Status": 1,
            "Domain": "example.com",
            "Alias": "site",
            "CertEndTime": "2026-01-31 23:59:59",
            "DvAuthDetail": {
                "DvAuthKey": "_dnsauth",
                "DvAuthValue": "abc123",
                "DvAuthDomain": "example.com"
            },
            "RequestId": "r"
        })))
        .mount(&server)
        .await;

    let detail = ca(&server).describe("C1").await.unwrap();
    assert_eq!(detail.status, CaStatus::Issued);
    assert_eq!(detail.domain, "example.com");
    assert_eq!(detail.alias.as_deref(), Some("site"));
    assert_eq!(
        detail.expires_at,
        Some(Utc.with_ymd_and_hms(2026, 1, 31, 23, 59, 59).unwrap())
    );
    let dv = detail.dv_auth.unwrap();
    assert_eq!(dv.key, "_dnsauth");
    assert_eq!(dv.value, "abc123");
}

#[tokio::test]
async fn test_describe_unknown_status_and_missing_fields() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeCertificateDetail"))
        .respond_with(respond(json!({
            "CertificateId": "C1",
            "Status": 42,
            "Domain": "example.com",
            "CertEndTime": null,
            "DvAuthDetail": null,
            "RequestId": "r"
        })))
        .mount(&server)
        .await;

    let detail = ca(&server).describe("C1").await.unwrap();
    assert_eq!(detail.status, CaStatus::Unknown);
    assert!(!detail.status.is_terminal());
    assert!(detail.expires_at.is_none());
    assert!(detail.dv_auth.is_none());
}

#[tokio::test]
async fn test_download() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DownloadCertificate"))
        .respond_with(respond(json!({
            "Content": "UEsDBA==",
            "ContentType": "application/zip",
            "RequestId": "r"
        })))
        .mount(&server)
        .await;

    assert_eq!(ca(&server).download("C1").await.unwrap(), "UEsDBA==");
}

#[tokio::test]
async fn test_revoke_sends_reason() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "RevokeCertificate"))
        .and(body_json(json!({ "CertificateId": "C1", "Reason": "superseded" })))
        .respond_with(respond(json!({ "RequestId": "r" })))
        .expect(1)
        .mount(&server)
        .await;

    ca(&server).revoke("C1", "superseded").await.unwrap();
}

#[tokio::test]
async fn test_revoke_of_missing_certificate_is_ok() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "RevokeCertificate"))
        .respond_with(respond(json!({
            "Error": { "Code": "InvalidParameter.CertificateNotFound", "Message": "gone" },
            "RequestId": "r"
        })))
        .mount(&server)
        .await;

    ca(&server).revoke("C1", "superseded").await.unwrap();
}

#[tokio::test]
async fn test_revoke_other_failures_propagate() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "RevokeCertificate"))
        .respond_with(respond(json!({
            "Error": { "Code": "InternalError", "Message": "boom" },
            "RequestId": "r"
        })))
        .mount(&server)
        .await;

    let err = ca(&server).revoke("C1", "superseded").await.unwrap_err();
    assert!(matches!(err, CaError::Api { code, .. } if code == "InternalError"));
}

#[tokio::test]
async fn test_cancel_revoke() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "CancelRevoke"))
        .and(body_json(json!({ "CertificateId": "C1" })))
        .respond_with(respond(json!({ "RequestId": "r" })))
        .expect(1)
        .mount(&server)
        .await;

    ca(&server).cancel_revoke("C1").await.unwrap();
}

#[tokio::test]
async fn test_list_pages_until_total() {
    let server = MockServer::start().await;

    let first_page: Vec<_> = (0..100)
        .map(|i| json!({ "CertificateId": format!("A{i}"), "Domain": "a.com", "Status": 1 }))
        .collect();

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeCertificates"))
        .and(body_partial_json(json!({ "Offset": 0, "Limit": 100 })))
        .respond_with(respond(json!({
            "TotalCount": 101,
            "Certificates": first_page,
            "RequestId": "r"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeCertificates"))
        .and(body_partial_json(json!({ "Offset": 100, "Limit": 100 })))
        .respond_with(respond(json!({
            "TotalCount": 101,
            "Certificates": [
                { "CertificateId": "B", "Domain": "b.com", "Alias": "bee", "Status": 9,
                  "CertEndTime": "2026-05-01 00:00:00" }
            ],
            "RequestId": "r"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let listed = ca(&server).list().await.unwrap();
    assert_eq!(listed.len(), 101);
    let last = listed.last().unwrap();
    assert_eq!(last.certificate_id, "B");
    assert_eq!(last.alias, "bee");
    assert_eq!(last.status, CaStatus::Revoking);
    assert!(last.expires_at.is_some());
}

#[tokio::test]
async fn test_undecodable_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = ca(&server).describe("C1").await.unwrap_err();
    assert!(matches!(err, CaError::Decode(_)));
}
