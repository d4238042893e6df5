//! Cloudflare adapter against a mocked v4 API.

use std::time::Duration;

use certkeeper_cloud::{Cloudflare, DeleteOutcome, DnsProvider, DnsProviderError, TxtRecord};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RECORD: TxtRecord<'static> = TxtRecord {
    domain: "www.example.com",
    name: "_dnsauth",
    value: "202501010000001abc",
};

fn provider(server: &MockServer) -> Cloudflare {
    Cloudflare::new("cf-token", &server.uri(), Duration::from_secs(5)).unwrap()
}

async fn mount_zone(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("name", "example.com"))
        .and(header("authorization", "Bearer cf-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": [{ "id": "zone-1", "name": "example.com" }]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_delete_matching_record() {
    let server = MockServer::start().await;
    mount_zone(&server).await;

    Mock::given(method("GET"))
        .and(path("/zones/zone-1/dns_records"))
        .and(query_param("type", "TXT"))
        .and(query_param("name", "_dnsauth.example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": [
                { "id": "rec-other", "name": "_dnsauth.example.com", "content": "stale" },
                { "id": "rec-1", "name": "_dnsauth.example.com", "content": "\"202501010000001abc\"" }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/zones/zone-1/dns_records/rec-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": { "id": "rec-1" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = provider(&server).delete_validation_record(RECORD).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
}

#[tokio::test]
async fn test_delete_absent_record_is_not_found() {
    let server = MockServer::start().await;
    mount_zone(&server).await;

    Mock::given(method("GET"))
        .and(path("/zones/zone-1/dns_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": []
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = provider(&server).delete_validation_record(RECORD).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::NotFound);
}

#[tokio::test]
async fn test_delete_racing_404_is_not_found() {
    let server = MockServer::start().await;
    mount_zone(&server).await;

    Mock::given(method("GET"))
        .and(path("/zones/zone-1/dns_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": [{ "id": "rec-1", "name": "_dnsauth.example.com", "content": "202501010000001abc" }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/zones/zone-1/dns_records/rec-1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "errors": [{ "code": 81044, "message": "Record does not exist." }],
            "result": null
        })))
        .mount(&server)
        .await;

    let outcome = provider(&server).delete_validation_record(RECORD).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::NotFound);
}

#[tokio::test]
async fn test_zone_is_cached() {
    let server = MockServer::start().await;
    mount_zone(&server).await;

    Mock::given(method("GET"))
        .and(path("/zones/zone-1/dns_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": []
        })))
        .expect(2)
        .mount(&server)
        .await;

    let provider = provider(&server);
    provider.delete_validation_record(RECORD).await.unwrap();
    provider.delete_validation_record(RECORD).await.unwrap();
}

#[tokio::test]
async fn test_unknown_zone() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/zones"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": []
        })))
        .mount(&server)
        .await;

    let err = provider(&server).delete_validation_record(RECORD).await.unwrap_err();
    assert!(matches!(err, DnsProviderError::ZoneNotFound { domain } if domain == "example.com"));
}

#[tokio::test]
async fn test_bad_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/zones"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "errors": [{ "code": 9109, "message": "Invalid access token" }],
            "result": null
        })))
        .mount(&server)
        .await;

    let err = provider(&server).delete_validation_record(RECORD).await.unwrap_err();
    assert!(matches!(err, DnsProviderError::Authentication(_)));
}

#[tokio::test]
async fn test_create_record() {
    let server = MockServer::start().await;
    mount_zone(&server).await;

    Mock::given(method("POST"))
        .and(path("/zones/zone-1/dns_records"))
        .and(body_partial_json(json!({
            "type": "TXT",
            "name": "_dnsauth.example.com",
            "content": "202501010000001abc"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": { "id": "rec-new", "name": "_dnsauth.example.com", "content": "202501010000001abc" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    provider(&server).create_validation_record(RECORD).await.unwrap();
}

#[tokio::test]
async fn test_create_record_rejected() {
    let server = MockServer::start().await;
    mount_zone(&server).await;

    Mock::given(method("POST"))
        .and(path("/zones/zone-1/dns_records"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "errors": [{ "code": 81057, "message": "Record already exists." }],
            "result": null
        })))
        .mount(&server)
        .await;

    let err = provider(&server).create_validation_record(RECORD).await.unwrap_err();
    assert!(matches!(err, DnsProviderError::RecordCreation { .. }));
}
