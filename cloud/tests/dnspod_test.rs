//! DNSPod adapter against a mocked Tencent Cloud endpoint.

use certkeeper_cloud::{
    DeleteOutcome, DnsProvider, DnsProviderError, Dnspod, TencentCloudClient, TencentCredentials,
    TxtRecord,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RECORD: TxtRecord<'static> = TxtRecord {
    domain: "*.example.com",
    name: "_dnsauth",
    value: "202501010000001abc",
};

fn provider(server: &MockServer) -> Dnspod {
    let client =
        TencentCloudClient::dnspod(&server.uri(), TencentCredentials::new("AKID", "secret"))
            .unwrap();
    Dnspod::new(client)
}

#[tokio::test]
async fn test_delete_matching_record() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("X-TC-Action", "DescribeRecordList"))
        .and(header("X-TC-Version", "2021-03-23"))
        .and(header_exists("Authorization"))
        .and(body_partial_json(json!({
            "Domain": "example.com",
            "RecordType": "TXT",
            "Limit": 3000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": {
                "RecordCountInfo": { "TotalCount": 2 },
                "RecordList": [
                    { "RecordId": 11, "Name": "_dnsauth", "Value": "old", "Type": "TXT" },
                    { "RecordId": 12, "Name": "_dnsauth", "Value": "202501010000001abc", "Type": "TXT" }
                ],
                "RequestId": "req-1"
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DeleteRecord"))
        .and(body_partial_json(json!({ "Domain": "example.com", "RecordId": 12 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": { "RequestId": "req-2" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = provider(&server).delete_validation_record(RECORD).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
}

#[tokio::test]
async fn test_no_data_of_record_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeRecordList"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": {
                "Error": {
                    "Code": "ResourceNotFound.NoDataOfRecord",
                    "Message": "记录列表为空。"
                },
                "RequestId": "req-1"
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DeleteRecord"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = provider(&server).delete_validation_record(RECORD).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::NotFound);
}

#[tokio::test]
async fn test_value_mismatch_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeRecordList"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": {
                "RecordList": [
                    { "RecordId": 11, "Name": "_dnsauth", "Value": "someone-else", "Type": "TXT" }
                ],
                "RequestId": "req-1"
            }
        })))
        .mount(&server)
        .await;

    let outcome = provider(&server).delete_validation_record(RECORD).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::NotFound);
}

#[tokio::test]
async fn test_listing_error_propagates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeRecordList"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": {
                "Error": { "Code": "AuthFailure.SecretIdNotFound", "Message": "no such key" },
                "RequestId": "req-1"
            }
        })))
        .mount(&server)
        .await;

    let err = provider(&server).delete_validation_record(RECORD).await.unwrap_err();
    assert!(matches!(err, DnsProviderError::Authentication(_)));
}

#[tokio::test]
async fn test_create_record() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "CreateRecord"))
        .and(body_partial_json(json!({
            "Domain": "example.com",
            "SubDomain": "_dnsauth",
            "RecordType": "TXT",
            "RecordLine": "默认",
            "Value": "202501010000001abc",
            "TTL": 600
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": { "RecordId": 99, "RequestId": "req-1" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    provider(&server).create_validation_record(RECORD).await.unwrap();
}
