//! Cloudflare backend against a mock API server
//!
//! Verifies the request shape of every capability call and the mapping of
//! error statuses and `success: false` envelopes.

use portmap_core::Error;
use portmap_core::traits::{AliasRecord, DnsRecords, IngressRule, TunnelAdmin, ZoneLookup};
use portmap_provider_cloudflare::CloudflareProvider;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";
const ACCOUNT: &str = "acct-1";

async fn setup(dry_run: bool) -> (MockServer, CloudflareProvider) {
    let server = MockServer::start().await;
    let provider = CloudflareProvider::new(TOKEN, ACCOUNT, dry_run)
        .unwrap()
        .with_api_base(server.uri());
    (server, provider)
}

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": result,
    }))
}

#[tokio::test]
async fn find_zone_returns_first_match() {
    let (server, provider) = setup(false).await;

    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("name", "example.com"))
        .and(query_param("account.id", ACCOUNT))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ok(json!([{"id": "zone-1", "name": "example.com"}])))
        .expect(1)
        .mount(&server)
        .await;

    let zone = provider.find_zone(ACCOUNT, "example.com").await.unwrap();
    assert_eq!(zone.as_deref(), Some("zone-1"));
}

#[tokio::test]
async fn find_zone_empty_listing_is_none() {
    let (server, provider) = setup(false).await;

    Mock::given(method("GET"))
        .and(path("/zones"))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;

    assert_eq!(provider.find_zone(ACCOUNT, "example.org").await.unwrap(), None);
}

#[tokio::test]
async fn list_records_filters_by_exact_name_and_type() {
    let (server, provider) = setup(false).await;

    Mock::given(method("GET"))
        .and(path("/zones/zone-1/dns_records"))
        .and(query_param("name.exact", "app.example.com"))
        .and(query_param("type", "CNAME"))
        .respond_with(ok(json!([
            {"id": "r1", "name": "app.example.com", "type": "CNAME", "content": "T1.cfargotunnel.com", "proxied": true},
            {"id": "r2", "name": "app.example.com", "type": "CNAME", "content": "T2.cfargotunnel.com"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let records = provider
        .list_records("zone-1", "app.example.com", "CNAME")
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "r1");
    assert!(records[0].proxied);
    assert!(!records[1].proxied);
}

#[tokio::test]
async fn create_record_posts_proxied_cname() {
    let (server, provider) = setup(false).await;

    Mock::given(method("POST"))
        .and(path("/zones/zone-1/dns_records"))
        .and(body_json(json!({
            "type": "CNAME",
            "name": "app.example.com",
            "content": "T1.cfargotunnel.com",
            "proxied": true,
            "ttl": 1
        })))
        .respond_with(ok(json!({"id": "r9", "name": "app.example.com"})))
        .expect(1)
        .mount(&server)
        .await;

    let id = provider
        .create_record(
            "zone-1",
            &AliasRecord::cname("app.example.com", "T1.cfargotunnel.com"),
        )
        .await
        .unwrap();
    assert_eq!(id, "r9");
}

#[tokio::test]
async fn update_and_delete_record() {
    let (server, provider) = setup(false).await;

    Mock::given(method("PUT"))
        .and(path("/zones/zone-1/dns_records/r1"))
        .respond_with(ok(json!({"id": "r1", "name": "app.example.com"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/zones/zone-1/dns_records/r1"))
        .respond_with(ok(json!({"id": "r1"})))
        .expect(1)
        .mount(&server)
        .await;

    provider
        .update_record(
            "zone-1",
            "r1",
            &AliasRecord::cname("app.example.com", "T1.cfargotunnel.com"),
        )
        .await
        .unwrap();
    provider.delete_record("zone-1", "r1").await.unwrap();
}

#[tokio::test]
async fn list_tunnels_excludes_deleted() {
    let (server, provider) = setup(false).await;

    Mock::given(method("GET"))
        .and(path("/accounts/acct-1/cfd_tunnel"))
        .and(query_param("name", "mytunnel"))
        .and(query_param("is_deleted", "false"))
        .respond_with(ok(json!([{"id": "T1", "name": "mytunnel", "status": "healthy"}])))
        .expect(1)
        .mount(&server)
        .await;

    let tunnels = provider.list_tunnels(ACCOUNT, "mytunnel").await.unwrap();
    assert_eq!(tunnels.len(), 1);
    assert_eq!(tunnels[0].id, "T1");
}

#[tokio::test]
async fn update_ingress_returns_confirmed_tunnel_id() {
    let (server, provider) = setup(false).await;

    Mock::given(method("PUT"))
        .and(path("/accounts/acct-1/cfd_tunnel/T1/configurations"))
        .and(body_json(json!({
            "config": {
                "ingress": [
                    {"hostname": "app.example.com", "service": "http://10.0.0.5:3000"},
                    {"service": "http_status:404"}
                ],
                "originRequest": {}
            }
        })))
        .respond_with(ok(json!({"tunnel_id": "T1-confirmed", "version": 3})))
        .expect(1)
        .mount(&server)
        .await;

    let confirmed = provider
        .update_ingress(
            ACCOUNT,
            "T1",
            &[
                IngressRule::new("app.example.com", "http://10.0.0.5:3000"),
                IngressRule::new("", "http_status:404"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(confirmed, "T1-confirmed");
}

#[tokio::test]
async fn auth_failure_is_reported() {
    let (server, provider) = setup(false).await;

    Mock::given(method("GET"))
        .and(path("/zones"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let err = provider.find_zone(ACCOUNT, "example.com").await.unwrap_err();
    assert!(matches!(err, Error::Provider { .. }));
    assert!(err.to_string().contains("authentication failed"), "got {err}");
}

#[tokio::test]
async fn server_error_is_transient() {
    let (server, provider) = setup(false).await;

    Mock::given(method("GET"))
        .and(path("/accounts/acct-1/cfd_tunnel"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = provider.list_tunnels(ACCOUNT, "mytunnel").await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("transient"), "got {msg}");
    assert!(msg.contains("maintenance"), "got {msg}");
}

#[tokio::test]
async fn unsuccessful_envelope_is_an_error() {
    let (server, provider) = setup(false).await;

    Mock::given(method("DELETE"))
        .and(path("/zones/zone-1/dns_records/r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "errors": [{"code": 81044, "message": "Record does not exist."}],
            "result": null
        })))
        .mount(&server)
        .await;

    let err = provider.delete_record("zone-1", "r1").await.unwrap_err();
    assert!(err.to_string().contains("[81044] Record does not exist."), "got {err}");
}

#[tokio::test]
async fn malformed_body_is_an_error() {
    let (server, provider) = setup(false).await;

    Mock::given(method("GET"))
        .and(path("/zones"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = provider.find_zone(ACCOUNT, "example.com").await.unwrap_err();
    assert!(err.to_string().contains("invalid response for zone lookup"), "got {err}");
}

#[tokio::test]
async fn dry_run_skips_mutations() {
    let (server, provider) = setup(true).await;

    Mock::given(method("GET"))
        .and(path("/accounts/acct-1/cfd_tunnel"))
        .respond_with(ok(json!([{"id": "T1", "name": "mytunnel"}])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    assert_eq!(provider.list_tunnels(ACCOUNT, "mytunnel").await.unwrap().len(), 1);
    assert_eq!(
        provider
            .update_ingress(ACCOUNT, "T1", &[IngressRule::new("", "http_status:404")])
            .await
            .unwrap(),
        "T1"
    );
    assert_eq!(
        provider
            .create_record("zone-1", &AliasRecord::cname("a.example.com", "T1.cfargotunnel.com"))
            .await
            .unwrap(),
        "dry-run"
    );
    provider.delete_record("zone-1", "r1").await.unwrap();
}
