//! SWR Enterprise instances data source against a mock server

mod common;

use serde_json::json;
use stratus_core::provider::Provider;
use stratus_core::resource::{Resource, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

fn data_source() -> Resource {
    Resource::new("swr_enterprise_instances", "all").with_read_only(true)
}

fn listed(state_value: Option<&Value>) -> Vec<String> {
    let Some(Value::List(items)) = state_value else {
        panic!("Expected instances list, got {:?}", state_value);
    };
    items
        .iter()
        .map(|item| match item {
            Value::Map(map) => match map.get("id") {
                Some(Value::String(id)) => id.clone(),
                other => panic!("Expected id, got {:?}", other),
            },
            other => panic!("Expected map, got {:?}", other),
        })
        .collect()
}

fn instance(id: String, name: &str, status: &str) -> serde_json::Value {
    json!({"id": id, "name": name, "status": status, "spec": "swr.ee.professional"})
}

fn page_of(ids: std::ops::Range<usize>) -> serde_json::Value {
    let instances: Vec<_> = ids
        .map(|i| instance(format!("ins-{}", i), "registry", "Running"))
        .collect();
    json!({ "instances": instances })
}

/// Answer the page requested at `offset` with `body`, once
async fn mount_page(server: &MockServer, offset: usize, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(api_path("instances")))
        .and(query_param("limit", "100"))
        .and(query_param("offset", offset.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn lists_every_page() {
    let server = MockServer::start().await;
    mount_page(&server, 0, page_of(0..100)).await;
    mount_page(&server, 100, page_of(100..101)).await;
    mount_page(&server, 101, json!({"instances": []})).await;

    let state = provider(&server)
        .read_data_source(&data_source())
        .await
        .unwrap();

    let ids = listed(state.attributes.get("instances"));
    assert_eq!(ids.len(), 101);
    assert_eq!(ids.first().map(String::as_str), Some("ins-0"));
    assert_eq!(ids.last().map(String::as_str), Some("ins-100"));
}

#[tokio::test]
async fn short_pages_do_not_end_the_listing() {
    let server = MockServer::start().await;
    // server caps pages at 50 items whatever limit is asked for
    mount_page(&server, 0, page_of(0..50)).await;
    mount_page(&server, 50, page_of(50..70)).await;
    mount_page(&server, 70, json!({"instances": []})).await;

    let state = provider(&server)
        .read_data_source(&data_source())
        .await
        .unwrap();

    let ids = listed(state.attributes.get("instances"));
    assert_eq!(ids.len(), 70);
    assert_eq!(ids.last().map(String::as_str), Some("ins-69"));
}

#[tokio::test]
async fn instances_with_null_fields_are_listed() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        0,
        json!({
            "instances": [
                {"id": "ins-1", "name": "registry", "version": null, "vpc_id": null},
                {"id": "ins-2", "name": "mirror"},
            ],
        }),
    )
    .await;
    mount_page(&server, 2, json!({"instances": []})).await;

    let state = provider(&server)
        .read_data_source(&data_source())
        .await
        .unwrap();

    assert_eq!(
        listed(state.attributes.get("instances")),
        vec!["ins-1", "ins-2"]
    );
    let Some(Value::List(items)) = state.attributes.get("instances") else {
        panic!("Expected instances list");
    };
    let Value::Map(first) = &items[0] else {
        panic!("Expected map");
    };
    assert_eq!(first.get("version"), Some(&Value::from("")));
}

#[tokio::test]
async fn undecodable_instance_is_reported() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        0,
        json!({"instances": [{"id": "ins-1", "name": ["not", "a", "string"]}]}),
    )
    .await;
    mount_page(&server, 1, json!({"instances": []})).await;

    let err = provider(&server)
        .read_data_source(&data_source())
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Error querying SWR instances"), "{}", message);
    assert!(message.contains("Failed to decode response"), "{}", message);
}

#[tokio::test]
async fn filters_by_name_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("instances")))
        .and(query_param("name", "registry"))
        .and(query_param("status", "Running"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "instances": [
                instance("ins-1".to_string(), "registry", "Running"),
                instance("ins-2".to_string(), "registry", "Creating"),
                instance("ins-3".to_string(), "registry-old", "Running"),
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("instances")))
        .and(query_param("name", "registry"))
        .and(query_param("status", "Running"))
        .and(query_param("offset", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"instances": []})))
        .expect(1)
        .mount(&server)
        .await;

    let resource = data_source()
        .with_attribute("name", "registry")
        .with_attribute("status", "Running");
    let state = provider(&server).read_data_source(&resource).await.unwrap();

    assert_eq!(listed(state.attributes.get("instances")), vec!["ins-1"]);
    assert_eq!(state.get_str("name"), Some("registry"));
}

#[tokio::test]
async fn empty_listing() {
    let server = MockServer::start().await;
    mount_get(&server, "instances", json!({"instances": []})).await;

    let state = provider(&server)
        .read_data_source(&data_source())
        .await
        .unwrap();
    assert!(listed(state.attributes.get("instances")).is_empty());
    assert_eq!(requests_to(&server, "GET", "instances").await.len(), 1);
}

#[tokio::test]
async fn listing_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("instances")))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error_code": "SWR.0403",
            "error_msg": "Forbidden",
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .read_data_source(&data_source())
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Error querying SWR instances"), "{}", message);
    assert!(message.contains("Forbidden"), "{}", message);
}
