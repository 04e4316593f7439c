//! Shared helpers for the mock-server tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use serde_json::json;
use stratus_core::resource::Value;
use stratus_provider_huaweicloud::{HuaweiCloudProvider, PollSettings, ProviderConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const PROJECT: &str = "proj-1";
pub const TOKEN: &str = "test-token";

pub fn fast_poll() -> PollSettings {
    PollSettings {
        job_delay: Duration::from_millis(10),
        job_interval: Duration::from_millis(10),
        toggle_delay: Duration::from_millis(10),
        toggle_interval: Duration::from_millis(10),
        lifecycle_interval: Duration::from_millis(10),
        create_timeout: Duration::from_secs(5),
        update_timeout: Duration::from_secs(5),
        endpoint_timeout: Duration::from_secs(5),
    }
}

pub fn provider(server: &MockServer) -> HuaweiCloudProvider {
    provider_with_poll(server, fast_poll())
}

pub fn provider_with_poll(server: &MockServer, poll: PollSettings) -> HuaweiCloudProvider {
    provider_with(server, poll, &[])
}

/// Provider with extra configuration attributes
pub fn provider_with(
    server: &MockServer,
    poll: PollSettings,
    extra: &[(&str, &str)],
) -> HuaweiCloudProvider {
    let _ = env_logger::builder().is_test(true).try_init();

    let uri = server.uri();
    let base = [
        ("region", "cn-north-4"),
        ("project_id", PROJECT),
        ("auth_token", TOKEN),
        ("endpoint", uri.as_str()),
    ];
    let attributes: HashMap<String, Value> = base
        .iter()
        .chain(extra.iter())
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect();

    let config = ProviderConfig::from_attributes(&attributes)
        .unwrap()
        .with_poll_settings(poll);
    HuaweiCloudProvider::new(config).unwrap()
}

pub fn api_path(suffix: &str) -> String {
    format!("/v2/{}/{}", PROJECT, suffix)
}

/// Mount a GET handler answering `body` with 200
pub async fn mount_get(server: &MockServer, suffix: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(api_path(suffix)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount a GET handler answering `body` for the first `times` requests only
pub async fn mount_get_times(
    server: &MockServer,
    suffix: &str,
    body: serde_json::Value,
    times: u64,
) {
    Mock::given(method("GET"))
        .and(path(api_path(suffix)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

/// Mount the auxiliary reads of an instance
pub async fn mount_instance_reads(server: &MockServer, instance_id: &str, access_status: &str) {
    mount_get(
        server,
        &format!("instances/{}", instance_id),
        json!({
            "id": instance_id,
            "name": "registry",
            "spec": "swr.ee.professional",
            "vpc_id": "vpc-1",
            "subnet_id": "subnet-1",
            "enterprise_project_id": "0",
            "status": "Running",
            "version": "v2.10",
            "charge_mode": "postPaid",
            "access_address": "registry.swr-pro.myhuaweicloud.com",
            "user_def_obs": false,
            "anonymous_access": false,
        }),
    )
    .await;
    mount_get(
        server,
        &format!("instances/{}/configurations", instance_id),
        json!({"anonymous_access": false}),
    )
    .await;
    mount_get(
        server,
        &format!("instances/{}/endpoint-policy", instance_id),
        json!({"status": access_status, "ip_list": []}),
    )
    .await;
    mount_get(
        server,
        &format!("instances/{}/tags", instance_id),
        json!({"tags": [{"key": "env", "value": "prod"}]}),
    )
    .await;
}

/// Requests received for `suffix`, in arrival order
pub async fn requests_to(server: &MockServer, http_method: &str, suffix: &str) -> Vec<Request> {
    let wanted = api_path(suffix);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.to_string() == http_method && r.url.path() == wanted)
        .collect()
}

/// Position of the first matching request among everything the server received
pub async fn position_of(server: &MockServer, http_method: &str, suffix: &str) -> Option<usize> {
    let wanted = api_path(suffix);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .position(|r| r.method.to_string() == http_method && r.url.path() == wanted)
}

pub fn body_of(request: &Request) -> serde_json::Value {
    serde_json::from_slice(&request.body).unwrap()
}
