//! Status checks polled by the SWR waiters
//!
//! Each check performs one GET and reports the vendor status string
//! together with the full response body.

use serde::Deserialize;
use stratus_core::waiter::Observation;

use crate::client::{ClientError, ClientResult, ServiceClient};
use crate::response::null_as_default;

pub const JOB_URL: &str = "v2/{project_id}/jobs/{job_id}";
pub const ENDPOINT_POLICY_URL: &str = "v2/{project_id}/instances/{instance_id}/endpoint-policy";
pub const INTERNAL_ENDPOINT_URL: &str =
    "v2/{project_id}/instances/{instance_id}/internal-endpoints/{id}";

/// Status of a vendor job
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
}

/// Public network access control of an instance
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointPolicy {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ip_list: Vec<WhiteIp>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WhiteIp {
    pub ip: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Private network endpoint of an instance
#[derive(Debug, Clone, Deserialize)]
pub struct InternalEndpoint {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
}

fn decode<T: for<'de> Deserialize<'de>>(url: &str, body: &serde_json::Value) -> ClientResult<T> {
    serde_json::from_value(body.clone()).map_err(|source| ClientError::Decode {
        url: url.to_string(),
        source,
    })
}

/// `GET /v2/{project_id}/jobs/{job_id}`
pub async fn job_status(client: &ServiceClient, job_id: &str) -> ClientResult<Observation> {
    let url = client.url(JOB_URL, &[("job_id", job_id)])?;
    let body = client.get(&url).await?;
    let job: JobStatus = decode(&url, &body)?;
    Ok(Observation::new(job.status, body))
}

/// `GET /v2/{project_id}/instances/{instance_id}/endpoint-policy`
pub async fn endpoint_policy_status(
    client: &ServiceClient,
    instance_id: &str,
) -> ClientResult<Observation> {
    let url = client.url(ENDPOINT_POLICY_URL, &[("instance_id", instance_id)])?;
    let body = client.get(&url).await?;
    let policy: EndpointPolicy = decode(&url, &body)?;
    Ok(Observation::new(policy.status, body))
}

/// `GET /v2/{project_id}/instances/{instance_id}/internal-endpoints/{id}`
///
/// A deleted endpoint surfaces as [`ClientError::NotFound`].
pub async fn internal_endpoint_status(
    client: &ServiceClient,
    instance_id: &str,
    id: &str,
) -> ClientResult<Observation> {
    let url = client.url(
        INTERNAL_ENDPOINT_URL,
        &[("instance_id", instance_id), ("id", id)],
    )?;
    let body = client.get(&url).await?;
    let endpoint: InternalEndpoint = decode(&url, &body)?;
    Ok(Observation::new(endpoint.status, body))
}

/// Typed view of an endpoint policy payload returned by a wait
pub fn endpoint_policy(body: &serde_json::Value) -> Option<EndpointPolicy> {
    serde_json::from_value(body.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_endpoint_policy() {
        let body = json!({
            "status": "Enable",
            "ip_list": [
                {"ip": "10.0.0.1", "description": "office"},
                {"ip": "10.0.1.0/24"},
            ],
        });
        let policy = endpoint_policy(&body).unwrap();
        assert_eq!(policy.status, "Enable");
        assert_eq!(
            policy.ip_list[1],
            WhiteIp {
                ip: "10.0.1.0/24".to_string(),
                description: None,
            }
        );
    }

    #[test]
    fn missing_status_decodes_as_empty() {
        let job: JobStatus = decode("https://x", &json!({"job_id": "j-1"})).unwrap();
        assert_eq!(job.status, "");

        let endpoint: InternalEndpoint = decode("https://x", &json!({})).unwrap();
        assert_eq!(endpoint.status, "");
    }

    #[test]
    fn null_status_decodes_as_pending() {
        let job: JobStatus = decode("https://x", &json!({"status": null})).unwrap();
        assert_eq!(job.status, "");

        let policy: EndpointPolicy =
            decode("https://x", &json!({"status": null, "ip_list": null})).unwrap();
        assert_eq!(policy.status, "");
        assert!(policy.ip_list.is_empty());
    }

    #[test]
    fn null_body_is_a_decode_error() {
        let result: ClientResult<JobStatus> = decode("https://x", &serde_json::Value::Null);
        assert!(matches!(result, Err(ClientError::Decode { .. })));
    }
}
