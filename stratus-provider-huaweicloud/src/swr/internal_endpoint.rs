//! Private network endpoints of an SWR Enterprise instance
//!
//! Identifier format: `{instance_id}/{endpoint_id}`.

use serde_json::json;
use stratus_core::provider::{ProviderError, ProviderResult};
use stratus_core::resource::{Resource, ResourceId, State, Value};
use stratus_core::waiter::StatusCheckError;

use super::status::INTERNAL_ENDPOINT_URL;
use super::{SwrService, provider_error};
use crate::client::{Method, RequestOpts};
use crate::resources::{attributes_from_response, internal_endpoint_schema};
use crate::response::require_str;

const INTERNAL_ENDPOINTS_URL: &str = "v2/{project_id}/instances/{instance_id}/internal-endpoints";

/// Split an identifier into instance ID and endpoint ID
pub fn parse_identifier(identifier: &str) -> Option<(&str, &str)> {
    identifier
        .split_once('/')
        .filter(|(instance_id, id)| !instance_id.is_empty() && !id.is_empty() && !id.contains('/'))
}

pub fn format_identifier(instance_id: &str, id: &str) -> String {
    format!("{}/{}", instance_id, id)
}

fn invalid_identifier(id: &ResourceId, identifier: &str) -> ProviderError {
    ProviderError::new(format!(
        "Invalid identifier '{}': expected <instance_id>/<endpoint_id>",
        identifier
    ))
    .for_resource(id.clone())
}

impl SwrService {
    /// Create an endpoint and wait until it is running
    pub async fn create_internal_endpoint(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let instance_id = resource.get_str("instance_id").unwrap_or_default();
        let url = self
            .client
            .url(INTERNAL_ENDPOINTS_URL, &[("instance_id", instance_id)])
            .map_err(|e| provider_error(id, "Error creating SWR internal endpoint", e))?;

        let body = json!({
            "vpc_id": resource.get_str("vpc_id"),
            "subnet_id": resource.get_str("subnet_id"),
        });
        let endpoint_id = self
            .client
            .request(Method::Post, &url, RequestOpts::new().with_body(body))
            .await
            .and_then(|created| require_str("id", &created, &url))
            .map_err(|e| provider_error(id, "Error creating SWR internal endpoint", e))?;
        log::info!(
            "SWR internal endpoint {} created for instance {}",
            endpoint_id,
            instance_id
        );

        self.wait_for_internal_endpoint_created(instance_id, &endpoint_id)
            .await
            .map_err(|e| {
                provider_error(
                    id,
                    format!(
                        "Error waiting for SWR internal endpoint ({}) to become running",
                        endpoint_id
                    ),
                    e,
                )
            })?;

        let identifier = format_identifier(instance_id, &endpoint_id);
        self.read_internal_endpoint(id, &identifier).await
    }

    pub async fn read_internal_endpoint(
        &self,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        let (instance_id, endpoint_id) =
            parse_identifier(identifier).ok_or_else(|| invalid_identifier(id, identifier))?;
        let url = self
            .client
            .url(
                INTERNAL_ENDPOINT_URL,
                &[("instance_id", instance_id), ("id", endpoint_id)],
            )
            .map_err(|e| provider_error(id, "Error retrieving SWR internal endpoint", e))?;

        let body = match self.client.get(&url).await {
            Ok(body) => body,
            Err(e) if e.is_not_found() => return Ok(State::not_found(id.clone())),
            Err(e) => return Err(provider_error(id, "Error retrieving SWR internal endpoint", e)),
        };

        let mut attributes = attributes_from_response(&internal_endpoint_schema(), &body);
        attributes.insert("instance_id".to_string(), Value::from(instance_id));
        Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
    }

    /// Delete an endpoint and wait until it is gone
    pub async fn delete_internal_endpoint(
        &self,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<()> {
        let (instance_id, endpoint_id) =
            parse_identifier(identifier).ok_or_else(|| invalid_identifier(id, identifier))?;
        let url = self
            .client
            .url(
                INTERNAL_ENDPOINT_URL,
                &[("instance_id", instance_id), ("id", endpoint_id)],
            )
            .map_err(|e| provider_error(id, "Error deleting SWR internal endpoint", e))?;

        match self
            .client
            .request(Method::Delete, &url, RequestOpts::new())
            .await
        {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                log::info!("SWR internal endpoint {} is already gone", endpoint_id);
                return Ok(());
            }
            Err(e) => return Err(provider_error(id, "Error deleting SWR internal endpoint", e)),
        }

        self.wait_for_internal_endpoint_deleted(instance_id, endpoint_id)
            .await
            .map_err(|e| {
                provider_error(
                    id,
                    format!(
                        "Error waiting for SWR internal endpoint ({}) to be deleted",
                        endpoint_id
                    ),
                    e,
                )
            })?;
        Ok(())
    }
}
