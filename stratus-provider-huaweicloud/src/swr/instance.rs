//! SWR Enterprise instance
//!
//! Creation returns a job ID that is polled until the instance is ready.
//! Switching public network access control on or off is asynchronous too
//! and is polled through the endpoint policy.

use std::collections::HashMap;

use serde_json::json;
use stratus_core::differ::{Diff, diff};
use stratus_core::provider::{ProviderError, ProviderResult};
use stratus_core::resource::{Resource, ResourceId, State, Value};
use stratus_core::waiter::StatusCheckError;

use super::status::{self, ENDPOINT_POLICY_URL};
use super::{SwrService, provider_error};
use crate::client::{ClientResult, Method, RequestOpts};
use crate::resources::{attributes_from_response, instance_schema};
use crate::response::{
    expand_resource_tags_map, flatten_tag_list, optional_str, path_search, remove_nil,
    require_str, value_ignore_empty,
};

const INSTANCES_URL: &str = "v2/{project_id}/instances";
const INSTANCE_URL: &str = "v2/{project_id}/instances/{instance_id}";
const CONFIGURATIONS_URL: &str = "v2/{project_id}/instances/{instance_id}/configurations";
const TAGS_URL: &str = "v2/{project_id}/instances/{instance_id}/tags";
const TAGS_CREATE_URL: &str = "v2/{project_id}/instances/{instance_id}/tags/create";
const TAGS_DELETE_URL: &str = "v2/{project_id}/instances/{instance_id}/tags/delete";

pub const ACCESS_CONTROL_STATUS: &str = "public_network_access_control_status";
pub const WHITE_IP_LIST: &str = "public_network_access_white_ip_list";

/// Request body of `POST /v2/{project_id}/instances`
///
/// Only pay-per-use instances can be created. Without an
/// `enterprise_project_id` attribute, `default_enterprise_project` is sent.
pub fn create_instance_body(
    resource: &Resource,
    project_id: &str,
    default_enterprise_project: Option<&str>,
) -> serde_json::Value {
    let attributes = &resource.attributes;
    let attr = |key: &str| {
        attributes
            .get(key)
            .map(Value::to_json)
            .unwrap_or(serde_json::Value::Null)
    };
    let enterprise_project_id = optional_str(attributes, "enterprise_project_id")
        .as_str()
        .map(str::to_string)
        .or_else(|| default_enterprise_project.map(str::to_string));

    remove_nil(json!({
        "charge_mode": "postPaid",
        "name": attr("name"),
        "spec": attr("spec"),
        "vpc_id": attr("vpc_id"),
        "subnet_id": attr("subnet_id"),
        "enterprise_project_id": enterprise_project_id,
        "project_id": project_id,
        "obs_encrypt": value_ignore_empty(attr("obs_encrypt")),
        "encrypt_type": optional_str(attributes, "encrypt_type"),
        "obs_bucket_name": optional_str(attributes, "obs_bucket_name"),
        "description": optional_str(attributes, "description"),
        "resource_tags": expand_resource_tags_map(&tags_of(attributes.get("tags"))),
    }))
}

/// White IP list attribute as the `ip_list` request field
pub fn white_ip_list_body(list: Option<&Value>) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = match list {
        Some(Value::List(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Map(entry) => Some(json!({
                    "ip": entry.get("ip").map(Value::to_json),
                    "description": optional_str(entry, "description"),
                })),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    remove_nil(json!(entries))
}

fn white_ip_list_value(ip_list: &[status::WhiteIp]) -> Value {
    Value::List(
        ip_list
            .iter()
            .map(|entry| {
                let mut map = HashMap::from([("ip".to_string(), Value::from(entry.ip.as_str()))]);
                if let Some(description) = entry.description.as_deref()
                    && !description.is_empty()
                {
                    map.insert("description".to_string(), Value::from(description));
                }
                Value::Map(map)
            })
            .collect(),
    )
}

fn tags_of(value: Option<&Value>) -> HashMap<String, Value> {
    match value {
        Some(Value::Map(tags)) => tags.clone(),
        _ => HashMap::new(),
    }
}

impl SwrService {
    async fn call_instance(
        &self,
        method: Method,
        template: &str,
        instance_id: &str,
        opts: RequestOpts,
    ) -> ClientResult<serde_json::Value> {
        let url = self.client.url(template, &[("instance_id", instance_id)])?;
        self.client.request(method, &url, opts).await
    }

    /// Create an instance and wait for the creation job
    pub async fn create_instance(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let url = self
            .client
            .url(INSTANCES_URL, &[])
            .map_err(|e| provider_error(id, "Error creating SWR instance", e))?;
        let body = create_instance_body(
            resource,
            self.client.project_id(),
            self.enterprise_project_id.as_deref(),
        );

        let (instance_id, job_id) = self
            .client
            .request(Method::Post, &url, RequestOpts::new().with_body(body))
            .await
            .and_then(|created| {
                Ok((
                    require_str("instance_id", &created, &url)?,
                    require_str("job_id", &created, &url)?,
                ))
            })
            .map_err(|e| provider_error(id, "Error creating SWR instance", e))?;
        let instance_id = instance_id.as_str();
        log::info!(
            "SWR instance {} is being created by job {}",
            instance_id,
            job_id
        );

        self.wait_for_job(&job_id, self.poll.create_timeout)
            .await
            .map_err(|e| {
                provider_error(
                    id,
                    format!("Error waiting for SWR job ({}) to complete", job_id),
                    e,
                )
            })?;

        if resource.get_bool("anonymous_access") {
            self.update_anonymous_access(id, instance_id, true).await?;
        }
        if resource.get_str(ACCESS_CONTROL_STATUS) == Some("Enable") {
            self.set_access_control(id, instance_id, "Enable").await?;
        }
        if let Some(list) = resource.attributes.get(WHITE_IP_LIST) {
            self.update_white_ip_list(id, instance_id, Some(list)).await?;
        }

        self.read_instance(id, instance_id).await
    }

    /// Read an instance together with its configuration, access control and tags
    pub async fn read_instance(&self, id: &ResourceId, instance_id: &str) -> ProviderResult<State> {
        let body = match self
            .call_instance(Method::Get, INSTANCE_URL, instance_id, RequestOpts::new())
            .await
        {
            Ok(body) => body,
            Err(e) if e.is_not_found() => {
                log::debug!("SWR instance {} not found", instance_id);
                return Ok(State::not_found(id.clone()));
            }
            Err(e) => return Err(provider_error(id, "Error retrieving SWR instance", e)),
        };

        let mut attributes = attributes_from_response(&instance_schema(), &body);

        match self
            .call_instance(Method::Get, CONFIGURATIONS_URL, instance_id, RequestOpts::new())
            .await
        {
            Ok(configuration) => {
                if let Some(value) =
                    path_search("anonymous_access", &configuration).and_then(Value::from_json)
                {
                    attributes.insert("anonymous_access".to_string(), value);
                }
            }
            Err(e) => log::warn!("error retrieving SWR instance configuration: {}", e),
        }

        match status::endpoint_policy_status(&self.client, instance_id).await {
            Ok(observation) => {
                if !observation.status.is_empty() {
                    attributes.insert(
                        ACCESS_CONTROL_STATUS.to_string(),
                        Value::String(observation.status.clone()),
                    );
                }
                if let Some(policy) = status::endpoint_policy(&observation.payload)
                    && !policy.ip_list.is_empty()
                {
                    attributes.insert(
                        WHITE_IP_LIST.to_string(),
                        white_ip_list_value(&policy.ip_list),
                    );
                }
            }
            Err(e) => log::warn!(
                "error retrieving SWR instance public access control infos: {}",
                e
            ),
        }

        match self
            .call_instance(Method::Get, TAGS_URL, instance_id, RequestOpts::new())
            .await
        {
            Ok(body) => {
                let tags = path_search("tags", &body)
                    .map(flatten_tag_list)
                    .unwrap_or_default();
                if !tags.is_empty() {
                    attributes.insert("tags".to_string(), Value::Map(tags));
                }
            }
            Err(e) => log::warn!("error retrieving SWR instance tags: {}", e),
        }

        Ok(State::existing(id.clone(), attributes).with_identifier(instance_id))
    }

    /// Apply in-place changes
    ///
    /// When access control is switched off, the white list is written
    /// before the switch; when it is switched on, after it.
    pub async fn update_instance(
        &self,
        id: &ResourceId,
        instance_id: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let changed = match diff(&instance_schema(), to, from) {
            Diff::Update {
                changed_attributes, ..
            } => changed_attributes,
            Diff::NoChange(_) => return self.read_instance(id, instance_id).await,
            Diff::Replace {
                forcing_attributes, ..
            } => {
                return Err(ProviderError::new(format!(
                    "Cannot update {} in place, the instance must be replaced",
                    forcing_attributes.join(", ")
                ))
                .for_resource(id.clone()));
            }
            Diff::Create(_) => {
                return Err(ProviderError::new(format!(
                    "SWR instance {} does not exist and cannot be updated",
                    instance_id
                ))
                .for_resource(id.clone()));
            }
        };

        let has_change = |name: &str| changed.iter().any(|c| c == name);

        if has_change("anonymous_access") {
            self.update_anonymous_access(id, instance_id, to.get_bool("anonymous_access")).await?;
        }

        if has_change("tags") {
            self.replace_tags(
                id,
                instance_id,
                &tags_of(from.attributes.get("tags")),
                &tags_of(to.attributes.get("tags")),
            )
            .await?;
        }

        let white_list = to.attributes.get(WHITE_IP_LIST);
        if has_change(ACCESS_CONTROL_STATUS) {
            let target = to.get_str(ACCESS_CONTROL_STATUS).unwrap_or("Disable");
            if has_change(WHITE_IP_LIST) && target == "Disable" {
                self.update_white_ip_list(id, instance_id, white_list).await?;
            }
            self.set_access_control(id, instance_id, target).await?;
            if has_change(WHITE_IP_LIST) && target == "Enable" {
                self.update_white_ip_list(id, instance_id, white_list).await?;
            }
        } else if has_change(WHITE_IP_LIST) {
            self.update_white_ip_list(id, instance_id, white_list).await?;
        }

        self.read_instance(id, instance_id).await
    }

    /// Delete an instance; an instance that is already gone counts as deleted
    pub async fn delete_instance(
        &self,
        id: &ResourceId,
        instance_id: &str,
        options: &Resource,
    ) -> ProviderResult<()> {
        let body = json!({
            "delete_obs": options.get_bool("delete_obs"),
            "delete_dns": options.get_bool("delete_dns"),
        });

        match self
            .call_instance(
                Method::Delete,
                INSTANCE_URL,
                instance_id,
                RequestOpts::new().with_body(body),
            )
            .await
        {
            Ok(_) => {
                log::info!("SWR instance {} deleted", instance_id);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                log::info!("SWR instance {} is already gone", instance_id);
                Ok(())
            }
            Err(e) => Err(provider_error(id, "Error deleting SWR instance", e)),
        }
    }

    async fn update_anonymous_access(
        &self,
        id: &ResourceId,
        instance_id: &str,
        enabled: bool,
    ) -> ProviderResult<()> {
        self.call_instance(
            Method::Put,
            CONFIGURATIONS_URL,
            instance_id,
            RequestOpts::new().with_body(json!({"anonymous_access": enabled})),
        )
        .await
        .map_err(|e| {
            provider_error(
                id,
                "Error updating SWR instance configuration anonymous access",
                e,
            )
        })?;
        Ok(())
    }

    async fn replace_tags(
        &self,
        id: &ResourceId,
        instance_id: &str,
        old: &HashMap<String, Value>,
        new: &HashMap<String, Value>,
    ) -> ProviderResult<()> {
        if !old.is_empty() {
            let body = json!({"tags": expand_resource_tags_map(old)});
            self.call_instance(
                Method::Delete,
                TAGS_DELETE_URL,
                instance_id,
                RequestOpts::new().with_body(body).with_ok_codes(&[204]),
            )
            .await
            .map_err(|e| provider_error(id, "Error deleting SWR enterprise instance tags", e))?;
        }

        if !new.is_empty() {
            let body = json!({"tags": expand_resource_tags_map(new)});
            self.call_instance(
                Method::Post,
                TAGS_CREATE_URL,
                instance_id,
                RequestOpts::new().with_body(body).with_ok_codes(&[204]),
            )
            .await
            .map_err(|e| provider_error(id, "Error adding SWR enterprise instance tags", e))?;
        }

        Ok(())
    }

    /// Switch public network access control and wait for the switch to settle
    async fn set_access_control(
        &self,
        id: &ResourceId,
        instance_id: &str,
        target: &str,
    ) -> ProviderResult<()> {
        self.call_instance(
            Method::Post,
            ENDPOINT_POLICY_URL,
            instance_id,
            RequestOpts::new().with_body(json!({"enable": target == "Enable"})),
        )
        .await
        .map_err(|e| {
            provider_error(
                id,
                "Error updating SWR instance public network access control status",
                e,
            )
        })?;

        self.wait_for_access_control(instance_id, target, self.poll.update_timeout)
            .await
            .map_err(|e| {
                provider_error(
                    id,
                    "Error waiting for SWR instance public network access control status to change",
                    e,
                )
            })?;
        Ok(())
    }

    async fn update_white_ip_list(
        &self,
        id: &ResourceId,
        instance_id: &str,
        list: Option<&Value>,
    ) -> ProviderResult<()> {
        self.call_instance(
            Method::Put,
            ENDPOINT_POLICY_URL,
            instance_id,
            RequestOpts::new().with_body(json!({"ip_list": white_ip_list_body(list)})),
        )
        .await
        .map_err(|e| {
            provider_error(
                id,
                "Error updating SWR instance public network access white IP list",
                e,
            )
        })?;
        Ok(())
    }
}
