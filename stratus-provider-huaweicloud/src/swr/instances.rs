//! Data source listing SWR Enterprise instances

use std::collections::HashMap;

use serde::Deserialize;
use stratus_core::provider::ProviderResult;
use stratus_core::resource::{Resource, State, Value};

use super::{SwrService, provider_error};
use crate::client::ClientError;
use crate::pagination::{DEFAULT_PAGE_LIMIT, list_all};
use crate::response::null_as_default;

const INSTANCES_URL: &str = "v2/{project_id}/instances";

/// One entry of the instance list; absent or `null` fields are empty
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InstanceSummary {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub spec: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub vpc_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub subnet_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub enterprise_project_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub access_address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: String,
}

impl InstanceSummary {
    fn to_value(&self) -> Value {
        let fields = [
            ("id", &self.id),
            ("name", &self.name),
            ("spec", &self.spec),
            ("status", &self.status),
            ("version", &self.version),
            ("vpc_id", &self.vpc_id),
            ("subnet_id", &self.subnet_id),
            ("enterprise_project_id", &self.enterprise_project_id),
            ("access_address", &self.access_address),
            ("created_at", &self.created_at),
        ];
        Value::Map(
            fields
                .into_iter()
                .map(|(key, value)| (key.to_string(), Value::String(value.clone())))
                .collect(),
        )
    }
}

impl SwrService {
    /// List instances, filtered by the `name` and `status` attributes when set
    pub async fn read_instances(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let url = self
            .client
            .url(INSTANCES_URL, &[])
            .map_err(|e| provider_error(id, "Error querying SWR instances", e))?;

        let filters: Vec<(String, String)> = ["name", "status"]
            .into_iter()
            .filter_map(|key| {
                resource
                    .get_str(key)
                    .filter(|v| !v.is_empty())
                    .map(|v| (key.to_string(), v.to_string()))
            })
            .collect();

        let items = list_all(
            &self.client,
            &url,
            "instances",
            DEFAULT_PAGE_LIMIT,
            &filters,
        )
        .await
        .map_err(|e| provider_error(id, "Error querying SWR instances", e))?;

        let summaries = items
            .into_iter()
            .map(serde_json::from_value::<InstanceSummary>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| {
                let decode = ClientError::Decode {
                    url: url.clone(),
                    source,
                };
                provider_error(id, "Error querying SWR instances", decode)
            })?;
        let instances: Vec<Value> = summaries
            .iter()
            .filter(|instance| matches_filters(instance, &filters))
            .map(InstanceSummary::to_value)
            .collect();
        log::debug!("found {} SWR instance(s)", instances.len());

        let mut attributes: HashMap<String, Value> = resource.attributes.clone();
        attributes.insert("instances".to_string(), Value::List(instances));
        Ok(State::existing(id.clone(), attributes))
    }
}

/// Whether `instance` satisfies every filter
fn matches_filters(instance: &InstanceSummary, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(key, expected)| match key.as_str() {
        "name" => &instance.name == expected,
        "status" => &instance.status == expected,
        _ => true,
    })
}
