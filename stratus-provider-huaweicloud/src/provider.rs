//! Huawei Cloud Provider implementation
//!
//! This module contains the main provider implementation, which validates
//! resources against their schemas and dispatches each operation to the
//! service module that owns the resource type.

use stratus_core::provider::{ProviderError, ProviderResult};
use stratus_core::resource::{Resource, ResourceId, State};
use tokio_util::sync::CancellationToken;

use crate::client::ServiceClient;
use crate::config::ProviderConfig;
use crate::resources::{
    SWR_ENTERPRISE_INSTANCE, SWR_ENTERPRISE_INSTANCES, SWR_ENTERPRISE_INTERNAL_ENDPOINT,
    get_resource_type,
};
use crate::swr::SwrService;

/// Huawei Cloud Provider
pub struct HuaweiCloudProvider {
    config: ProviderConfig,
    swr: SwrService,
    cancel: CancellationToken,
}

impl HuaweiCloudProvider {
    /// Create a new provider from `config`
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let client = ServiceClient::new(&config)
            .map_err(|e| ProviderError::new("Failed to create SWR client").with_cause(e))?;
        let cancel = CancellationToken::new();
        let swr = SwrService::new(client, config.poll.clone(), cancel.clone())
            .with_enterprise_project_id(config.enterprise_project_id.clone());
        log::debug!("Huawei Cloud provider configured: {:?}", config);

        Ok(Self {
            config,
            swr,
            cancel,
        })
    }

    /// Create a provider configured from the `HW_*` environment variables
    pub fn from_env() -> ProviderResult<Self> {
        let config = ProviderConfig::from_env()
            .map_err(|e| ProviderError::new("Invalid provider configuration").with_cause(e))?;
        Self::new(config)
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Token that aborts every wait in progress when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Abort every wait in progress
    pub fn shutdown(&self) {
        log::info!("cancelling pending Huawei Cloud operations");
        self.cancel.cancel();
    }

    fn unknown_type(id: &ResourceId) -> ProviderError {
        ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
            .for_resource(id.clone())
    }

    /// Validate desired attributes against the schema of their type
    fn validate(&self, resource: &Resource) -> ProviderResult<()> {
        let resource_type = get_resource_type(&resource.id.resource_type)
            .ok_or_else(|| Self::unknown_type(&resource.id))?;

        if resource_type.is_data_source() != resource.is_data_source() {
            let kind = if resource_type.is_data_source() {
                "a data source"
            } else {
                "a resource"
            };
            return Err(ProviderError::new(format!(
                "{} is {}",
                resource.id.resource_type, kind
            ))
            .for_resource(resource.id.clone()));
        }

        resource_type
            .schema()
            .validate(&resource.attributes)
            .map_err(|errors| {
                let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
                ProviderError::new(format!("Invalid attributes: {}", messages.join("; ")))
                    .for_resource(resource.id.clone())
            })
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Read a resource by its identifier
    pub async fn read_resource(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> ProviderResult<State> {
        let Some(identifier) = identifier else {
            return Ok(State::not_found(id.clone()));
        };

        match id.resource_type.as_str() {
            SWR_ENTERPRISE_INSTANCE => self.swr.read_instance(id, identifier).await,
            SWR_ENTERPRISE_INTERNAL_ENDPOINT => {
                self.swr.read_internal_endpoint(id, identifier).await
            }
            _ => Err(Self::unknown_type(id)),
        }
    }

    /// Evaluate a data source
    pub async fn read_data_source_resource(&self, resource: &Resource) -> ProviderResult<State> {
        self.validate(resource)?;
        match resource.id.resource_type.as_str() {
            SWR_ENTERPRISE_INSTANCES => self.swr.read_instances(resource).await,
            _ => Err(Self::unknown_type(&resource.id)),
        }
    }

    /// Create a resource
    pub async fn create_resource(&self, resource: &Resource) -> ProviderResult<State> {
        self.validate(resource)?;
        match resource.id.resource_type.as_str() {
            SWR_ENTERPRISE_INSTANCE => self.swr.create_instance(resource).await,
            SWR_ENTERPRISE_INTERNAL_ENDPOINT => self.swr.create_internal_endpoint(resource).await,
            _ => Err(Self::unknown_type(&resource.id)),
        }
    }

    /// Update a resource in place
    pub async fn update_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        self.validate(to)?;
        match id.resource_type.as_str() {
            SWR_ENTERPRISE_INSTANCE => self.swr.update_instance(id, identifier, from, to).await,
            SWR_ENTERPRISE_INTERNAL_ENDPOINT => Err(ProviderError::new(format!(
                "Update not supported for {}, delete and recreate",
                id.resource_type
            ))
            .for_resource(id.clone())),
            _ => Err(Self::unknown_type(id)),
        }
    }

    /// Delete a resource
    pub async fn delete_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        options: &Resource,
    ) -> ProviderResult<()> {
        match id.resource_type.as_str() {
            SWR_ENTERPRISE_INSTANCE => self.swr.delete_instance(id, identifier, options).await,
            SWR_ENTERPRISE_INTERNAL_ENDPOINT => {
                self.swr.delete_internal_endpoint(id, identifier).await
            }
            _ => Err(Self::unknown_type(id)),
        }
    }
}
