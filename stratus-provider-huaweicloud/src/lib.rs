//! Stratus Huawei Cloud Provider
//!
//! Huawei Cloud provider implementation covering SWR Enterprise.
//!
//! ## Module Structure
//!
//! - `config` - Provider settings and waiter timing
//! - `client` - HTTP request executor
//! - `response` - Response decoding, path search and request body helpers
//! - `pagination` - Offset pagination over list APIs
//! - `resources` - Resource type definitions and schemas
//! - `swr` - SWR Enterprise resources and their status checks
//! - `provider` - HuaweiCloudProvider implementation

pub mod client;
pub mod config;
pub mod pagination;
pub mod provider;
pub mod resources;
pub mod response;
pub mod swr;

// Re-export main types
pub use client::{ClientError, ServiceClient};
pub use config::{PollSettings, ProviderConfig};
pub use provider::HuaweiCloudProvider;

use stratus_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use stratus_core::resource::{Resource, ResourceId, State};

use resources::resource_types;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for HuaweiCloudProvider {
    fn name(&self) -> &'static str {
        "huaweicloud"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move { self.read_resource(&id, identifier.as_deref()).await })
    }

    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.read_data_source_resource(&resource).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(&resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&id, &identifier, &from, &to).await })
    }

    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        options: &Resource,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let options = options.clone();
        Box::pin(async move { self.delete_resource(&id, &identifier, &options).await })
    }
}
