//! SWR Enterprise resources
//!
//! - `instance` - registry instance lifecycle (job-based creation, access control toggle)
//! - `internal_endpoint` - private network endpoints of an instance
//! - `instances` - the instance list data source
//! - `status` - status checks polled by the waiters

pub mod instance;
pub mod instances;
pub mod internal_endpoint;
pub mod status;

use std::time::Duration;

use stratus_core::provider::ProviderError;
use stratus_core::resource::ResourceId;
use stratus_core::waiter::{Completion, WaitError, WaitPolicy, Waiter};
use tokio_util::sync::CancellationToken;

use crate::client::ServiceClient;
use crate::config::PollSettings;

/// SWR service bound to one project
pub struct SwrService {
    client: ServiceClient,
    poll: PollSettings,
    cancel: CancellationToken,
    enterprise_project_id: Option<String>,
}

impl SwrService {
    pub fn new(client: ServiceClient, poll: PollSettings, cancel: CancellationToken) -> Self {
        Self {
            client,
            poll,
            cancel,
            enterprise_project_id: None,
        }
    }

    /// Enterprise project for instances that do not name one
    pub fn with_enterprise_project_id(mut self, enterprise_project_id: Option<String>) -> Self {
        self.enterprise_project_id = enterprise_project_id;
        self
    }

    fn waiter(&self, operation: String, policy: WaitPolicy) -> Waiter {
        Waiter::new(operation, policy).with_cancellation(self.cancel.clone())
    }

    /// Wait for an asynchronous job to finish
    pub async fn wait_for_job(
        &self,
        job_id: &str,
        timeout: Duration,
    ) -> Result<Completion, WaitError> {
        let policy = WaitPolicy::job(timeout)
            .with_delay(self.poll.job_delay)
            .with_poll_interval(self.poll.job_interval);
        let client = &self.client;
        self.waiter(format!("job/{}", job_id), policy)
            .wait(move || status::job_status(client, job_id))
            .await
    }

    /// Wait for the public network access control to reach `target`
    pub async fn wait_for_access_control(
        &self,
        instance_id: &str,
        target: &str,
        timeout: Duration,
    ) -> Result<Completion, WaitError> {
        let policy = WaitPolicy::toggle(target, timeout)
            .with_delay(self.poll.toggle_delay)
            .with_poll_interval(self.poll.toggle_interval);
        let client = &self.client;
        self.waiter(format!("endpoint-policy/{}", instance_id), policy)
            .wait(move || status::endpoint_policy_status(client, instance_id))
            .await
    }

    /// Wait for a new internal endpoint to become `Running`
    pub async fn wait_for_internal_endpoint_created(
        &self,
        instance_id: &str,
        id: &str,
    ) -> Result<Completion, WaitError> {
        let policy = WaitPolicy::lifecycle_create(self.poll.endpoint_timeout)
            .with_poll_interval(self.poll.lifecycle_interval);
        let client = &self.client;
        self.waiter(format!("internal-endpoint/{}", id), policy)
            .wait(move || status::internal_endpoint_status(client, instance_id, id))
            .await
    }

    /// Wait until an internal endpoint can no longer be found
    pub async fn wait_for_internal_endpoint_deleted(
        &self,
        instance_id: &str,
        id: &str,
    ) -> Result<Completion, WaitError> {
        let policy = WaitPolicy::lifecycle_delete(self.poll.endpoint_timeout)
            .with_poll_interval(self.poll.lifecycle_interval);
        let client = &self.client;
        self.waiter(format!("internal-endpoint/{}", id), policy)
            .wait(move || status::internal_endpoint_status(client, instance_id, id))
            .await
    }
}

/// Wrap a lower-level error as a provider error for `id`
pub(crate) fn provider_error(
    id: &ResourceId,
    message: impl Into<String>,
    cause: impl std::error::Error + Send + Sync + 'static,
) -> ProviderError {
    ProviderError::new(message)
        .with_cause(cause)
        .for_resource(id.clone())
}
