//! Waiter - Poll a long-running vendor operation until it settles
//!
//! Many vendor calls only start work: they hand back a job ID, or flip a
//! resource into a transitional status. A [`Waiter`] repeatedly invokes a
//! caller-supplied status check and classifies each observed status with a
//! [`WaitPolicy`] until one of four terminal outcomes is reached:
//!
//! - the status is in the success set → [`Completion::Reached`]
//! - the check reports "not found" and the policy treats that as deletion → [`Completion::Gone`]
//! - the status is in the failure set → [`WaitError::OperationFailed`]
//! - the deadline passes or the caller cancels → [`WaitError::Timeout`] / [`WaitError::Cancelled`]
//!
//! Any other error from the status check aborts the wait with
//! [`WaitError::Request`]. Nothing is retried and nothing is rolled back.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Initial delay before the first job status check (instances need warm-up time)
pub const JOB_DELAY: Duration = Duration::from_secs(120);
/// Interval between job status checks
pub const JOB_POLL_INTERVAL: Duration = Duration::from_secs(20);
/// Initial delay before the first check of an enable/disable toggle
pub const TOGGLE_DELAY: Duration = Duration::from_secs(5);
/// Interval between checks of an enable/disable toggle
pub const TOGGLE_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Interval between checks of a resource lifecycle status
pub const LIFECYCLE_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default deadline for resource lifecycle waits (10 minutes)
pub const DEFAULT_LIFECYCLE_TIMEOUT: Duration = Duration::from_secs(600);

/// One observation returned by a status check
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Raw status value as reported by the vendor
    pub status: String,
    /// The response body the status was read from
    pub payload: serde_json::Value,
}

impl Observation {
    pub fn new(status: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            status: status.into(),
            payload,
        }
    }
}

/// Errors a status check can return
///
/// The waiter needs to tell "the thing is gone" apart from every other
/// failure, because delete flows treat the former as success.
pub trait StatusCheckError: std::error::Error + Send + Sync + 'static {
    fn is_not_found(&self) -> bool;
}

/// Classification of an observed status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Success,
    Failed,
}

/// Status vocabulary and timing of one wait
#[derive(Debug, Clone, PartialEq)]
pub struct WaitPolicy {
    pub success_states: Vec<String>,
    pub failure_states: Vec<String>,
    /// Maximum total wait, initial delay included
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Sleep before the first check
    pub delay: Duration,
    /// Treat a not-found status check error as completion (delete flows)
    pub not_found_is_success: bool,
}

impl WaitPolicy {
    pub fn new<S: Into<String>>(
        success_states: impl IntoIterator<Item = S>,
        failure_states: impl IntoIterator<Item = S>,
        timeout: Duration,
    ) -> Self {
        Self {
            success_states: success_states.into_iter().map(Into::into).collect(),
            failure_states: failure_states.into_iter().map(Into::into).collect(),
            timeout,
            poll_interval: LIFECYCLE_POLL_INTERVAL,
            delay: Duration::ZERO,
            not_found_is_success: false,
        }
    }

    /// Vendor job: `Success` / `Failed`, everything else pending
    pub fn job(timeout: Duration) -> Self {
        Self::new(["Success"], ["Failed"], timeout)
            .with_delay(JOB_DELAY)
            .with_poll_interval(JOB_POLL_INTERVAL)
    }

    /// Enable/disable toggle: the requested target, or `EnableFailed` / `DisableFailed`
    pub fn toggle(target: &str, timeout: Duration) -> Self {
        Self::new([target], ["EnableFailed", "DisableFailed"], timeout)
            .with_delay(TOGGLE_DELAY)
            .with_poll_interval(TOGGLE_POLL_INTERVAL)
    }

    /// Resource creation: `Running` when ready, `CreateError` on failure
    pub fn lifecycle_create(timeout: Duration) -> Self {
        Self::new(["Running"], ["CreateError"], timeout)
    }

    /// Resource deletion: done once the status endpoint reports not found
    pub fn lifecycle_delete(timeout: Duration) -> Self {
        let mut policy = Self::new(Vec::<String>::new(), vec!["DeleteError".to_string()], timeout);
        policy.not_found_is_success = true;
        policy
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Classify an observed status
    pub fn classify(&self, status: &str) -> Phase {
        if self.success_states.iter().any(|s| s == status) {
            Phase::Success
        } else if self.failure_states.iter().any(|s| s == status) {
            Phase::Failed
        } else {
            Phase::Pending
        }
    }
}

/// Successful end of a wait
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// A success status was observed
    Reached {
        status: String,
        payload: serde_json::Value,
        polls: u32,
        elapsed: Duration,
    },
    /// The status endpoint reported the resource as gone
    Gone { polls: u32, elapsed: Duration },
}

impl Completion {
    pub fn polls(&self) -> u32 {
        match self {
            Completion::Reached { polls, .. } | Completion::Gone { polls, .. } => *polls,
        }
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Completion::Reached { payload, .. } => Some(payload),
            Completion::Gone { .. } => None,
        }
    }

    pub fn is_gone(&self) -> bool {
        matches!(self, Completion::Gone { .. })
    }
}

/// Unsuccessful end of a wait
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("operation {operation} failed with status {status} after {polls} poll(s)")]
    OperationFailed {
        operation: String,
        status: String,
        payload: serde_json::Value,
        polls: u32,
    },

    #[error(
        "timeout after {elapsed:?} waiting for operation {operation} ({polls} poll(s), last status: {})",
        last_status.as_deref().unwrap_or("none")
    )]
    Timeout {
        operation: String,
        elapsed: Duration,
        polls: u32,
        last_status: Option<String>,
    },

    #[error("failed to check status of operation {operation}: {source}")]
    Request {
        operation: String,
        polls: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("waiting for operation {operation} was cancelled after {polls} poll(s)")]
    Cancelled {
        operation: String,
        polls: u32,
        elapsed: Duration,
    },
}

impl WaitError {
    /// Identifier of the operation that was being waited on
    pub fn operation(&self) -> &str {
        match self {
            WaitError::OperationFailed { operation, .. }
            | WaitError::Timeout { operation, .. }
            | WaitError::Request { operation, .. }
            | WaitError::Cancelled { operation, .. } => operation,
        }
    }

    pub fn polls(&self) -> u32 {
        match self {
            WaitError::OperationFailed { polls, .. }
            | WaitError::Timeout { polls, .. }
            | WaitError::Request { polls, .. }
            | WaitError::Cancelled { polls, .. } => *polls,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }
}

/// Drives one poll loop
///
/// A Waiter holds no state between calls to [`Waiter::wait`]; independent
/// waits can run concurrently.
#[derive(Debug, Clone)]
pub struct Waiter {
    operation: String,
    policy: WaitPolicy,
    cancel: CancellationToken,
}

impl Waiter {
    pub fn new(operation: impl Into<String>, policy: WaitPolicy) -> Self {
        Self {
            operation: operation.into(),
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop waiting as soon as `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn policy(&self) -> &WaitPolicy {
        &self.policy
    }

    /// Poll `check` until the operation settles
    pub async fn wait<F, Fut, E>(&self, mut check: F) -> Result<Completion, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation, E>>,
        E: StatusCheckError,
    {
        let started = Instant::now();
        let deadline = started + self.policy.timeout;
        let mut polls: u32 = 0;
        let mut last_status: Option<String> = None;

        if !self.policy.delay.is_zero() {
            let wake = started + self.policy.delay;
            if wake >= deadline {
                self.pause_until(deadline, polls, started).await?;
                return Err(self.timeout(polls, started, last_status));
            }
            self.pause_until(wake, polls, started).await?;
        }

        loop {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(polls, started));
            }

            polls += 1;
            let checked = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(self.cancelled(polls, started)),
                checked = tokio::time::timeout_at(deadline, check()) => checked,
            };

            let Ok(result) = checked else {
                return Err(self.timeout(polls, started, last_status));
            };

            match result {
                Err(e) if self.policy.not_found_is_success && e.is_not_found() => {
                    log::info!(
                        "operation {}: resource is gone after {} poll(s)",
                        self.operation,
                        polls
                    );
                    return Ok(Completion::Gone {
                        polls,
                        elapsed: started.elapsed(),
                    });
                }
                Err(e) => {
                    log::warn!(
                        "operation {}: status check failed on poll {}: {}",
                        self.operation,
                        polls,
                        e
                    );
                    return Err(WaitError::Request {
                        operation: self.operation.clone(),
                        polls,
                        source: Box::new(e),
                    });
                }
                Ok(observation) => {
                    log::debug!(
                        "operation {}: poll {} observed status {:?}",
                        self.operation,
                        polls,
                        observation.status
                    );
                    match self.policy.classify(&observation.status) {
                        Phase::Success => {
                            log::info!(
                                "operation {} reached {} after {} poll(s)",
                                self.operation,
                                observation.status,
                                polls
                            );
                            return Ok(Completion::Reached {
                                status: observation.status,
                                payload: observation.payload,
                                polls,
                                elapsed: started.elapsed(),
                            });
                        }
                        Phase::Failed => {
                            log::warn!(
                                "operation {} failed with status {}",
                                self.operation,
                                observation.status
                            );
                            return Err(WaitError::OperationFailed {
                                operation: self.operation.clone(),
                                status: observation.status,
                                payload: observation.payload,
                                polls,
                            });
                        }
                        Phase::Pending => last_status = Some(observation.status),
                    }
                }
            }

            let next = Instant::now() + self.policy.poll_interval;
            if next > deadline {
                self.pause_until(deadline, polls, started).await?;
                return Err(self.timeout(polls, started, last_status));
            }
            self.pause_until(next, polls, started).await?;
        }
    }

    async fn pause_until(
        &self,
        until: Instant,
        polls: u32,
        started: Instant,
    ) -> Result<(), WaitError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(self.cancelled(polls, started)),
            _ = tokio::time::sleep_until(until) => Ok(()),
        }
    }

    fn timeout(&self, polls: u32, started: Instant, last_status: Option<String>) -> WaitError {
        log::warn!(
            "operation {}: gave up after {} poll(s)",
            self.operation,
            polls
        );
        WaitError::Timeout {
            operation: self.operation.clone(),
            elapsed: started.elapsed(),
            polls,
            last_status,
        }
    }

    fn cancelled(&self, polls: u32, started: Instant) -> WaitError {
        WaitError::Cancelled {
            operation: self.operation.clone(),
            polls,
            elapsed: started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Copy)]
    enum Step {
        Status(&'static str),
        NotFound,
        Broken,
    }

    #[derive(Debug, thiserror::Error)]
    enum FakeError {
        #[error("resource not found")]
        NotFound,
        #[error("connection refused")]
        Broken,
    }

    impl StatusCheckError for FakeError {
        fn is_not_found(&self) -> bool {
            matches!(self, FakeError::NotFound)
        }
    }

    type Calls = Arc<Mutex<Vec<Duration>>>;

    /// Status check replaying `steps`, repeating the last one forever.
    /// Records the time of every call relative to its creation.
    fn scripted(
        steps: Vec<Step>,
    ) -> (
        impl FnMut() -> std::future::Ready<Result<Observation, FakeError>>,
        Calls,
    ) {
        let started = Instant::now();
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let record = calls.clone();
        let mut index = 0usize;
        let check = move || {
            record.lock().unwrap().push(started.elapsed());
            let step = steps[index.min(steps.len() - 1)];
            index += 1;
            std::future::ready(match step {
                Step::Status(s) => Ok(Observation::new(s, json!({"status": s, "poll": index}))),
                Step::NotFound => Err(FakeError::NotFound),
                Step::Broken => Err(FakeError::Broken),
            })
        };
        (check, calls)
    }

    fn call_count(calls: &Calls) -> usize {
        calls.lock().unwrap().len()
    }

    fn fast_job() -> WaitPolicy {
        WaitPolicy::job(Duration::from_secs(2400))
    }

    #[test]
    fn classify_job_statuses() {
        let policy = fast_job();
        assert_eq!(policy.classify("Success"), Phase::Success);
        assert_eq!(policy.classify("Failed"), Phase::Failed);
        assert_eq!(policy.classify(""), Phase::Pending);
        assert_eq!(policy.classify("Running"), Phase::Pending);
    }

    #[test]
    fn toggle_policy_uses_requested_target() {
        let policy = WaitPolicy::toggle("Disable", Duration::from_secs(60));
        assert_eq!(policy.classify("Disable"), Phase::Success);
        assert_eq!(policy.classify("Enable"), Phase::Pending);
        assert_eq!(policy.classify("EnableFailed"), Phase::Failed);
        assert_eq!(policy.classify("DisableFailed"), Phase::Failed);
        assert_eq!(policy.delay, TOGGLE_DELAY);
    }

    #[test]
    fn lifecycle_delete_has_no_success_status() {
        let policy = WaitPolicy::lifecycle_delete(DEFAULT_LIFECYCLE_TIMEOUT);
        assert!(policy.not_found_is_success);
        assert_eq!(policy.classify("Running"), Phase::Pending);
        assert_eq!(policy.classify("DeleteError"), Phase::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn job_succeeds_on_third_poll() {
        let (check, calls) = scripted(vec![
            Step::Status(""),
            Step::Status(""),
            Step::Status("Success"),
        ]);

        let completion = Waiter::new("job-1", fast_job()).wait(check).await.unwrap();

        match completion {
            Completion::Reached {
                status,
                payload,
                polls,
                ..
            } => {
                assert_eq!(status, "Success");
                assert_eq!(polls, 3);
                assert_eq!(payload["poll"], 3);
            }
            other => panic!("Expected Reached, got {:?}", other),
        }
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                Duration::from_secs(120),
                Duration::from_secs(140),
                Duration::from_secs(160)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn success_after_n_pending_polls() {
        for pending in 0..5 {
            let mut steps = vec![Step::Status("Creating"); pending];
            steps.push(Step::Status("Running"));
            let (check, calls) = scripted(steps);

            let policy = WaitPolicy::lifecycle_create(DEFAULT_LIFECYCLE_TIMEOUT);
            let completion = Waiter::new("ep-1", policy).wait(check).await.unwrap();

            assert_eq!(completion.polls() as usize, pending + 1);
            assert_eq!(call_count(&calls), pending + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn job_failure_short_circuits() {
        let (check, calls) = scripted(vec![Step::Status(""), Step::Status("Failed")]);

        let err = Waiter::new("job-2", fast_job()).wait(check).await.unwrap_err();

        match err {
            WaitError::OperationFailed {
                operation,
                status,
                polls,
                ..
            } => {
                assert_eq!(operation, "job-2");
                assert_eq!(status, "Failed");
                assert_eq!(polls, 2);
            }
            other => panic!("Expected OperationFailed, got {:?}", other),
        }
        assert_eq!(call_count(&calls), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_enable_failure_on_third_poll() {
        let (check, calls) = scripted(vec![
            Step::Status("Disable"),
            Step::Status("Disable"),
            Step::Status("EnableFailed"),
        ]);
        let policy = WaitPolicy::toggle("Enable", Duration::from_secs(1200));

        let err = Waiter::new("instance-1", policy).wait(check).await.unwrap_err();

        assert!(matches!(
            err,
            WaitError::OperationFailed { ref status, polls: 3, .. } if status == "EnableFailed"
        ));
        assert_eq!(call_count(&calls), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_not_found_is_gone_after_one_poll() {
        let (check, calls) = scripted(vec![Step::NotFound]);
        let policy = WaitPolicy::lifecycle_delete(DEFAULT_LIFECYCLE_TIMEOUT);

        let completion = Waiter::new("ep-2", policy).wait(check).await.unwrap();

        assert!(completion.is_gone());
        assert_eq!(completion.polls(), 1);
        assert!(completion.payload().is_none());
        assert_eq!(call_count(&calls), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_waits_through_deleting_status() {
        let (check, calls) = scripted(vec![
            Step::Status("Deleting"),
            Step::Status("Deleting"),
            Step::NotFound,
        ]);
        let policy = WaitPolicy::lifecycle_delete(DEFAULT_LIFECYCLE_TIMEOUT);

        let completion = Waiter::new("ep-3", policy).wait(check).await.unwrap();

        assert!(completion.is_gone());
        assert_eq!(call_count(&calls), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_without_flag_is_request_error() {
        let (check, _calls) = scripted(vec![Step::NotFound]);
        let policy = WaitPolicy::lifecycle_create(DEFAULT_LIFECYCLE_TIMEOUT);

        let err = Waiter::new("ep-4", policy).wait(check).await.unwrap_err();

        assert!(matches!(err, WaitError::Request { polls: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn request_error_aborts_without_retry() {
        let (check, calls) = scripted(vec![Step::Status("Creating"), Step::Broken]);
        let policy = WaitPolicy::lifecycle_create(DEFAULT_LIFECYCLE_TIMEOUT);

        let err = Waiter::new("ep-5", policy).wait(check).await.unwrap_err();

        assert_eq!(err.operation(), "ep-5");
        assert_eq!(err.polls(), 2);
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(call_count(&calls), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fires_when_always_pending() {
        let (check, calls) = scripted(vec![Step::Status("Pending")]);
        let policy = WaitPolicy::lifecycle_create(Duration::from_secs(12))
            .with_poll_interval(Duration::from_secs(5));
        let started = Instant::now();

        let err = Waiter::new("ep-6", policy).wait(check).await.unwrap_err();

        match err {
            WaitError::Timeout {
                polls,
                elapsed,
                last_status,
                ..
            } => {
                assert_eq!(polls, 3);
                assert_eq!(elapsed, Duration::from_secs(12));
                assert_eq!(last_status.as_deref(), Some("Pending"));
            }
            other => panic!("Expected Timeout, got {:?}", other),
        }
        assert_eq!(started.elapsed(), Duration::from_secs(12));
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                Duration::ZERO,
                Duration::from_secs(5),
                Duration::from_secs(10)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_inside_initial_delay_never_polls() {
        let (check, calls) = scripted(vec![Step::Status("Success")]);
        let policy = fast_job().with_timeout(Duration::from_secs(60));

        let err = Waiter::new("job-3", policy).wait(check).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.polls(), 0);
        assert_eq!(call_count(&calls), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_check_is_cut_off_at_deadline() {
        let policy = WaitPolicy::lifecycle_create(Duration::from_secs(30));
        let started = Instant::now();

        let err = Waiter::new("ep-7", policy)
            .wait(|| std::future::pending::<Result<Observation, FakeError>>())
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Timeout { polls: 1, .. }));
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn initial_delay_precedes_first_check() {
        let (check, calls) = scripted(vec![Step::Status("Success")]);
        let policy = fast_job().with_delay(Duration::from_secs(45));

        Waiter::new("job-4", policy).wait(check).await.unwrap();

        assert_eq!(*calls.lock().unwrap(), vec![Duration::from_secs(45)]);
    }

    #[tokio::test(start_paused = true)]
    async fn same_sequence_gives_same_outcome() {
        let waiter = Waiter::new("job-5", fast_job());

        let (first, _) = scripted(vec![Step::Status(""), Step::Status("Success")]);
        let (second, _) = scripted(vec![Step::Status(""), Step::Status("Success")]);

        let a = waiter.wait(first).await.unwrap();
        let b = waiter.wait(second).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_sleep() {
        let (check, calls) = scripted(vec![Step::Status("Pending")]);
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            trigger.cancel();
        });
        let policy = WaitPolicy::lifecycle_create(DEFAULT_LIFECYCLE_TIMEOUT);

        let err = Waiter::new("ep-8", policy)
            .with_cancellation(token)
            .wait(check)
            .await
            .unwrap_err();

        match err {
            WaitError::Cancelled { polls, elapsed, .. } => {
                assert_eq!(polls, 2);
                assert_eq!(elapsed, Duration::from_secs(7));
            }
            other => panic!("Expected Cancelled, got {:?}", other),
        }
        assert_eq!(call_count(&calls), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_stops_before_first_poll() {
        let (check, calls) = scripted(vec![Step::Status("Running")]);
        let token = CancellationToken::new();
        token.cancel();
        let policy = WaitPolicy::lifecycle_create(DEFAULT_LIFECYCLE_TIMEOUT);

        let err = Waiter::new("ep-9", policy)
            .with_cancellation(token)
            .wait(check)
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Cancelled { polls: 0, .. }));
        assert_eq!(call_count(&calls), 0);
    }

    #[test]
    fn timeout_error_message() {
        let err = WaitError::Timeout {
            operation: "job-9".to_string(),
            elapsed: Duration::from_secs(12),
            polls: 3,
            last_status: None,
        };
        assert_eq!(
            err.to_string(),
            "timeout after 12s waiting for operation job-9 (3 poll(s), last status: none)"
        );
    }
}
