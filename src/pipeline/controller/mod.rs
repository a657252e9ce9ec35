
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::api::{PipelineApi, TaskHandle, validate_structure, wrap_payload};
use super::policy::{PollOutcome, PollPolicy, Scheduler, TokioScheduler};
use super::PipelineError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    #[default]
    Idle,
    Validating,
    Executing,
    Polling,
    Teardown,
    Done,
    Error,
}

impl PipelineStatus {
    /// Whether an execution is between start and a final state
    #[inline]
    pub fn is_running(self) -> bool {
        !matches!(self, Self::Idle | Self::Done | Self::Error)
    }
}

impl fmt::Display for PipelineStatus {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Executing => "executing",
            Self::Polling => "polling",
            Self::Teardown => "teardown",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Observable state of the controller
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionSnapshot {
    pub execution_id: Option<Uuid>,
    pub status: PipelineStatus,
    /// Polls made so far in the current run
    pub attempt: u32,
    pub results: Option<Value>,
    pub error: Option<String>,
}

/// Runs a pipeline through validate, execute, poll and teardown.
///
/// One execution at a time. Progress is published on a watch channel so a UI can
/// render it while [`PipelineController::execute`] is pending.
pub struct PipelineController {
    api: Arc<dyn PipelineApi>,
    policy: PollPolicy,
    scheduler: Arc<dyn Scheduler>,
    state: watch::Sender<ExecutionSnapshot>,
}

impl PipelineController {
    #[inline]
    pub fn new(api: Arc<dyn PipelineApi>, policy: PollPolicy) -> Self {
        Self::with_scheduler(api, policy, Arc::new(TokioScheduler))
    }

    #[inline]
    pub fn with_scheduler(
        api: Arc<dyn PipelineApi>,
        policy: PollPolicy,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let (state, _) = watch::channel(ExecutionSnapshot::default());
        Self {
            api,
            policy,
            scheduler,
            state,
        }
    }

    #[inline]
    pub fn subscribe(&self) -> watch::Receiver<ExecutionSnapshot> {
        self.state.subscribe()
    }

    #[inline]
    pub fn snapshot(&self) -> ExecutionSnapshot {
        self.state.borrow().clone()
    }

    #[inline]
    pub fn status(&self) -> PipelineStatus {
        self.state.borrow().status
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.status().is_running()
    }

    /// Execute a pipeline definition and return its results.
    ///
    /// Cancelling `cancel` takes effect while polling and leaves the controller idle.
    /// Calling this while another execution is running fails with
    /// [`PipelineError::AlreadyRunning`] and leaves the running one untouched.
    #[inline]
    pub async fn execute(
        &self,
        config: &Value,
        cancel: &CancellationToken,
    ) -> Result<Value, PipelineError> {
        let execution_id = Uuid::new_v4();
        let started = self.state.send_if_modified(|state| {
            if state.status.is_running() {
                return false;
            }
            *state = ExecutionSnapshot {
                execution_id: Some(execution_id),
                status: PipelineStatus::Validating,
                ..ExecutionSnapshot::default()
            };
            true
        });
        if !started {
            warn!("Rejected pipeline execution: another run is in progress");
            return Err(PipelineError::AlreadyRunning);
        }

        info!("Starting pipeline execution {}", execution_id);
        let outcome = self.run(config, cancel).await;

        match &outcome {
            Ok(results) => {
                info!("Pipeline execution {} finished", execution_id);
                self.state.send_modify(|state| {
                    state.status = PipelineStatus::Done;
                    state.results = Some(results.clone());
                });
            }
            Err(PipelineError::Cancelled) => {
                info!("Pipeline execution {} cancelled", execution_id);
                self.state.send_modify(|state| {
                    state.status = PipelineStatus::Idle;
                    state.results = None;
                    state.error = None;
                });
            }
            Err(e) => {
                error!("Pipeline execution {} failed: {}", execution_id, e);
                self.state.send_modify(|state| {
                    state.status = PipelineStatus::Error;
                    state.error = Some(e.to_string());
                });
            }
        }

        outcome
    }

    async fn run(&self, config: &Value, cancel: &CancellationToken) -> Result<Value, PipelineError> {
        self.api.check_ready()?;
        validate_structure(config)?;
        let payload = wrap_payload(config);

        let validation = self.api.validate(&payload).await?;
        if let Some(reason) = validation.application_error() {
            return Err(PipelineError::Application(format!(
                "Validation failed: {}",
                reason
            )));
        }

        self.transition(PipelineStatus::Executing);
        let execution = self.api.execute(&payload).await?;
        let data = match execution.data {
            Some(ref data) if execution.is_ok() && !data.is_null() => data,
            _ => {
                return Err(PipelineError::Application(format!(
                    "Execution failed: {}",
                    execution
                        .error_message()
                        .unwrap_or_else(|| "no task data returned".to_string())
                )));
            }
        };
        let task: TaskHandle = serde_json::from_value(data.clone()).map_err(|e| {
            PipelineError::Application(format!("Execution failed: invalid task data: {}", e))
        })?;
        debug!("Submitted task of type {}", task.task_type);

        self.transition(PipelineStatus::Polling);
        let poll_data = self.poll_until_complete(&task, cancel).await?;

        self.transition(PipelineStatus::Teardown);
        let teardown = self.api.teardown(&task).await?;
        if let Some(reason) = teardown.application_error() {
            return Err(PipelineError::Application(format!(
                "Teardown failed: {}",
                reason
            )));
        }

        Ok(teardown.data.or(poll_data).unwrap_or(Value::Null))
    }

    /// Poll until the task completes, fails, or the attempt budget runs out.
    ///
    /// Returns the completing poll's `data`.
    async fn poll_until_complete(
        &self,
        task: &TaskHandle,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>, PipelineError> {
        for attempt in 1..=self.policy.max_attempts {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(PipelineError::Cancelled),
                response = self.api.poll_status(task) => response?,
            };
            // A response that raced with cancellation is discarded
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            self.state.send_modify(|state| state.attempt = attempt);
            if let Some(reason) = response.application_error() {
                return Err(PipelineError::Application(format!(
                    "Status check failed: {}",
                    reason
                )));
            }
            let task_status = response.task_status();
            debug!("Poll {} returned status {:?}", attempt, task_status);

            match self.policy.classify(task_status) {
                PollOutcome::Completed => return Ok(response.data),
                PollOutcome::Failed => {
                    let reason = response
                        .task_error()
                        .unwrap_or_else(|| "unknown error".to_string());
                    return Err(PipelineError::Failed(reason));
                }
                PollOutcome::Pending => {}
            }

            if attempt < self.policy.max_attempts {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(PipelineError::Cancelled),
                    () = self.scheduler.sleep(self.policy.interval) => {}
                }
            }
        }

        warn!(
            "Task did not finish within {} polls",
            self.policy.max_attempts
        );
        Err(PipelineError::PollLimitExceeded(self.policy.max_attempts))
    }

    fn transition(&self, status: PipelineStatus) {
        debug!("Pipeline status -> {}", status);
        self.state.send_modify(|state| state.status = status);
    }
}
