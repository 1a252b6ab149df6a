use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use surfcast_models::workflow::{WorkflowHandle, WorkflowParams, WorkflowState, WorkflowStatus};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::advisor::Advisor;
use crate::error::AgentError;
use crate::steps::StepRunner;

/// Durable execution service: submit a job, then poll its status.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    async fn submit(&self, params: WorkflowParams) -> Result<WorkflowHandle, AgentError>;

    /// Current state of a job. A terminal status is reported once; the engine
    /// may forget the job afterwards.
    async fn status(&self, handle: &WorkflowHandle) -> Result<WorkflowStatus, AgentError>;

    /// Stop and forget a job that is no longer wanted. Engines without this
    /// ability ignore it.
    async fn terminate(&self, _handle: &WorkflowHandle) -> Result<(), AgentError> {
        Ok(())
    }
}

/// Builds an advisor from a job's parameters alone.
pub type AdvisorFactory = Arc<dyn Fn(&WorkflowParams) -> Advisor + Send + Sync>;

struct Job {
    status: WorkflowStatus,
    task: Option<JoinHandle<()>>,
}

type Jobs = Arc<Mutex<HashMap<WorkflowHandle, Job>>>;

/// In-process engine. Each job runs on its own tokio task with its named
/// steps retried by a [`StepRunner`].
pub struct LocalWorkflowEngine {
    factory: AdvisorFactory,
    steps: StepRunner,
    jobs: Jobs,
}

impl LocalWorkflowEngine {
    pub fn new(factory: AdvisorFactory, steps: StepRunner) -> Self {
        Self {
            factory,
            steps,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Jobs not yet collected by a terminal `status` call or `terminate`.
    pub fn job_count(&self) -> usize {
        lock(&self.jobs).len()
    }
}

fn lock(jobs: &Jobs) -> std::sync::MutexGuard<'_, HashMap<WorkflowHandle, Job>> {
    jobs.lock().unwrap_or_else(|e| e.into_inner())
}

/// Record a state change unless the job already reached a terminal state.
fn transition(jobs: &Jobs, handle: &WorkflowHandle, status: WorkflowStatus) {
    if let Some(job) = lock(jobs).get_mut(handle) {
        if !job.status.state.is_terminal() {
            job.status = status;
        }
    }
}

#[async_trait]
impl WorkflowEngine for LocalWorkflowEngine {
    async fn submit(&self, params: WorkflowParams) -> Result<WorkflowHandle, AgentError> {
        let handle = WorkflowHandle(Uuid::new_v4().to_string());
        lock(&self.jobs).insert(
            handle.clone(),
            Job {
                status: WorkflowStatus::pending(WorkflowState::Queued),
                task: None,
            },
        );

        let jobs = self.jobs.clone();
        let factory = self.factory.clone();
        let steps = self.steps;
        let task_handle = handle.clone();
        let task = tokio::spawn(async move {
            transition(
                &jobs,
                &task_handle,
                WorkflowStatus::pending(WorkflowState::Running),
            );
            let advisor = factory(&params);
            let status = match advisor.generate_advice_in(&params.messages, &steps).await {
                Ok(result) => WorkflowStatus::complete(result),
                Err(e) => {
                    warn!(handle = %task_handle, error = %e, "Workflow job errored");
                    WorkflowStatus::failed(WorkflowState::Errored, e.to_string())
                }
            };
            transition(&jobs, &task_handle, status);
        });

        if let Some(job) = lock(&self.jobs).get_mut(&handle) {
            job.task = Some(task);
        }
        info!(handle = %handle, "Workflow job submitted");
        Ok(handle)
    }

    async fn status(&self, handle: &WorkflowHandle) -> Result<WorkflowStatus, AgentError> {
        let mut jobs = lock(&self.jobs);
        let status = jobs
            .get(handle)
            .map(|job| job.status.clone())
            .ok_or_else(|| AgentError::Poll(format!("Unknown workflow instance {handle}")))?;
        if status.state.is_terminal() {
            jobs.remove(handle);
            debug!(handle = %handle, state = ?status.state, "Workflow job collected");
        }
        Ok(status)
    }

    async fn terminate(&self, handle: &WorkflowHandle) -> Result<(), AgentError> {
        let job = lock(&self.jobs)
            .remove(handle)
            .ok_or_else(|| AgentError::Poll(format!("Unknown workflow instance {handle}")))?;
        if let Some(task) = job.task {
            task.abort();
        }
        info!(handle = %handle, "Workflow job terminated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        advisor_with, sample_spot, ScriptedModel, StaticForecasts, StaticSpots,
    };
    use serde_json::json;
    use std::time::Duration;
    use surfcast_models::chat::ChatMessage;
    use surfcast_models::config::ConnectionSnapshot;

    fn params() -> WorkflowParams {
        WorkflowParams {
            messages: vec![ChatMessage::user("Best spot this weekend?")],
            chat_model: Some("@cf/test/model".to_string()),
            snapshot: ConnectionSnapshot::default(),
        }
    }

    fn engine(model: Arc<ScriptedModel>) -> LocalWorkflowEngine {
        let factory: AdvisorFactory = Arc::new(move |params: &WorkflowParams| {
            advisor_with(
                StaticSpots::new(vec![sample_spot("bells", "Bells Beach")]),
                StaticForecasts::empty(),
                model.clone(),
                params.chat_model.as_deref(),
            )
        });
        LocalWorkflowEngine::new(factory, StepRunner::inline())
    }

    async fn wait_terminal(engine: &LocalWorkflowEngine, handle: &WorkflowHandle) -> WorkflowStatus {
        for _ in 0..200 {
            let status = engine.status(handle).await.unwrap();
            if status.state.is_terminal() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job never finished");
    }

    #[tokio::test]
    async fn job_completes_with_advice() {
        let engine = engine(Arc::new(ScriptedModel::replying(json!({"response": "Bells"}))));
        let handle = engine.submit(params()).await.unwrap();

        let status = wait_terminal(&engine, &handle).await;
        assert_eq!(status.state, WorkflowState::Complete);
        let output = status.output.unwrap();
        assert_eq!(output.response_text, "Bells");
        assert_eq!(output.model_id, "@cf/test/model");
        assert_eq!(engine.job_count(), 0);
    }

    #[tokio::test]
    async fn failing_job_reports_error_text() {
        let engine = engine(Arc::new(ScriptedModel::failing_then(5, json!("never"))));
        let handle = engine.submit(params()).await.unwrap();

        let status = wait_terminal(&engine, &handle).await;
        assert_eq!(status.state, WorkflowState::Errored);
        assert!(status.error.unwrap().contains("Language model error"));
        assert!(status.output.is_none());
    }

    #[tokio::test]
    async fn terminate_aborts_and_forgets_job() {
        let engine = engine(Arc::new(
            ScriptedModel::replying(json!("late")).with_delay(Duration::from_secs(30)),
        ));
        let handle = engine.submit(params()).await.unwrap();
        assert_eq!(engine.job_count(), 1);

        engine.terminate(&handle).await.unwrap();
        assert_eq!(engine.job_count(), 0);
        assert!(matches!(
            engine.status(&handle).await,
            Err(AgentError::Poll(_))
        ));
    }

    #[tokio::test]
    async fn finished_jobs_are_collected_once_reported() {
        let engine = engine(Arc::new(ScriptedModel::replying(json!("ok"))));
        let mut handles = Vec::new();
        for _ in 0..25 {
            handles.push(engine.submit(params()).await.unwrap());
        }
        assert_eq!(engine.job_count(), 25);

        for handle in &handles {
            let status = wait_terminal(&engine, handle).await;
            assert_eq!(status.state, WorkflowState::Complete);
        }
        assert_eq!(engine.job_count(), 0);
    }

    #[tokio::test]
    async fn unknown_handle_is_poll_error() {
        let engine = engine(Arc::new(ScriptedModel::replying(json!("x"))));
        let result = engine.status(&WorkflowHandle("missing".to_string())).await;
        assert!(matches!(result, Err(AgentError::Poll(_))));
    }
}
