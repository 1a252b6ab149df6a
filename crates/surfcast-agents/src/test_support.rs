//! Scripted collaborators for exercising the advisor, engine and runner
//! without any network access.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use surfcast_context::{
    ContextBuilder, ContextError, ForecastSource, ManualClock, PromptCache, SpotSource,
};
use surfcast_models::chat::ChatMessage;
use surfcast_models::config::ContextConfig;
use surfcast_models::forecast::RawForecastRow;
use surfcast_models::spot::SpotMetadata;
use surfcast_models::workflow::{WorkflowHandle, WorkflowParams, WorkflowStatus};

use crate::advisor::Advisor;
use crate::engine::WorkflowEngine;
use crate::error::AgentError;
use crate::model::{LanguageModel, ModelOutput};

/// Instant the scripted advisors treat as "now".
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// A fully described spot.
pub fn sample_spot(id: &str, name: &str) -> SpotMetadata {
    SpotMetadata {
        name: Some(name.to_string()),
        region: Some("Surf Coast".to_string()),
        description: Some("Right-hand point break".to_string()),
        difficulty: Some("Advanced".to_string()),
        type_of_break: vec!["Reef".to_string()],
        ideal_wind: vec!["NW".to_string()],
        ideal_swell_direction: vec!["SSW".to_string()],
        swell_size: vec!["1.5-3m".to_string()],
        tide_guide: Some("Mid to low".to_string()),
        ..SpotMetadata::with_id(id)
    }
}

/// Hourly rows for one spot starting at `start`.
pub fn sample_rows(spot_id: &str, start: DateTime<Utc>, hours: i64) -> Vec<RawForecastRow> {
    (0..hours)
        .map(|h| {
            let time = start + chrono::Duration::hours(h);
            let mut row = RawForecastRow::at(spot_id, &time.to_rfc3339());
            row.swell_height = Some(1.2 + (h % 6) as f64 * 0.1);
            row.swell_period = Some(9.0 + (h % 4) as f64);
            row.swell_direction = Some(200.0);
            row.wave_height = Some(1.0);
            row.wind_speed = Some(12.0);
            row.wind_direction = Some(315.0);
            row
        })
        .collect()
}

/// Spot source serving a fixed list, or a fixed upstream failure.
pub struct StaticSpots {
    spots: Vec<SpotMetadata>,
    failure_status: Option<u16>,
    calls: AtomicUsize,
}

impl StaticSpots {
    pub fn new(spots: Vec<SpotMetadata>) -> Self {
        Self {
            spots,
            failure_status: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every fetch fails with an upstream error carrying `status`.
    pub fn unavailable(status: u16) -> Self {
        Self {
            failure_status: Some(status),
            ..Self::new(vec![])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpotSource for StaticSpots {
    async fn fetch_spots(&self) -> Result<Vec<SpotMetadata>, ContextError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure_status {
            Some(status) => Err(ContextError::Upstream {
                source_name: "surf spots",
                status,
                body: "unavailable".to_string(),
            }),
            None => Ok(self.spots.clone()),
        }
    }
}

/// Forecast source serving fixed rows regardless of the requested window.
pub struct StaticForecasts {
    rows: Vec<RawForecastRow>,
}

impl StaticForecasts {
    pub fn new(rows: Vec<RawForecastRow>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }
}

#[async_trait]
impl ForecastSource for StaticForecasts {
    async fn fetch_forecasts(
        &self,
        spot_ids: &[String],
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<RawForecastRow>, ContextError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| {
                row.spot_id
                    .as_ref()
                    .is_some_and(|id| spot_ids.contains(id))
            })
            .cloned()
            .collect())
    }
}

/// Language model replaying a script and recording every call.
pub struct ScriptedModel {
    failures: AtomicUsize,
    queued: Mutex<VecDeque<ModelOutput>>,
    then: ModelOutput,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, Vec<ChatMessage>)>>,
}

impl ScriptedModel {
    /// Serve `queued` in order, then `then` forever.
    pub fn new(queued: Vec<ModelOutput>, then: ModelOutput) -> Self {
        Self {
            failures: AtomicUsize::new(0),
            queued: Mutex::new(queued.into()),
            then,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always reply with `value` decoded as model output.
    pub fn replying(value: Value) -> Self {
        Self::new(vec![], ModelOutput::from_value(value))
    }

    /// Fail the first `failures` calls, then reply with `value`.
    pub fn failing_then(failures: usize, value: Value) -> Self {
        let model = Self::replying(value);
        model.failures.store(failures, Ordering::SeqCst);
        model
    }

    /// Wait `delay` before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `(model_id, messages)` for every call, failed ones included.
    pub fn calls(&self) -> Vec<(String, Vec<ChatMessage>)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn run(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        _max_tokens: u32,
    ) -> Result<ModelOutput, AgentError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((model_id.to_string(), messages.to_vec()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(AgentError::Model("scripted failure".to_string()));
        }

        let next = self
            .queued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        Ok(next.unwrap_or_else(|| self.then.clone()))
    }
}

/// Engine replaying a fixed status sequence; the last status repeats.
pub struct ScriptedEngine {
    statuses: Vec<WorkflowStatus>,
    reject_submit: bool,
    polls: AtomicUsize,
    submitted: Mutex<Vec<WorkflowParams>>,
    terminated: Mutex<Vec<WorkflowHandle>>,
}

impl ScriptedEngine {
    pub fn new(statuses: Vec<WorkflowStatus>) -> Self {
        Self {
            statuses,
            reject_submit: false,
            polls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
            terminated: Mutex::new(Vec::new()),
        }
    }

    /// Every submission fails.
    pub fn rejecting() -> Self {
        Self {
            reject_submit: true,
            ..Self::new(vec![])
        }
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<WorkflowParams> {
        self.submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn terminated(&self) -> Vec<WorkflowHandle> {
        self.terminated
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl WorkflowEngine for ScriptedEngine {
    async fn submit(&self, params: WorkflowParams) -> Result<WorkflowHandle, AgentError> {
        if self.reject_submit {
            return Err(AgentError::Submit("engine binding unavailable".to_string()));
        }
        self.submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(params);
        Ok(WorkflowHandle("scripted-1".to_string()))
    }

    async fn status(&self, _handle: &WorkflowHandle) -> Result<WorkflowStatus, AgentError> {
        let n = self.polls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .get(n.min(self.statuses.len().saturating_sub(1)))
            .cloned()
            .ok_or_else(|| AgentError::Poll("no scripted status".to_string()))
    }

    async fn terminate(&self, handle: &WorkflowHandle) -> Result<(), AgentError> {
        self.terminated
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(handle.clone());
        Ok(())
    }
}

/// An advisor over scripted sources with a cache frozen at [`fixed_now`].
pub fn advisor_with(
    spots: StaticSpots,
    forecasts: StaticForecasts,
    model: Arc<dyn LanguageModel>,
    chat_model: Option<&str>,
) -> Advisor {
    let cache = Arc::new(PromptCache::new(Arc::new(ManualClock::new(fixed_now()))));
    let context = ContextBuilder::new(
        Arc::new(spots),
        Arc::new(forecasts),
        cache,
        ContextConfig::default(),
    );
    Advisor::new(context, model, chat_model)
}
