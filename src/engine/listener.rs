//! Listener supervisor
//!
//! Event-trigger components run as persistent background listeners instead
//! of one-shot actions. The supervisor owns one dedicated task per active
//! listener: it opens the underlying subscription, filters inbound events,
//! and runs the workflow's action order synchronously for each qualifying
//! event with a fresh context, until stopped, timed out, or faulted.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::engine::error::EngineError;
use crate::engine::executor::Executor;
use crate::registry::IntegrationError;
use crate::workflow::{WorkflowContext, WorkflowDefinition};

/// Lifecycle of a persistent listener.
///
/// `Idle -> Starting -> Listening -> (Triggering <-> Listening) -> Stopping
/// -> Stopped`, with `Errored` terminal from `Starting` or `Listening`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Starting,
    Listening,
    Triggering,
    Stopping,
    Stopped,
    Errored,
}

/// An inbound event from a subscription, before filtering.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub channel: String,
    pub user_id: String,
    pub text: String,
    pub timestamp: String,
}

impl InboundEvent {
    /// The event payload under the trigger's default output keys.
    pub fn into_payload(self) -> HashMap<String, String> {
        let mut payload = HashMap::new();
        payload.insert("message_text".to_string(), self.text);
        payload.insert("user_id".to_string(), self.user_id);
        payload.insert("channel".to_string(), self.channel);
        payload.insert("timestamp".to_string(), self.timestamp);
        payload
    }
}

/// A long-lived subscription to an event stream.
///
/// `next_event` blocks until an event arrives; the supervisor cancels at its
/// await points. `disconnect` is called on every exit path.
#[async_trait]
pub trait EventSource: Send {
    async fn connect(&mut self) -> Result<(), IntegrationError>;
    async fn next_event(&mut self) -> Result<InboundEvent, IntegrationError>;
    async fn disconnect(&mut self);
}

/// Channel/keyword filter applied to inbound events before triggering.
#[derive(Debug, Clone, Default)]
pub struct TriggerFilter {
    pub channel: Option<String>,
    pub keyword: Option<String>,
}

impl TriggerFilter {
    /// Read `channel` and `keyword` parameters from a trigger's config.
    pub fn from_config(config: &HashMap<String, String>) -> Self {
        Self {
            channel: config.get("channel").cloned(),
            keyword: config.get("keyword").cloned(),
        }
    }

    pub fn matches(&self, event: &InboundEvent) -> bool {
        if let Some(channel) = &self.channel {
            if channel != &event.channel {
                return false;
            }
        }
        if let Some(keyword) = &self.keyword {
            if !event.text.to_lowercase().contains(&keyword.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Handle to a running listener: observes its state, requests cooperative
/// shutdown, and joins the background task.
pub struct ListenerHandle {
    state: watch::Receiver<ListenerState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    /// Wait until the listener reaches `target`. Returns false if the
    /// listener task ended without ever reaching it.
    pub async fn wait_for(&mut self, target: ListenerState) -> bool {
        if *self.state.borrow() == target {
            return true;
        }
        self.state.wait_for(|s| *s == target).await.is_ok()
    }

    /// Wait for the next state transition. Returns `None` once the listener
    /// task has ended and no further transitions can occur.
    pub async fn changed(&mut self) -> Option<ListenerState> {
        self.state.changed().await.ok()?;
        Some(*self.state.borrow())
    }

    /// Request a cooperative stop; an in-flight triggered run finishes first.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stop and wait for the background task to release its resources.
    pub async fn shutdown(self) -> ListenerState {
        self.cancel.cancel();
        let _ = self.task.await;
        *self.state.borrow()
    }

    /// Wait for the task to end on its own (deadline, stop, or error).
    pub async fn join(self) -> ListenerState {
        let _ = self.task.await;
        *self.state.borrow()
    }
}

pub struct ListenerSupervisor {
    executor: Arc<Executor>,
}

impl ListenerSupervisor {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }

    /// Start a persistent listener for `def`'s trigger.
    ///
    /// `order` is the full scheduled order; the trigger is skipped and only
    /// the action tail executes per event. The trigger's config supplies the
    /// filter and the overall deadline: `timeout` in seconds, `-1` (the
    /// default) listens until explicitly stopped.
    pub fn start(
        &self,
        def: WorkflowDefinition,
        order: &[String],
        source: Box<dyn EventSource>,
    ) -> Result<ListenerHandle, EngineError> {
        let trigger = def
            .trigger()
            .ok_or_else(|| EngineError::InvalidDefinition("workflow has no trigger".into()))?;

        let timeout: i64 = match trigger.config.get("timeout") {
            Some(raw) => raw.parse().map_err(|_| EngineError::InvalidConfig {
                type_id: trigger.type_id.clone(),
                reason: format!("timeout must be an integer, got '{}'", raw),
            })?,
            None => -1,
        };

        let filter = TriggerFilter::from_config(&trigger.config);
        let trigger_id = trigger.id.clone();
        let trigger_spec = self
            .executor
            .registry()
            .spec(&trigger.type_id)
            .ok_or_else(|| EngineError::UnknownComponentType(trigger.type_id.clone()))?
            .clone();

        let action_order: Vec<String> = order
            .iter()
            .filter(|id| **id != trigger_id)
            .cloned()
            .collect();

        let (state_tx, state_rx) = watch::channel(ListenerState::Idle);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let executor = Arc::clone(&self.executor);

        let task = tokio::spawn(async move {
            run_listener(
                def,
                trigger_id,
                trigger_spec,
                action_order,
                source,
                filter,
                timeout,
                executor,
                state_tx,
                task_cancel,
            )
            .await;
        });

        Ok(ListenerHandle {
            state: state_rx,
            cancel,
            task,
        })
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_listener(
    def: WorkflowDefinition,
    trigger_id: String,
    trigger_spec: crate::registry::ComponentSpec,
    action_order: Vec<String>,
    mut source: Box<dyn EventSource>,
    filter: TriggerFilter,
    timeout: i64,
    executor: Arc<Executor>,
    state: watch::Sender<ListenerState>,
    cancel: CancellationToken,
) {
    let _ = state.send(ListenerState::Starting);
    if let Err(e) = source.connect().await {
        error!(workflow = %def.name, error = %e, "listener failed to connect");
        source.disconnect().await;
        let _ = state.send(ListenerState::Errored);
        return;
    }

    let deadline = if timeout >= 0 {
        Some(tokio::time::Instant::now() + Duration::from_secs(timeout as u64))
    } else {
        None
    };

    info!(
        workflow = %def.name,
        persistent = deadline.is_none(),
        "listener active"
    );
    let _ = state.send(ListenerState::Listening);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(workflow = %def.name, "listener stop requested");
                break;
            }
            _ = deadline_elapsed(deadline) => {
                info!(workflow = %def.name, timeout, "listener deadline expired");
                break;
            }
            event = source.next_event() => {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        error!(workflow = %def.name, error = %e, "listener connection fault");
                        source.disconnect().await;
                        let _ = state.send(ListenerState::Errored);
                        return;
                    }
                };

                if !filter.matches(&event) {
                    continue;
                }

                let _ = state.send(ListenerState::Triggering);

                // Fresh context per trigger event, seeded with the payload
                // under the trigger's (aliased) declared output keys.
                let context = WorkflowContext::new();
                let payload = event.into_payload();
                if let Some(trigger) = def.instance(&trigger_id) {
                    for key in &trigger_spec.outputs {
                        if let Some(value) = payload.get(key) {
                            context.set(trigger.effective_output_key(key), value.clone());
                        }
                    }
                }

                let result = executor.run(&def, &action_order, &context).await;
                if let Some(failure) = &result.failure {
                    // A downstream failure does not stop the listener.
                    warn!(
                        workflow = %def.name,
                        run_id = %result.run_id,
                        instance = %failure.instance_id,
                        error = %failure.error,
                        "triggered run failed, resuming listening"
                    );
                }

                let _ = state.send(ListenerState::Listening);
            }
        }
    }

    let _ = state.send(ListenerState::Stopping);
    source.disconnect().await;
    let _ = state.send(ListenerState::Stopped);
}

async fn deadline_elapsed(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
