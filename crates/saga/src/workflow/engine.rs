//! Local durable-execution engine.
//!
//! Each execution runs as one tokio task that owns its state. Signals are
//! delivered on a single per-execution channel and handled one at a time in
//! arrival order; queries read a watch snapshot and never wait on the task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Aggregate, DomainEvent};
use event_store::{AppendOptions, EventEnvelope, EventStore, EventStoreError, Version};
use tokio::sync::{RwLock, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{Result, SagaError};
use crate::steps;
use crate::workflow::activities::WorkflowActivities;
use crate::workflow::events::{ExecutionStartedData, WorkflowEvent};
use crate::workflow::signals::{DEFAULT_TASK_QUEUE, OrderSignal, QUERY_ORDER_BY_ID, StartOrder};
use crate::workflow::state::OrderWorkflowState;

/// Pending signals buffered per execution.
const SIGNAL_BUFFER: usize = 32;

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Queue name recorded on executions started without an explicit one.
    pub task_queue: String,
    /// Maximum duration of an execution, measured from its start.
    pub run_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            task_queue: DEFAULT_TASK_QUEUE.to_string(),
            run_timeout: Duration::from_secs(600),
        }
    }
}

/// Returned by a successful start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionHandle {
    pub execution_id: AggregateId,
    pub task_queue: String,
}

/// What the order saga needs from a durable-execution substrate.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Starts an execution. The placement step runs before this returns, so
    /// the order is `Placed` once the handle is available.
    async fn start_execution(
        &self,
        id: AggregateId,
        task_queue: &str,
        input: StartOrder,
    ) -> Result<ExecutionHandle>;

    /// Delivers a signal and waits until it has been journaled and applied.
    async fn signal_execution(&self, id: AggregateId, signal: OrderSignal) -> Result<()>;

    /// Answers a named query from the execution's current state.
    async fn query_execution(&self, id: AggregateId, query: &str) -> Result<serde_json::Value>;
}

struct Inbound {
    signal: OrderSignal,
    ack: oneshot::Sender<Result<()>>,
}

struct ExecutionSlot {
    inbox: mpsc::Sender<Inbound>,
    state: watch::Receiver<OrderWorkflowState>,
    task: Option<JoinHandle<()>>,
}

struct EngineInner<E, A> {
    store: E,
    activities: Arc<A>,
    config: EngineConfig,
    executions: RwLock<HashMap<AggregateId, ExecutionSlot>>,
}

/// In-process engine journaling executions to an [`EventStore`].
///
/// Clones share the same executions.
pub struct LocalEngine<E, A> {
    inner: Arc<EngineInner<E, A>>,
}

impl<E, A> Clone for LocalEngine<E, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E, A> LocalEngine<E, A>
where
    E: EventStore + Clone + 'static,
    A: WorkflowActivities,
{
    pub fn new(store: E, activities: A, config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store,
                activities: Arc::new(activities),
                config,
                executions: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Rebuilds every journaled execution and resumes those still running.
    ///
    /// Returns the number of resumed executions. Executions waiting for
    /// settlement are held when the activities cannot settle.
    #[tracing::instrument(skip(self))]
    pub async fn recover(&self) -> Result<usize> {
        let ids = self
            .inner
            .store
            .list_aggregate_ids(OrderWorkflowState::aggregate_type())
            .await?;

        let (mut resumed, mut held) = (0, 0);
        for id in ids {
            if self.inner.executions.read().await.contains_key(&id) {
                continue;
            }
            let envelopes = self.inner.store.get_events_for_aggregate(id).await?;
            let events = envelopes
                .iter()
                .map(EventEnvelope::decode::<WorkflowEvent>)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let state = OrderWorkflowState::replay(events);
            if self.is_held(&state) {
                held += 1;
                tracing::warn!(execution_id = %id, "settlement pending, execution not resumed");
            } else if state.is_running() {
                resumed += 1;
            }
            self.install(id, state).await;
        }

        tracing::info!(resumed, held, "executions recovered");
        Ok(resumed)
    }

    /// Stops every execution task. Journaled state is kept.
    pub async fn shutdown(&self) {
        let slots: Vec<ExecutionSlot> = self
            .inner
            .executions
            .write()
            .await
            .drain()
            .map(|(_, slot)| slot)
            .collect();

        for task in slots.into_iter().filter_map(|slot| slot.task) {
            task.abort();
            let _ = task.await;
        }
    }

    /// A delivered execution whose settlement these activities cannot run.
    fn is_held(&self, state: &OrderWorkflowState) -> bool {
        state.needs_settlement() && !self.inner.activities.can_settle()
    }

    /// Registers an execution and spawns its task if it is still running.
    ///
    /// Held executions stay queryable but get no task, so they reject
    /// signals until an engine that can settle recovers them.
    async fn install(&self, id: AggregateId, state: OrderWorkflowState) {
        let deadline = self.deadline(state.started_at());
        let (publisher, receiver) = watch::channel(state.clone());
        let (inbox, signals) = mpsc::channel(SIGNAL_BUFFER);

        let task = (state.is_running() && !self.is_held(&state)).then(|| {
            let execution = Execution {
                id,
                state,
                store: self.inner.store.clone(),
                activities: Arc::clone(&self.inner.activities),
                publisher,
            };
            tokio::spawn(execution.run(signals, deadline))
        });

        self.inner.executions.write().await.insert(
            id,
            ExecutionSlot {
                inbox,
                state: receiver,
                task,
            },
        );
    }

    fn deadline(&self, started_at: Option<DateTime<Utc>>) -> Instant {
        let elapsed = started_at
            .and_then(|start| (Utc::now() - start).to_std().ok())
            .unwrap_or_default();
        Instant::now() + self.inner.config.run_timeout.saturating_sub(elapsed)
    }
}

#[async_trait]
impl<E, A> WorkflowEngine for LocalEngine<E, A>
where
    E: EventStore + Clone + 'static,
    A: WorkflowActivities,
{
    #[tracing::instrument(skip(self, input))]
    async fn start_execution(
        &self,
        id: AggregateId,
        task_queue: &str,
        input: StartOrder,
    ) -> Result<ExecutionHandle> {
        let registered = self.inner.executions.read().await.contains_key(&id);
        if registered || self.inner.store.get_aggregate_version(id).await?.is_some() {
            return Err(SagaError::ExecutionAlreadyStarted(id));
        }

        let now = Utc::now();
        let placement = steps::place(
            &input.command(id),
            &input.product,
            &input.customer_wallet,
            now,
        );
        let started = WorkflowEvent::ExecutionStarted(ExecutionStartedData {
            execution_id: id,
            task_queue: task_queue.to_string(),
            input,
            started_at: now,
        });
        let (events, failure) = match placement {
            Ok(placement) => (vec![started, WorkflowEvent::OrderPlaced(placement)], None),
            Err(err) => (
                vec![started, WorkflowEvent::failed(err.to_string(), now)],
                Some(err),
            ),
        };

        let state = OrderWorkflowState::default();
        let envelopes = envelopes(id, state.version(), &events)?;
        self.inner
            .store
            .append(envelopes, AppendOptions::expect_new())
            .await
            .map_err(|err| match err {
                EventStoreError::ConcurrencyConflict { .. } => {
                    SagaError::ExecutionAlreadyStarted(id)
                }
                other => SagaError::EventStore(other),
            })?;

        let state = OrderWorkflowState::replay(events);
        metrics::counter!("workflow_executions_started_total").increment(1);
        self.install(id, state).await;

        if let Some(err) = failure {
            metrics::counter!("workflow_executions_failed_total").increment(1);
            tracing::warn!(execution_id = %id, error = %err, "order placement failed");
            return Err(err);
        }

        tracing::info!(execution_id = %id, task_queue, "execution started");
        Ok(ExecutionHandle {
            execution_id: id,
            task_queue: task_queue.to_string(),
        })
    }

    #[tracing::instrument(skip(self, signal), fields(signal = signal.name()))]
    async fn signal_execution(&self, id: AggregateId, signal: OrderSignal) -> Result<()> {
        let inbox = self
            .inner
            .executions
            .read()
            .await
            .get(&id)
            .map(|slot| slot.inbox.clone())
            .ok_or(SagaError::ExecutionNotFound(id))?;

        let (ack, reply) = oneshot::channel();
        inbox
            .send(Inbound { signal, ack })
            .await
            .map_err(|_| SagaError::ExecutionClosed(id))?;
        reply.await.map_err(|_| SagaError::ExecutionClosed(id))?
    }

    async fn query_execution(&self, id: AggregateId, query: &str) -> Result<serde_json::Value> {
        if query != QUERY_ORDER_BY_ID {
            return Err(SagaError::UnknownQuery(query.to_string()));
        }

        let state = self
            .inner
            .executions
            .read()
            .await
            .get(&id)
            .map(|slot| slot.state.borrow().clone())
            .ok_or(SagaError::ExecutionNotFound(id))?;
        Ok(serde_json::to_value(&state)?)
    }
}

/// Wraps events for appending after `current`.
fn envelopes(
    id: AggregateId,
    current: Version,
    events: &[WorkflowEvent],
) -> Result<Vec<EventEnvelope>> {
    let mut version = current;
    events
        .iter()
        .map(|event| {
            version = version.next();
            EventEnvelope::new(
                id,
                OrderWorkflowState::aggregate_type(),
                event.event_type(),
                version,
                event,
            )
            .map_err(SagaError::from)
        })
        .collect()
}

/// A running execution, owned by its task.
struct Execution<E, A> {
    id: AggregateId,
    state: OrderWorkflowState,
    store: E,
    activities: Arc<A>,
    publisher: watch::Sender<OrderWorkflowState>,
}

impl<E, A> Execution<E, A>
where
    E: EventStore,
    A: WorkflowActivities,
{
    async fn run(mut self, mut signals: mpsc::Receiver<Inbound>, deadline: Instant) {
        // Delivery may have been journaled just before a restart.
        if self.state.needs_settlement()
            && let Err(err) = self.settle().await
        {
            tracing::warn!(execution_id = %self.id, error = %err, "resumed settlement failed");
        }

        while self.state.is_running() {
            tokio::select! {
                message = signals.recv() => {
                    let Some(Inbound { signal, ack }) = message else {
                        break;
                    };
                    let result = self.handle(signal).await;
                    let _ = ack.send(result);
                }
                _ = tokio::time::sleep_until(deadline) => {
                    self.fail("execution timed out").await;
                }
            }
        }
    }

    async fn handle(&mut self, signal: OrderSignal) -> Result<()> {
        metrics::counter!("workflow_signals_total", "signal" => signal.name()).increment(1);

        let events = match self.state.decide(&signal, Utc::now()) {
            Ok(events) => events,
            Err(err) => {
                self.fail(&format!("{} rejected: {err}", signal.name())).await;
                return Err(err);
            }
        };
        self.journal(events).await?;
        tracing::info!(
            execution_id = %self.id,
            signal = signal.name(),
            status = ?self.state.status(),
            "signal applied"
        );

        if self.state.needs_settlement() {
            self.settle().await?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(execution_id = %self.id, step = steps::STEP_SETTLE))]
    async fn settle(&mut self) -> Result<()> {
        match self.activities.settle(&self.state).await {
            Ok(payout) => {
                self.journal(vec![
                    WorkflowEvent::Settled { payout },
                    WorkflowEvent::ExecutionCompleted { at: Utc::now() },
                ])
                .await?;
                metrics::counter!("workflow_executions_completed_total").increment(1);
                self.record_duration();
                tracing::info!(execution_id = %self.id, "execution completed");
                Ok(())
            }
            Err(err) => {
                self.fail(&format!("settlement failed: {err}")).await;
                Err(err)
            }
        }
    }

    /// Fails the execution terminally. The order status stays where it is.
    ///
    /// The failure takes effect in memory even if it cannot be journaled;
    /// replay after a restart then reaches the same failure again.
    async fn fail(&mut self, reason: &str) {
        let failed = WorkflowEvent::failed(reason, Utc::now());
        if self.journal(vec![failed.clone()]).await.is_err() {
            self.state.apply_events(vec![failed]);
            self.publisher.send_replace(self.state.clone());
        }
        metrics::counter!("workflow_executions_failed_total").increment(1);
        self.record_duration();
        tracing::warn!(execution_id = %self.id, reason, "execution failed");
    }

    /// Appends events with an optimistic version check, then applies them
    /// and publishes the new state.
    async fn journal(&mut self, events: Vec<WorkflowEvent>) -> Result<()> {
        let current = self.state.version();
        let envelopes = envelopes(self.id, current, &events)?;
        if let Err(err) = self
            .store
            .append(envelopes, AppendOptions::expect_version(current))
            .await
        {
            tracing::error!(execution_id = %self.id, error = %err, "journal write failed");
            return Err(err.into());
        }

        self.state.apply_events(events);
        self.publisher.send_replace(self.state.clone());
        Ok(())
    }

    fn record_duration(&self) {
        if let Some(started_at) = self.state.started_at()
            && let Ok(elapsed) = (Utc::now() - started_at).to_std()
        {
            metrics::histogram!("workflow_duration_seconds").record(elapsed.as_secs_f64());
        }
    }
}
