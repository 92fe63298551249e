//! Outbound queue — debounces control calls into serialized batches.
//!
//! A batch goes `Idle → Collecting → Flushing → Idle`. The first command
//! submitted while idle opens a batch and spawns its flush task; commands
//! submitted during the debounce window join it. One lock covers both
//! appending and flushing, so a batch is fully published before the next
//! one starts collecting. The debounce sleep itself never holds the lock.

use std::sync::Arc;
use std::time::Duration;

use meshlight_domain::command::OutboundCommand;
use meshlight_domain::device::GroupIndex;
use meshlight_domain::message::ControlMessage;
use tokio::sync::{Mutex, watch};

use crate::ack_tracker::AckTracker;
use crate::error::QueueError;
use crate::grouping;
use crate::ports::MeshTransport;
use crate::ports::transport::bounded;
use crate::retry::{RetryMonitor, RetryReport};

/// Timing knobs of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// How long a batch collects commands before flushing.
    pub debounce: Duration,
    /// Upper bound for a single publish.
    pub publish_timeout: Duration,
    /// Delay before unconfirmed commands are republished.
    pub retry_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(50),
            publish_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_secs(3),
        }
    }
}

/// `None` until the batch has been flushed.
type BatchOutcome = Option<Result<(), QueueError>>;

#[derive(Default)]
struct QueueState {
    pending: Vec<OutboundCommand>,
    batch: Option<watch::Sender<BatchOutcome>>,
}

struct Inner<T> {
    transport: Arc<T>,
    groups: GroupIndex,
    acks: Arc<AckTracker>,
    retries: RetryMonitor<T>,
    config: QueueConfig,
    state: Mutex<QueueState>,
}

/// Shared handle on the queue; clones address the same queue.
pub struct OutboundQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for OutboundQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: MeshTransport> OutboundQueue<T> {
    #[must_use]
    pub fn new(
        transport: Arc<T>,
        groups: GroupIndex,
        acks: Arc<AckTracker>,
        config: QueueConfig,
    ) -> Self {
        let retries = RetryMonitor::new(
            Arc::clone(&transport),
            Arc::clone(&acks),
            config.retry_delay,
            config.publish_timeout,
        );
        Self {
            inner: Arc::new(Inner {
                transport,
                groups,
                acks,
                retries,
                config,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// Queue a command and wait for the batch it joined to be flushed.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Publish`] when any command of the batch failed
    /// to publish, or [`QueueError::Aborted`] if the flush task died.
    pub async fn submit(&self, command: OutboundCommand) -> Result<(), QueueError> {
        let mut outcome = {
            let mut state = self.inner.state.lock().await;
            state.pending.push(command);
            match &state.batch {
                Some(batch) => batch.subscribe(),
                None => {
                    let (batch, outcome) = watch::channel(None);
                    state.batch = Some(batch);
                    tokio::spawn(Arc::clone(&self.inner).run_batch());
                    outcome
                }
            }
        };

        match outcome.wait_for(Option::is_some).await {
            Ok(result) => result.clone().unwrap_or(Err(QueueError::Aborted)),
            Err(_) => Err(QueueError::Aborted),
        }
    }

    /// Wait for every outstanding retry check.
    pub async fn shutdown(&self) -> RetryReport {
        self.inner.retries.shutdown().await
    }
}

impl<T: MeshTransport> Inner<T> {
    async fn run_batch(self: Arc<Self>) {
        tokio::time::sleep(self.config.debounce).await;

        let mut state = self.state.lock().await;
        let pending = std::mem::take(&mut state.pending);
        let batch = state.batch.take();
        let outcome = self.flush(pending).await;
        drop(state);

        if let Some(batch) = batch {
            batch.send_replace(Some(outcome));
        }
    }

    async fn flush(&self, pending: Vec<OutboundCommand>) -> Result<(), QueueError> {
        let submitted = pending.len();
        let commands = grouping::compact(pending, &self.groups);

        let mut armed = Vec::with_capacity(commands.len());
        let mut failure = None;
        for command in commands {
            let destination = command.destination;
            tracing::debug!(
                %destination,
                op_code = %command.op_code,
                data = %command.payload,
                "publishing command"
            );
            let message = ControlMessage::from(&command);
            // Echoes handled while the publish is in flight must count.
            let ack = self.acks.arm(command);
            let published = bounded(
                self.config.publish_timeout,
                self.transport.publish_control(&message),
            )
            .await;
            match published {
                Ok(()) => armed.push(ack),
                Err(err) => {
                    tracing::error!(%destination, error = %err, "failed to publish command");
                    failure.get_or_insert(QueueError::Publish {
                        destination,
                        source: Arc::new(err),
                    });
                }
            }
        }

        tracing::info!(submitted, published = armed.len(), "flushed outbound batch");
        self.retries.schedule(armed);
        failure.map_or(Ok(()), Err)
    }
}
