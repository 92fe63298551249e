//! Retry monitor — republishes commands whose status echo never came.
//!
//! Each flush hands its published commands to [`RetryMonitor::schedule`],
//! which spawns one deferred check onto a supervised task set. The check
//! sleeps for the retry delay without holding any lock, then republishes
//! every still-unconfirmed command exactly once.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinSet;

use crate::ack_tracker::{AckTracker, PendingAck};
use crate::ports::MeshTransport;
use crate::ports::transport::bounded;

use meshlight_domain::message::ControlMessage;

/// Summary of one deferred check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReport {
    pub checked: usize,
    pub republished: usize,
}

pub struct RetryMonitor<T> {
    transport: Arc<T>,
    acks: Arc<AckTracker>,
    delay: Duration,
    publish_timeout: Duration,
    tasks: Mutex<JoinSet<RetryReport>>,
}

impl<T: MeshTransport> RetryMonitor<T> {
    #[must_use]
    pub fn new(
        transport: Arc<T>,
        acks: Arc<AckTracker>,
        delay: Duration,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            acks,
            delay,
            publish_timeout,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<RetryReport>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedule the deferred check for a freshly flushed batch.
    pub fn schedule(&self, pending: Vec<PendingAck>) {
        if pending.is_empty() {
            return;
        }
        let mut tasks = self.tasks();
        while let Some(finished) = tasks.try_join_next() {
            log_finished(finished);
        }
        tasks.spawn(check(
            Arc::clone(&self.transport),
            Arc::clone(&self.acks),
            self.delay,
            self.publish_timeout,
            pending,
        ));
    }

    /// Number of checks that have not been reaped yet.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.tasks().len()
    }

    /// Wait for every scheduled check to finish.
    pub async fn shutdown(&self) -> RetryReport {
        let mut tasks = std::mem::take(&mut *self.tasks());
        let mut total = RetryReport::default();
        while let Some(finished) = tasks.join_next().await {
            if let Some(report) = log_finished(finished) {
                total.checked += report.checked;
                total.republished += report.republished;
            }
        }
        total
    }
}

fn log_finished(finished: Result<RetryReport, tokio::task::JoinError>) -> Option<RetryReport> {
    match finished {
        Ok(report) => Some(report),
        Err(err) => {
            tracing::error!(error = %err, "retry check failed");
            None
        }
    }
}

async fn check<T: MeshTransport>(
    transport: Arc<T>,
    acks: Arc<AckTracker>,
    delay: Duration,
    publish_timeout: Duration,
    pending: Vec<PendingAck>,
) -> RetryReport {
    tokio::time::sleep(delay).await;

    let mut report = RetryReport {
        checked: pending.len(),
        republished: 0,
    };
    for ack in pending {
        if acks.is_confirmed(&ack) {
            continue;
        }
        let destination = ack.command.destination;
        tracing::warn!(
            %destination,
            op_code = %ack.command.op_code,
            waited = ?ack.armed_at.elapsed(),
            "no status echo, republishing once"
        );
        let message = ControlMessage::from(&ack.command);
        match bounded(publish_timeout, transport.publish_control(&message)).await {
            Ok(()) => report.republished += 1,
            Err(err) => tracing::warn!(%destination, error = %err, "retry publish failed"),
        }
    }
    report
}
