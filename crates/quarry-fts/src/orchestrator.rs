//! Write work orchestrator.
//!
//! The orchestrator puts a bounded queue in front of a
//! [`WriteWorkProcessor`] and drives it from a single tokio task:
//!
//! 1. wait for the next work set (or for a deferred commit to become due)
//! 2. open a batch, run that work set and every work set already queued
//! 3. end the batch, which commits changes no workset committed
//!
//! Submitters await the outcome of their own work set only.

use std::fmt;
use std::sync::Arc;

use quarry_core::{Error, EventContext, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::processor::WriteWorkProcessor;
use crate::types::{DocumentCommitStrategy, DocumentRefreshStrategy, WorkSetResult};
use crate::work::{DocumentWork, WriteWork};
use crate::workset::{ChangesetWorkSet, SingleWorkSet, WorkSet, WorkSetReceiver};

/// Serialized queue of work sets for one index.
pub struct WriteWorkOrchestrator {
    event_context: EventContext,
    sender: mpsc::Sender<Box<dyn WorkSet>>,
    worker: JoinHandle<Result<()>>,
}

impl WriteWorkOrchestrator {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// At most `queue_size` work sets wait in the queue and run in one batch.
    pub fn start(processor: WriteWorkProcessor, queue_size: usize) -> Self {
        let queue_size = queue_size.max(1);
        let event_context = processor.event_context().clone();
        let (sender, receiver) = mpsc::channel(queue_size);
        let worker = tokio::spawn(run_worker(processor, receiver, queue_size));
        log::debug!("Started write worker for {event_context} (queue size {queue_size})");

        Self {
            event_context,
            sender,
            worker,
        }
    }

    /// Identity of the index this orchestrator writes to.
    pub fn event_context(&self) -> &EventContext {
        &self.event_context
    }

    /// Queue a single work and wait for its outcome.
    pub async fn submit<K>(
        &self,
        work: K,
        commit_strategy: DocumentCommitStrategy,
        refresh_strategy: DocumentRefreshStrategy,
    ) -> WorkSetResult<K::Output>
    where
        K: WriteWork + 'static,
    {
        let (work_set, receiver) = SingleWorkSet::new(work, commit_strategy, refresh_strategy);
        self.enqueue(Box::new(work_set)).await?;
        self.outcome(receiver).await
    }

    /// Queue several document works as one workset and wait for its outcome.
    pub async fn submit_changeset(
        &self,
        works: Vec<DocumentWork>,
        commit_strategy: DocumentCommitStrategy,
        refresh_strategy: DocumentRefreshStrategy,
    ) -> WorkSetResult<()> {
        let (work_set, receiver) = ChangesetWorkSet::new(works, commit_strategy, refresh_strategy);
        self.enqueue(Box::new(work_set)).await?;
        self.outcome(receiver).await
    }

    /// Stop accepting work, run everything queued, then close the processor.
    pub async fn close(self) -> Result<()> {
        let Self {
            event_context,
            sender,
            worker,
        } = self;
        drop(sender);

        log::debug!("Waiting for the write worker of {event_context} to drain");
        worker.await.map_err(|e| {
            Error::operation(format!("Write worker for {event_context} terminated abnormally: {e}"))
        })?
    }

    async fn enqueue(&self, work_set: Box<dyn WorkSet>) -> WorkSetResult<()> {
        self.sender
            .send(work_set)
            .await
            .map_err(|_| Arc::new(Error::closed(self.event_context.clone())))
    }

    async fn outcome<T>(&self, receiver: WorkSetReceiver<T>) -> WorkSetResult<T> {
        receiver.await.unwrap_or_else(|_| {
            Err(Arc::new(Error::operation(format!(
                "Work set on {} was dropped before completion",
                self.event_context
            ))))
        })
    }
}

impl fmt::Debug for WriteWorkOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteWorkOrchestrator")
            .field("event_context", &self.event_context)
            .field("queued", &(self.sender.max_capacity() - self.sender.capacity()))
            .field("finished", &self.worker.is_finished())
            .finish()
    }
}

async fn run_worker(
    mut processor: WriteWorkProcessor,
    mut receiver: mpsc::Receiver<Box<dyn WorkSet>>,
    batch_limit: usize,
) -> Result<()> {
    loop {
        let next = match processor.pending_commit_delay() {
            Some(delay) => match timeout(delay, receiver.recv()).await {
                Ok(next) => next,
                Err(_elapsed) => {
                    processor.commit_pending();
                    continue;
                }
            },
            None => receiver.recv().await,
        };

        let Some(first) = next else {
            break;
        };
        run_batch(&mut processor, first, &mut receiver, batch_limit);
    }

    log::debug!("Write queue of {} closed", processor.event_context());
    processor.close()
}

fn run_batch(
    processor: &mut WriteWorkProcessor,
    first: Box<dyn WorkSet>,
    receiver: &mut mpsc::Receiver<Box<dyn WorkSet>>,
    batch_limit: usize,
) {
    if let Err(e) = processor.begin_batch() {
        log::error!("Unable to start a batch: {e}");
        first.fail(Arc::new(e));
        return;
    }

    let mut work_set = first;
    let mut count = 0;
    loop {
        if let Err(e) = work_set.submit_to(processor) {
            log::error!("Work set rejected by {}: {e}", processor.event_context());
        }
        count += 1;
        if count >= batch_limit {
            break;
        }
        match receiver.try_recv() {
            Ok(next) => work_set = next,
            Err(_) => break,
        }
    }

    log::trace!("Ran {count} work set(s) on {}", processor.event_context());
    if let Err(e) = processor.end_batch() {
        log::error!("Unable to end a batch: {e}");
    }
}

// ============================================================================
// Tests
// ============================================================================
