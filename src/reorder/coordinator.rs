use std::mem;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep_until, Duration, Instant};

use crate::api::RecordBackend;
use crate::error::{DeskError, Result};
use crate::notify::Notifier;
use crate::store::{StoreSnapshot, ViewStore};

/// Messages accepted by the coordinator loop
#[derive(Debug)]
pub enum ReorderMessage {
    /// Move one record locally and (re)arm the commit timer
    Move {
        from: usize,
        to: usize,
        response_tx: oneshot::Sender<bool>,
    },
    /// Commit the pending batch now instead of waiting for the timer
    Flush {
        response_tx: oneshot::Sender<CommitOutcome>,
    },
}

/// Result of one bulk commit attempt.
#[derive(Debug, Clone)]
pub enum CommitOutcome {
    /// No reorder was pending.
    Idle,
    /// The collection was empty, had no department or was reset since the
    /// batch started; nothing was sent.
    Skipped,
    /// The server accepted the order and the store was refetched.
    Committed,
    /// The server refused; the store is back to the pre-batch snapshot.
    RolledBack(Arc<DeskError>),
    /// The server refused after the store was reset (logout, department
    /// switch). Nothing was restored.
    Discarded(Arc<DeskError>),
}

/// A bulk commit running on its own task.
struct InFlight {
    snapshot: StoreSnapshot,
    task: JoinHandle<Result<()>>,
}

enum Begin {
    Started(InFlight),
    Done(CommitOutcome),
}

/// Owns the debounce timer and rollback snapshot for one reorderable store.
///
/// Reorders apply to the store immediately. The bulk commit goes out once
/// no reorder has arrived for `debounce`, so a burst of clicks costs a
/// single request. The snapshot is captured before the first reorder of a
/// batch and restored as a whole if the commit fails.
///
/// The commit runs on a spawned task, so moves keep being applied while it
/// is in flight. They start the next batch, which goes out after the
/// current commit settles. A failed commit rolls back to its own snapshot,
/// which undoes the moves made since as well, so that next batch is dropped.
pub struct ReorderCoordinator {
    store: ViewStore,
    backend: Arc<dyn RecordBackend>,
    notifier: Notifier,
    debounce: Duration,
    snapshot: Option<StoreSnapshot>,
    deadline: Option<Instant>,
    /// The pending batch should go out as soon as nothing is in flight.
    due: bool,
    in_flight: Option<InFlight>,
    /// Flushes answered when the in-flight commit settles.
    waiters: Vec<oneshot::Sender<CommitOutcome>>,
    /// Flushes answered when the pending batch settles.
    next_waiters: Vec<oneshot::Sender<CommitOutcome>>,
}

impl ReorderCoordinator {
    pub fn new(
        store: ViewStore,
        backend: Arc<dyn RecordBackend>,
        notifier: Notifier,
        debounce: Duration,
    ) -> (Self, ReorderHandle, mpsc::Receiver<ReorderMessage>) {
        let (tx, rx) = mpsc::channel(64);
        let coordinator = Self {
            store,
            backend,
            notifier,
            debounce,
            snapshot: None,
            deadline: None,
            due: false,
            in_flight: None,
            waiters: Vec::new(),
            next_waiters: Vec::new(),
        };
        (coordinator, ReorderHandle { tx }, rx)
    }

    /// Build a coordinator and run it on its own task.
    pub fn spawn(
        store: ViewStore,
        backend: Arc<dyn RecordBackend>,
        notifier: Notifier,
        debounce: Duration,
    ) -> ReorderHandle {
        let (coordinator, handle, rx) = Self::new(store, backend, notifier, debounce);
        tokio::spawn(coordinator.run(rx));
        handle
    }

    /// Run until every handle is dropped. A batch still pending at that
    /// point is committed before returning.
    pub async fn run(mut self, mut rx: mpsc::Receiver<ReorderMessage>) {
        loop {
            let deadline = self.deadline;

            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Some(ReorderMessage::Move { from, to, response_tx }) => {
                            let moved = self.apply_move(from, to).await;
                            let _ = response_tx.send(moved);
                        }
                        Some(ReorderMessage::Flush { response_tx }) => {
                            self.flush(response_tx).await;
                        }
                        None => {
                            self.drain().await;
                            break;
                        }
                    }
                }

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.deadline = None;
                    self.due = true;
                    self.start_due().await;
                }

                joined = join_in_flight(&mut self.in_flight), if self.in_flight.is_some() => {
                    if let Some(in_flight) = self.in_flight.take() {
                        self.finish(in_flight, joined).await;
                    }
                }
            }
        }
    }

    async fn apply_move(&mut self, from: usize, to: usize) -> bool {
        match self.store.reorder_with_snapshot(from, to).await {
            Some(before) => {
                if self.snapshot.is_none() {
                    self.snapshot = Some(before);
                }
                self.deadline = Some(Instant::now() + self.debounce);
                true
            }
            None => {
                tracing::debug!(from, to, "Reorder out of range, ignored");
                false
            }
        }
    }

    async fn flush(&mut self, response_tx: oneshot::Sender<CommitOutcome>) {
        if self.snapshot.is_some() {
            self.next_waiters.push(response_tx);
            self.deadline = None;
            self.due = true;
            self.start_due().await;
        } else if self.in_flight.is_some() {
            self.waiters.push(response_tx);
        } else {
            let _ = response_tx.send(CommitOutcome::Idle);
        }
    }

    /// Commit whatever is pending and wait for every commit to settle.
    async fn drain(&mut self) {
        if self.snapshot.is_some() {
            self.deadline = None;
            self.due = true;
        }
        self.start_due().await;
        while let Some(mut in_flight) = self.in_flight.take() {
            let joined = (&mut in_flight.task).await;
            self.finish(in_flight, joined).await;
        }
    }

    /// Start the pending batch if it is due and no commit is in flight.
    async fn start_due(&mut self) {
        if !self.due || self.in_flight.is_some() {
            return;
        }
        self.due = false;
        self.deadline = None;
        let waiters = mem::take(&mut self.next_waiters);
        match self.begin_commit().await {
            Begin::Started(in_flight) => {
                self.in_flight = Some(in_flight);
                self.waiters = waiters;
            }
            Begin::Done(outcome) => {
                tracing::debug!(outcome = ?outcome, "Commit not sent");
                reply(waiters, &outcome);
            }
        }
    }

    async fn begin_commit(&mut self) -> Begin {
        let Some(snapshot) = self.snapshot.take() else {
            return Begin::Done(CommitOutcome::Idle);
        };

        let (scope, items, mark) = self.store.order_for_commit().await;
        if snapshot.epoch() != mark.epoch {
            tracing::debug!(scope = %scope, "Store was reset since the batch started, commit dropped");
            return Begin::Done(CommitOutcome::Skipped);
        }
        if items.is_empty() || scope.department_id.is_none() {
            tracing::debug!(scope = %scope, "No department or no records, commit skipped");
            return Begin::Done(CommitOutcome::Skipped);
        }

        let store = self.store.clone();
        let backend = self.backend.clone();
        let task = tokio::spawn(async move {
            backend.commit_order(&scope, &items).await?;
            tracing::info!(scope = %scope, items = items.len(), "Order committed");
            if let Err(e) = store.refetch_unless_edited(backend.as_ref(), mark).await {
                tracing::warn!(scope = %scope, error = %e, "Refetch after commit failed");
            }
            Ok(())
        });
        Begin::Started(InFlight { snapshot, task })
    }

    async fn finish(
        &mut self,
        in_flight: InFlight,
        joined: std::result::Result<Result<()>, JoinError>,
    ) {
        let outcome = match joined {
            Ok(Ok(())) => CommitOutcome::Committed,
            Ok(Err(e)) => self.roll_back(in_flight.snapshot, e).await,
            Err(e) => {
                let e = DeskError::Internal(format!("commit task failed: {}", e));
                self.roll_back(in_flight.snapshot, e).await
            }
        };
        tracing::debug!(outcome = ?outcome, "Commit settled");

        reply(mem::take(&mut self.waiters), &outcome);
        if self.snapshot.is_none() {
            reply(mem::take(&mut self.next_waiters), &outcome);
        }
        self.start_due().await;
    }

    async fn roll_back(&mut self, snapshot: StoreSnapshot, e: DeskError) -> CommitOutcome {
        self.snapshot = None;
        self.deadline = None;
        self.due = false;

        let e = Arc::new(e);
        if self.store.restore(snapshot).await {
            tracing::warn!(error = %e, "Order commit failed, rolled back");
            self.notifier
                .error(format!("Could not save the new order: {}", e));
            CommitOutcome::RolledBack(e)
        } else {
            tracing::debug!(error = %e, "Order commit failed after store reset, nothing restored");
            CommitOutcome::Discarded(e)
        }
    }
}

async fn join_in_flight(
    in_flight: &mut Option<InFlight>,
) -> std::result::Result<Result<()>, JoinError> {
    match in_flight {
        Some(in_flight) => (&mut in_flight.task).await,
        None => std::future::pending().await,
    }
}

fn reply(waiters: Vec<oneshot::Sender<CommitOutcome>>, outcome: &CommitOutcome) {
    for tx in waiters {
        let _ = tx.send(outcome.clone());
    }
}

/// Cloneable sender side used by views to drive a [`ReorderCoordinator`].
#[derive(Debug, Clone)]
pub struct ReorderHandle {
    tx: mpsc::Sender<ReorderMessage>,
}

impl ReorderHandle {
    /// Move the record at `from` to `to`. Resolves once the local store
    /// reflects the move; `false` means the indices were out of range.
    pub async fn move_item(&self, from: usize, to: usize) -> Result<bool> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(ReorderMessage::Move {
                from,
                to,
                response_tx,
            })
            .await
            .map_err(|_| DeskError::Internal("reorder coordinator stopped".to_string()))?;
        response_rx
            .await
            .map_err(|_| DeskError::Internal("reorder coordinator dropped reply".to_string()))
    }

    pub async fn move_up(&self, index: usize) -> Result<bool> {
        if index == 0 {
            return Ok(false);
        }
        self.move_item(index, index - 1).await
    }

    pub async fn move_down(&self, index: usize) -> Result<bool> {
        self.move_item(index, index + 1).await
    }

    pub async fn flush(&self) -> Result<CommitOutcome> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(ReorderMessage::Flush { response_tx })
            .await
            .map_err(|_| DeskError::Internal("reorder coordinator stopped".to_string()))?;
        response_rx
            .await
            .map_err(|_| DeskError::Internal("reorder coordinator dropped reply".to_string()))
    }
}
