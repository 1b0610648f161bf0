//! Keeps the search index in step with the note store.
//!
//! The store is authoritative and always read-after-write consistent. The
//! index is a lagging copy updated two ways:
//!
//! - **Reconciliation** at startup: list every note, re-read each one in
//!   full, and rebuild the index with [`SearchIndex::reindex_all`]. It runs
//!   as a detached task; requests are served from a partial or stale index
//!   until it finishes.
//! - **Per-mutation updates**: after a save or delete succeeds, the handler
//!   enqueues an [`IndexTask`] on a bounded [`IndexQueue`] and returns
//!   without waiting. Background workers apply the tasks. A saved note is
//!   re-read from the store, so the index holds exactly what `get` returns.
//!
//! Workers only start applying tasks once reconciliation has committed;
//! until then the queue buffers them. Every update therefore lands on top
//! of the rebuilt snapshot instead of being replaced by it.
//!
//! Several workers pull from the queue at once, so two quick edits to one
//! note may be indexed out of order and search can briefly show the older
//! version. Index failures are logged and never reach the request that
//! triggered them.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{NoteError, Result};
use crate::index::SearchIndex;
use crate::store::NoteStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexTask {
    /// Re-read the note from the store and replace its index entry.
    Upsert(String),
    /// Drop the index entry.
    Remove(String),
}

/// Cloneable handle for enqueuing index updates from request handlers.
#[derive(Clone)]
pub struct IndexQueue {
    tx: mpsc::Sender<IndexTask>,
}

impl IndexQueue {
    fn bounded(capacity: usize) -> (Self, mpsc::Receiver<IndexTask>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Schedule a re-index of `id` after a successful save.
    pub fn note_saved(&self, id: &str) {
        self.dispatch(IndexTask::Upsert(id.to_string()));
    }

    /// Schedule removal of `id` after a successful delete.
    pub fn note_deleted(&self, id: &str) {
        self.dispatch(IndexTask::Remove(id.to_string()));
    }

    /// Enqueue without waiting. A full queue drops the task; the next
    /// reconciliation repairs whatever it missed.
    fn dispatch(&self, task: IndexTask) {
        match self.tx.try_send(task) {
            Ok(()) => {}
            Err(TrySendError::Full(task)) => {
                warn!(task = ?task, "index queue full, dropping update")
            }
            Err(TrySendError::Closed(task)) => {
                debug!(task = ?task, "index workers stopped, dropping update")
            }
        }
    }
}

/// The background workers consuming an [`IndexQueue`].
pub struct IndexWorkers {
    stop: watch::Sender<bool>,
    workers: JoinSet<()>,
    reconcile: AbortHandle,
}

/// Rebuild the index from the store, then start `config.workers` index
/// workers behind the returned queue.
///
/// The queue accepts updates right away, but workers hold off until the
/// rebuild has committed. Otherwise an update applied during the rebuild
/// would be overwritten by the rebuild's older snapshot.
pub fn start(
    store: Arc<NoteStore>,
    index: SearchIndex,
    config: &SyncConfig,
) -> (IndexQueue, IndexWorkers) {
    let (queue, rx) = IndexQueue::bounded(config.queue_capacity);
    let rx = Arc::new(Mutex::new(rx));
    let (stop, stop_rx) = watch::channel(false);
    let (ready_tx, ready_rx) = watch::channel(false);

    let reconcile = spawn_reconcile(store.clone(), index.clone());
    let abort = reconcile.abort_handle();

    let mut workers = JoinSet::new();
    workers.spawn(async move {
        match reconcile.await {
            Ok(_) => {}
            Err(e) if e.is_cancelled() => debug!("search index sync cancelled"),
            Err(e) => warn!(error = %e, "search index sync task failed"),
        }
        ready_tx.send_replace(true);
    });
    for n in 0..config.workers {
        workers.spawn(run_worker(
            n,
            rx.clone(),
            ready_rx.clone(),
            stop_rx.clone(),
            store.clone(),
            index.clone(),
        ));
    }
    debug!(workers = config.workers, capacity = config.queue_capacity, "index workers started");

    (
        queue,
        IndexWorkers {
            stop,
            workers,
            reconcile: abort,
        },
    )
}

impl IndexWorkers {
    /// Stop accepting work, let the startup rebuild finish and workers drain
    /// what is already queued, and abort whatever is still running once
    /// `grace` has passed.
    pub async fn shutdown(mut self, grace: Duration) {
        self.stop.send_replace(true);

        let drain = async {
            while self.workers.join_next().await.is_some() {}
        };
        let finished = tokio::time::timeout(grace, drain).await.is_ok();

        if !finished {
            warn!(grace_secs = grace.as_secs(), "index workers still busy, aborting");
            self.reconcile.abort();
            self.workers.shutdown().await;
        }
    }
}

async fn run_worker(
    n: usize,
    rx: Arc<Mutex<mpsc::Receiver<IndexTask>>>,
    mut ready: watch::Receiver<bool>,
    mut stop: watch::Receiver<bool>,
    store: Arc<NoteStore>,
    index: SearchIndex,
) {
    // Shutdown also waits here; its grace period bounds the wait.
    wait_until_set(&mut ready).await;

    while let Some(task) = next_task(&rx, &mut stop).await {
        apply(&store, &index, task).await;
    }
    debug!(worker = n, "index worker stopped");
}

/// Resolve once the flag is true or its sender is gone.
async fn wait_until_set(flag: &mut watch::Receiver<bool>) {
    if flag.wait_for(|set| *set).await.is_err() {
        debug!("signal sender dropped");
    }
}

/// Wait for the next task. Once stop is signalled, only tasks already in
/// the queue are returned.
async fn next_task(
    rx: &Mutex<mpsc::Receiver<IndexTask>>,
    stop: &mut watch::Receiver<bool>,
) -> Option<IndexTask> {
    let mut rx = rx.lock().await;
    let stopped = *stop.borrow();
    if stopped {
        return rx.try_recv().ok();
    }
    tokio::select! {
        task = rx.recv() => task,
        _ = stop.changed() => rx.try_recv().ok(),
    }
}

async fn apply(store: &NoteStore, index: &SearchIndex, task: IndexTask) {
    match task {
        IndexTask::Upsert(id) => match store.get(&id).await {
            Ok(note) => {
                if let Err(e) = index.index(&note).await {
                    warn!(id = %id, error = %e, "failed to index note");
                }
            }
            // Deleted before we got to it.
            Err(NoteError::NotFound { .. }) => {
                if let Err(e) = index.delete(&id).await {
                    warn!(id = %id, error = %e, "failed to remove note from index");
                }
            }
            Err(e) => warn!(id = %id, error = %e, "failed to re-read note for indexing"),
        },
        IndexTask::Remove(id) => {
            if let Err(e) = index.delete(&id).await {
                warn!(id = %id, error = %e, "failed to remove note from index");
            }
        }
    }
}

/// Rebuild the index from the store's current contents.
///
/// `list` omits bodies, so every note is fetched again in full. Notes that
/// fail to load are skipped. Returns the number of notes indexed.
pub async fn reconcile(store: &NoteStore, index: &SearchIndex) -> Result<usize> {
    let listed = store.list().await?;

    let mut notes = Vec::with_capacity(listed.len());
    for entry in listed {
        match store.get(&entry.id).await {
            Ok(note) => notes.push(note),
            Err(e) => warn!(id = %entry.id, error = %e, "skipping note during reindex"),
        }
    }

    index.reindex_all(&notes).await
}

/// Run [`reconcile`] as a detached task.
pub fn spawn_reconcile(store: Arc<NoteStore>, index: SearchIndex) -> JoinHandle<Result<usize>> {
    tokio::spawn(async move {
        info!("syncing search index");
        let result = reconcile(&store, &index).await;
        match &result {
            Ok(count) => info!(notes = count, "search index synced"),
            Err(e) => warn!(error = %e, "search index sync failed"),
        }
        result
    })
}
