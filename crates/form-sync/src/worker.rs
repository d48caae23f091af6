use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gridform_spec::FormSpec;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::{ChangePayload, RecordStore};
use crate::cursor::CursorState;
use crate::error::SyncError;
use crate::response::Transition;
use crate::store::{CursorStore, ResponseStore};

/// Default safety-net re-poll interval when no notification arrives.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// A registered change-notification channel for one external table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub subscription_id: String,
    pub store_id: String,
    pub table_id: String,
}

impl Subscription {
    /// Builds the subscription for a form, if the form has one registered.
    pub fn for_form(form: &FormSpec) -> Option<Self> {
        form.subscription_id.as_ref().map(|subscription_id| Self {
            subscription_id: subscription_id.clone(),
            store_id: form.store_id.clone(),
            table_id: form.table_id.clone(),
        })
    }
}

/// Tuning for the worker loop.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Result of processing one change batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub payloads_applied: usize,
    pub might_have_more: bool,
}

/// Applies the external change feed to local responses, one batch at a
/// time, advancing the persisted cursor only after a batch has fully
/// applied.
pub struct Reconciler {
    client: Arc<dyn RecordStore>,
    responses: Arc<dyn ResponseStore>,
    cursors: Arc<dyn CursorStore>,
}

impl Reconciler {
    pub fn new(
        client: Arc<dyn RecordStore>,
        responses: Arc<dyn ResponseStore>,
        cursors: Arc<dyn CursorStore>,
    ) -> Self {
        Self {
            client,
            responses,
            cursors,
        }
    }

    /// Fetches and applies exactly one batch.
    ///
    /// Payloads apply strictly in delivery order; later payloads may touch
    /// records already touched earlier in the same batch. Any failure
    /// aborts before the cursor is persisted, so the next attempt replays
    /// the same batch against idempotent transitions.
    pub async fn run_once(&self, subscription: &Subscription) -> Result<BatchOutcome, SyncError> {
        let mut state = self
            .cursors
            .load(&subscription.subscription_id)
            .await?
            .unwrap_or_else(|| CursorState::new(&subscription.subscription_id));

        let batch = self
            .client
            .fetch_change_batch(
                &subscription.store_id,
                &subscription.subscription_id,
                state.last_cursor.as_deref(),
            )
            .await?;

        let payloads_applied = batch.payloads.len();
        for payload in &batch.payloads {
            self.apply_payload(subscription, payload).await?;
        }

        state.advance(batch.cursor, Utc::now());
        self.cursors.save(&state).await?;

        debug!(
            subscription = %subscription.subscription_id,
            payloads = payloads_applied,
            more = batch.might_have_more,
            "batch applied"
        );
        Ok(BatchOutcome {
            payloads_applied,
            might_have_more: batch.might_have_more,
        })
    }

    async fn apply_payload(
        &self,
        subscription: &Subscription,
        payload: &ChangePayload,
    ) -> Result<(), SyncError> {
        let Some(changes) = payload.table(&subscription.table_id) else {
            return Ok(());
        };

        for record_id in &changes.changed_record_ids {
            if let Some(mut response) = self.responses.find_by_record_id(record_id).await? {
                // Freshness signal only: the delta is keyed by external
                // field id and cannot be mapped back onto answers reliably.
                response.touch(Utc::now());
                self.responses.update(&response).await?;
            }
        }

        for record_id in &changes.destroyed_record_ids {
            if let Some(mut response) = self.responses.find_by_record_id(record_id).await? {
                match response.mark_deleted_externally(Utc::now()) {
                    Transition::Applied => {
                        self.responses.update(&response).await?;
                        info!(record = %record_id, "response soft-deleted after external removal");
                    }
                    Transition::NoOp => {
                        debug!(record = %record_id, "duplicate destroy event absorbed");
                    }
                }
            }
        }

        Ok(())
    }
}

struct WorkerHandle {
    wake: Arc<Notify>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Registry of per-subscription reconciliation workers.
///
/// Each subscription owns one long-lived task; subscriptions run
/// independently and share nothing but the store handles. An inbound
/// webhook notification translates into [`WorkerSet::notify`]; the
/// handler never fetches or applies payloads itself.
pub struct WorkerSet {
    reconciler: Arc<Reconciler>,
    config: WorkerConfig,
    workers: Mutex<HashMap<String, WorkerHandle>>,
}

impl WorkerSet {
    pub fn new(reconciler: Arc<Reconciler>, config: WorkerConfig) -> Self {
        Self {
            reconciler,
            config,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Starts the worker for a subscription. A worker that is already
    /// running is left alone.
    pub async fn start_worker(&self, subscription: Subscription) {
        let mut workers = self.workers.lock().await;
        if workers.contains_key(&subscription.subscription_id) {
            debug!(subscription = %subscription.subscription_id, "worker already running");
            return;
        }

        let wake = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let subscription_id = subscription.subscription_id.clone();

        info!(subscription = %subscription_id, "starting reconciliation worker");
        let task = tokio::spawn(run_worker(
            Arc::clone(&self.reconciler),
            subscription,
            Arc::clone(&wake),
            shutdown_rx,
            self.config.poll_interval,
        ));

        workers.insert(
            subscription_id,
            WorkerHandle {
                wake,
                shutdown: shutdown_tx,
                task,
            },
        );
    }

    /// Requests shutdown and waits for the worker to stop. The worker
    /// honors the request between batches, never mid-batch.
    pub async fn stop_worker(&self, subscription_id: &str) -> Result<(), SyncError> {
        let handle = self
            .workers
            .lock()
            .await
            .remove(subscription_id)
            .ok_or_else(|| SyncError::UnknownSubscription(subscription_id.to_string()))?;

        let _ = handle.shutdown.send(true);
        handle.wake.notify_one();
        if let Err(error) = handle.task.await {
            warn!(subscription = %subscription_id, %error, "worker task ended abnormally");
        }
        info!(subscription = %subscription_id, "reconciliation worker stopped");
        Ok(())
    }

    /// Wakes a worker out of its idle sleep; called by the inbound
    /// notification handler.
    pub async fn notify(&self, subscription_id: &str) -> Result<(), SyncError> {
        let workers = self.workers.lock().await;
        let handle = workers
            .get(subscription_id)
            .ok_or_else(|| SyncError::UnknownSubscription(subscription_id.to_string()))?;
        handle.wake.notify_one();
        Ok(())
    }

    pub async fn is_running(&self, subscription_id: &str) -> bool {
        self.workers.lock().await.contains_key(subscription_id)
    }

    /// Stops every worker, for process shutdown.
    pub async fn shutdown(&self) {
        let ids: Vec<String> = self.workers.lock().await.keys().cloned().collect();
        for id in ids {
            let _ = self.stop_worker(&id).await;
        }
    }
}

async fn run_worker(
    reconciler: Arc<Reconciler>,
    subscription: Subscription,
    wake: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
    poll_interval: Duration,
) {
    loop {
        // Drain the feed page by page; shutdown is honored between batches.
        loop {
            if *shutdown.borrow() {
                return;
            }
            match reconciler.run_once(&subscription).await {
                Ok(outcome) if outcome.might_have_more => continue,
                Ok(_) => break,
                Err(error) => {
                    // Cursor was not advanced; the next trigger retries the
                    // same batch.
                    warn!(
                        subscription = %subscription.subscription_id,
                        %error,
                        "reconciliation pass failed"
                    );
                    break;
                }
            }
        }

        tokio::select! {
            _ = wake.notified() => {}
            _ = tokio::time::sleep(poll_interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}
