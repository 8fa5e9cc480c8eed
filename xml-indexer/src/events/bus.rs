//! Event bus implementation.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use chrono::{Datelike, Local, NaiveDateTime};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use xml_indexer_repository::CollectionIndexWriter;

use super::listener::{IndexingEvent, IndexingEventType, ItemIndexer};
use super::scheduler::{IndexingSchedule, SCHEDULE_PERIOD};
use crate::errors::{EventBusError, ListenerError};

/// Default bound on listener dispatches running at the same time.
pub const DEFAULT_MAX_CONCURRENT_DISPATCHES: usize = 8;

/// Default directory handed to item indexers.
pub const DEFAULT_CONFIG_DIRECTORY: &str = "./config";

/// Configuration for the event bus.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Maximum number of work dispatches running at once. Further work
    /// dispatches wait for a free slot; control events never do.
    pub max_concurrent_dispatches: usize,
    /// Directory passed to every indexer on registration.
    pub config_directory: PathBuf,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            max_concurrent_dispatches: DEFAULT_MAX_CONCURRENT_DISPATCHES,
            config_directory: PathBuf::from(DEFAULT_CONFIG_DIRECTORY),
        }
    }
}

/// A listener that failed to handle an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFailure {
    pub listener: String,
    pub message: String,
}

/// Outcome of delivering one event to its listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub event_id: Uuid,
    pub succeeded: Vec<String>,
    pub failed: Vec<DispatchFailure>,
}

impl DispatchReport {
    fn new(event_id: Uuid) -> Self {
        Self {
            event_id,
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Number of listeners the event was delivered to.
    pub fn dispatched(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Handle on an event whose dispatch is running in the background.
///
/// Dropping the handle does not cancel the dispatch.
#[derive(Debug)]
pub struct DispatchHandle {
    event_id: Uuid,
    supervisor: JoinHandle<DispatchReport>,
}

impl DispatchHandle {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    /// Wait until every listener has handled the event.
    pub async fn wait(self) -> DispatchReport {
        match self.supervisor.await {
            Ok(report) => report,
            Err(e) => {
                error!(event_id = %self.event_id, error = %e, "Dispatch supervisor failed");
                DispatchReport::new(self.event_id)
            }
        }
    }
}

struct ScheduledTimer {
    schedule: IndexingSchedule,
    first_run: NaiveDateTime,
    task: JoinHandle<()>,
}

/// Fans indexing events out to registered item indexers.
///
/// The bus is responsible for:
/// - Keeping the registry of item indexers
/// - Running each (event, indexer) pair as its own task, with work events
///   bounded by a semaphore
/// - Recording listener failures in the status log
/// - Firing the daily "index everything" event on a schedule
pub struct IndexingEventBus {
    listeners: RwLock<Vec<Arc<dyn ItemIndexer>>>,
    writer: Arc<CollectionIndexWriter>,
    dispatch_permits: Arc<Semaphore>,
    config: EventBusConfig,
    timer: Mutex<Option<ScheduledTimer>>,
}

impl IndexingEventBus {
    pub fn new(writer: Arc<CollectionIndexWriter>) -> Self {
        Self::with_config(writer, EventBusConfig::default())
    }

    pub fn with_config(writer: Arc<CollectionIndexWriter>, config: EventBusConfig) -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            writer,
            dispatch_permits: Arc::new(Semaphore::new(config.max_concurrent_dispatches.max(1))),
            config,
            timer: Mutex::new(None),
        }
    }

    pub fn writer(&self) -> &Arc<CollectionIndexWriter> {
        &self.writer
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// Ids of the registered indexers, in registration order.
    pub fn listener_ids(&self) -> Vec<String> {
        self.read_listeners()
            .iter()
            .map(|l| l.id().to_string())
            .collect()
    }

    /// Register an item indexer.
    ///
    /// The indexer receives the configuration directory, is appended to the
    /// registry, and is then sent a [`IndexingEventType::ConfigureAndInitialize`]
    /// event. No other indexer sees that event.
    pub fn register(&self, listener: Arc<dyn ItemIndexer>) -> DispatchHandle {
        listener.set_config_directory(&self.config.config_directory);

        {
            let mut listeners = self.write_listeners();
            if listeners.iter().any(|l| l.id() == listener.id()) {
                warn!(listener = listener.id(), "An item indexer with this id is already registered");
            }
            listeners.push(listener.clone());
        }
        info!(listener = listener.id(), "Registered item indexer");

        let event = self.event(IndexingEventType::ConfigureAndInitialize, None);
        self.dispatch(event, vec![listener])
    }

    /// Fire an event.
    ///
    /// Must be called from within a Tokio runtime. Returns as soon as the
    /// dispatch tasks are spawned; listener failures never reach the caller.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The event to fire
    /// * `collection_key` - Collection the event refers to, if any
    /// * `target` - Id of the only indexer to notify, or `None` for all
    ///
    /// # Returns
    ///
    /// * `Ok(DispatchHandle)` - The event is being dispatched
    /// * `Err(EventBusError)` - No indexers are registered, or the target is unknown
    pub fn fire(
        &self,
        event_type: IndexingEventType,
        collection_key: Option<&str>,
        target: Option<&str>,
    ) -> Result<DispatchHandle, EventBusError> {
        let listeners: Vec<Arc<dyn ItemIndexer>> = {
            let registry = self.read_listeners();
            if registry.is_empty() {
                return Err(EventBusError::NoListeners);
            }
            match target {
                None => registry.to_vec(),
                Some(id) => {
                    let matched: Vec<_> = registry.iter().filter(|l| l.id() == id).cloned().collect();
                    if matched.is_empty() {
                        return Err(EventBusError::UnknownListener(id.to_string()));
                    }
                    matched
                }
            }
        };

        let event = self.event(event_type, collection_key.map(str::to_string));
        Ok(self.dispatch(event, listeners))
    }

    pub fn fire_configure_and_initialize(&self, target: Option<&str>) -> Result<DispatchHandle, EventBusError> {
        self.fire(IndexingEventType::ConfigureAndInitialize, None, target)
    }

    pub fn fire_indexer_ready(&self, target: Option<&str>) -> Result<DispatchHandle, EventBusError> {
        self.fire(IndexingEventType::IndexerReady, None, target)
    }

    pub fn fire_update_collections(&self, target: Option<&str>) -> Result<DispatchHandle, EventBusError> {
        self.fire(IndexingEventType::UpdateCollections, None, target)
    }

    pub fn fire_index_collection(
        &self,
        collection_key: &str,
        target: Option<&str>,
    ) -> Result<DispatchHandle, EventBusError> {
        self.fire(IndexingEventType::BeginIndexingCollection, Some(collection_key), target)
    }

    pub fn fire_index_all_collections(&self, target: Option<&str>) -> Result<DispatchHandle, EventBusError> {
        self.fire(IndexingEventType::BeginIndexingAllCollections, None, target)
    }

    pub fn fire_abort_indexing(&self, target: Option<&str>) -> Result<DispatchHandle, EventBusError> {
        self.fire(IndexingEventType::AbortIndexing, None, target)
    }

    /// Start, replace or stop the daily indexing timer.
    ///
    /// Any running timer is stopped first. With `Some(schedule)` a new timer
    /// fires [`IndexingEventType::BeginIndexingAllCollections`] every 24 hours
    /// from the next occurrence of the start time, on the allowed days only.
    /// The timer does not keep the bus alive.
    ///
    /// # Returns
    ///
    /// The local time of the first run, or `None` when the timer was stopped.
    pub fn schedule(self: &Arc<Self>, schedule: Option<IndexingSchedule>) -> Option<NaiveDateTime> {
        let mut timer = self.lock_timer();
        if let Some(previous) = timer.take() {
            previous.task.abort();
            info!("Indexing timer stopped");
        }
        let schedule = schedule?;

        let now = Local::now().naive_local();
        let first_run = schedule.next_occurrence(now);
        let delay = (first_run - now).to_std().unwrap_or_default();

        let bus = Arc::downgrade(self);
        let tick_schedule = schedule.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + delay, SCHEDULE_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !Self::run_scheduled(&bus, &tick_schedule).await {
                    break;
                }
            }
        });

        info!(
            first_run = %first_run.format("%a, %b %-d, %Y %-I:%M %p"),
            days = %schedule.describe_days(),
            "Indexing timer started"
        );
        *timer = Some(ScheduledTimer {
            schedule,
            first_run,
            task,
        });
        Some(first_run)
    }

    /// Stop the daily indexing timer, if one is running.
    pub fn stop_schedule(&self) {
        if let Some(previous) = self.lock_timer().take() {
            previous.task.abort();
            info!("Indexing timer stopped");
        }
    }

    /// Local time of the first scheduled run, or `None` when no timer is active.
    pub fn indexing_start_time(&self) -> Option<NaiveDateTime> {
        self.lock_timer().as_ref().map(|t| t.first_run)
    }

    /// Days the timer runs on, or `None` for every day or no timer.
    pub fn indexing_days_of_week(&self) -> Option<Vec<u8>> {
        self.lock_timer()
            .as_ref()
            .and_then(|t| t.schedule.days_of_week().map(<[u8]>::to_vec))
    }

    /// Stop the timer and tell every indexer to abort.
    pub fn shutdown(&self) -> Result<DispatchHandle, EventBusError> {
        self.stop_schedule();
        self.fire_abort_indexing(None)
    }

    /// One tick of the timer. Returns false once the bus is gone.
    async fn run_scheduled(bus: &Weak<Self>, schedule: &IndexingSchedule) -> bool {
        let Some(bus) = bus.upgrade() else {
            return false;
        };

        let today = Local::now().weekday();
        if !schedule.should_run_on(today) {
            debug!(weekday = %today, "Skipping scheduled indexing today");
            return true;
        }

        let msg = "Beginning automatic timed indexing of all collections...";
        bus.writer.print_status_message(msg).await;
        if let Err(e) = bus.fire_index_all_collections(None) {
            let msg = format!("Indexing timer failed to run: {}", e);
            error!("{}", msg);
            bus.writer.print_status_message(&msg).await;
        }
        true
    }

    fn event(&self, event_type: IndexingEventType, collection_key: Option<String>) -> IndexingEvent {
        IndexingEvent::new(event_type, collection_key, self.writer.clone())
    }

    /// Spawn one task per listener plus a supervisor collecting the outcomes.
    fn dispatch(&self, event: IndexingEvent, listeners: Vec<Arc<dyn ItemIndexer>>) -> DispatchHandle {
        let event_id = event.id;
        debug!(event = %event, listeners = listeners.len(), "Dispatching event");

        let mut ids = Vec::with_capacity(listeners.len());
        let mut tasks = Vec::with_capacity(listeners.len());
        for listener in listeners {
            let listener_id = listener.id().to_string();
            let permits = (!event.event_type.is_control()).then(|| self.dispatch_permits.clone());
            let event = event.clone();

            let task = tokio::spawn(async move {
                let _permit = match permits {
                    Some(permits) => Some(
                        permits
                            .acquire_owned()
                            .await
                            .map_err(|_| ListenerError::failed("Dispatch pool is closed"))?,
                    ),
                    None => None,
                };
                listener.on_event(&event).await
            });
            ids.push(listener_id);
            tasks.push(task);
        }

        let writer = self.writer.clone();
        let supervisor = tokio::spawn(async move {
            writer
                .print_status_message(&format!("Fired '{}' to {} item indexer(s)", event, ids.len()))
                .await;

            let mut report = DispatchReport::new(event.id);
            let outcomes = join_all(tasks).await;
            for (listener, outcome) in ids.into_iter().zip(outcomes) {
                let message = match outcome {
                    Ok(Ok(())) => {
                        report.succeeded.push(listener);
                        continue;
                    }
                    Ok(Err(e)) => e.to_string(),
                    Err(e) => e.to_string(),
                };

                warn!(event = %event, listener = %listener, error = %message, "Item indexer failed");
                writer
                    .print_status_message(&format!("Error processing '{}'. Message: {}", event, message))
                    .await;
                report.failed.push(DispatchFailure { listener, message });
            }

            debug!(
                event = %event,
                succeeded = report.succeeded.len(),
                failed = report.failed.len(),
                "Event dispatched"
            );
            report
        });

        DispatchHandle {
            event_id,
            supervisor,
        }
    }

    fn read_listeners(&self) -> RwLockReadGuard<'_, Vec<Arc<dyn ItemIndexer>>> {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_listeners(&self) -> RwLockWriteGuard<'_, Vec<Arc<dyn ItemIndexer>>> {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<ScheduledTimer>> {
        self.timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for IndexingEventBus {
    fn drop(&mut self) {
        if let Some(timer) = self.lock_timer().take() {
            timer.task.abort();
        }
    }
}
