//! Schedule evaluator.
//!
//! A single evaluator loop fires immediately on start and then every poll
//! interval. Each tick enqueues a task for every due schedule; enqueue
//! failures are recorded on the schedule without advancing `next_run`, so
//! the dispatch retries on the next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::ScheduledTask;
use crate::domain::ports::{ScheduleStore, TaskQueue};

/// Periodically enqueues due scheduled tasks.
pub struct Scheduler {
    store: Arc<dyn ScheduleStore>,
    queue: Arc<dyn TaskQueue>,
    poll_interval: Duration,
    running: AtomicBool,
    cancel: std::sync::Mutex<Option<CancellationToken>>,
    evaluator: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        queue: Arc<dyn TaskQueue>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            queue,
            poll_interval,
            running: AtomicBool::new(false),
            cancel: std::sync::Mutex::new(None),
            evaluator: tokio::sync::Mutex::new(None),
        }
    }

    /// Start the evaluator loop. A second start while running is a no-op.
    pub async fn start(self: Arc<Self>, parent: &CancellationToken) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("scheduler already running");
            return;
        }

        let token = parent.child_token();
        *self.cancel.lock().expect("cancel lock poisoned") = Some(token.clone());

        let scheduler = self.clone();
        let poll_interval = self.poll_interval;
        let handle = tokio::spawn(async move {
            // First evaluation fires immediately.
            scheduler.tick().await;
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(poll_interval) => scheduler.tick().await,
                }
            }
        });
        *self.evaluator.lock().await = Some(handle);
        info!(poll_interval_secs = self.poll_interval.as_secs(), "scheduler started");
    }

    /// Stop the evaluator and wait for it. Idempotent.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(token) = self.cancel.lock().expect("cancel lock poisoned").take() {
            token.cancel();
        }
        if let Some(handle) = self.evaluator.lock().await.take() {
            if let Err(err) = handle.await {
                error!(error = %err, "evaluator task panicked");
            }
        }
        info!("scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Evaluate all due schedules once.
    pub async fn tick(&self) {
        let now = Utc::now();
        let due = match self.store.get_due(now).await {
            Ok(due) => due,
            Err(err) => {
                error!(error = %err, "failed to load due schedules");
                return;
            }
        };
        if due.is_empty() {
            return;
        }

        debug!(count = due.len(), "dispatching due schedules");
        for mut schedule in due {
            self.dispatch(&mut schedule).await;
        }
    }

    /// Build and enqueue a schedule's task immediately, ignoring due-ness.
    #[instrument(skip(self), err)]
    pub async fn trigger_now(&self, id: &str) -> CoreResult<String> {
        let Some(mut schedule) = self.store.get(id).await? else {
            return Err(CoreError::not_found("scheduled task", id.to_string()));
        };

        let task = schedule.build_task();
        let task_id = self.queue.enqueue(task).await?;
        schedule.mark_dispatched(Utc::now());
        self.store.update(&schedule).await?;
        info!(schedule = %schedule.name, task_id, "schedule triggered manually");
        Ok(task_id)
    }

    /// Create a schedule, enforcing name uniqueness.
    pub async fn create_schedule(&self, schedule: ScheduledTask) -> CoreResult<ScheduledTask> {
        schedule.validate().map_err(CoreError::InvalidInput)?;
        if self.store.get_by_name(&schedule.name).await?.is_some() {
            return Err(CoreError::already_exists("scheduled task", schedule.name.clone()));
        }
        self.store.create(&schedule).await?;
        Ok(schedule)
    }

    pub async fn update_schedule(&self, schedule: ScheduledTask) -> CoreResult<()> {
        schedule.validate().map_err(CoreError::InvalidInput)?;
        if self.store.get(&schedule.id).await?.is_none() {
            return Err(CoreError::not_found("scheduled task", schedule.id.clone()));
        }
        self.store.update(&schedule).await
    }

    pub async fn delete_schedule(&self, id: &str) -> CoreResult<()> {
        if self.store.get(id).await?.is_none() {
            return Err(CoreError::not_found("scheduled task", id.to_string()));
        }
        self.store.delete(id).await
    }

    pub async fn list_schedules(&self) -> CoreResult<Vec<ScheduledTask>> {
        self.store.list().await
    }

    async fn dispatch(&self, schedule: &mut ScheduledTask) {
        let now = Utc::now();
        let task = schedule.build_task();
        match self.queue.enqueue(task).await {
            Ok(task_id) => {
                schedule.mark_dispatched(now);
                debug!(schedule = %schedule.name, task_id, "schedule dispatched");
            }
            Err(err) => {
                // next_run stays put so the next tick retries.
                warn!(schedule = %schedule.name, error = %err, "schedule dispatch failed");
                schedule.mark_failed(err.to_string(), now);
            }
        }
        if let Err(err) = self.store.update(schedule).await {
            error!(schedule = %schedule.name, error = %err, "failed to persist schedule state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Task, TaskType};
    use crate::domain::models::{QueueStats, TaskFilter};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use mockall::mock;
    use mockall::predicate::*;

    mock! {
        pub Schedules {}

        #[async_trait]
        impl ScheduleStore for Schedules {
            async fn create(&self, schedule: &ScheduledTask) -> CoreResult<()>;
            async fn get(&self, id: &str) -> CoreResult<Option<ScheduledTask>>;
            async fn get_by_name(&self, name: &str) -> CoreResult<Option<ScheduledTask>>;
            async fn list(&self) -> CoreResult<Vec<ScheduledTask>>;
            async fn get_due(&self, now: DateTime<Utc>) -> CoreResult<Vec<ScheduledTask>>;
            async fn update(&self, schedule: &ScheduledTask) -> CoreResult<()>;
            async fn delete(&self, id: &str) -> CoreResult<()>;
        }
    }

    mock! {
        pub Queue {}

        #[async_trait]
        impl TaskQueue for Queue {
            async fn enqueue(&self, task: Task) -> CoreResult<String>;
            async fn enqueue_batch(&self, tasks: Vec<Task>) -> CoreResult<Vec<String>>;
            async fn dequeue(&self, timeout: std::time::Duration) -> CoreResult<Option<Task>>;
            async fn ack(&self, task_id: &str) -> CoreResult<()>;
            async fn nack(&self, task_id: &str, reason: &str) -> CoreResult<()>;
            async fn get_task(&self, task_id: &str) -> CoreResult<Option<Task>>;
            async fn list_tasks(&self, filter: &TaskFilter) -> CoreResult<Vec<Task>>;
            async fn cancel_task(&self, task_id: &str) -> CoreResult<()>;
            async fn purge(&self, older_than: DateTime<Utc>) -> CoreResult<u64>;
            async fn stats(&self) -> CoreResult<QueueStats>;
            async fn ping(&self) -> CoreResult<()>;
            async fn close(&self) -> CoreResult<()>;
        }
    }

    fn due_schedule(name: &str) -> ScheduledTask {
        let mut sched = ScheduledTask::new(name, TaskType::SyncAll, Duration::from_secs(300));
        sched.next_run = Utc::now() - chrono::Duration::seconds(1);
        sched
    }

    fn scheduler(store: MockSchedules, queue: MockQueue) -> Arc<Scheduler> {
        Arc::new(Scheduler::new(
            Arc::new(store),
            Arc::new(queue),
            Duration::from_secs(30),
        ))
    }

    #[tokio::test]
    async fn test_tick_dispatches_due_and_advances() {
        let sched = due_schedule("nightly");
        let previous_next_run = sched.next_run;

        let mut store = MockSchedules::new();
        let returned = sched.clone();
        store
            .expect_get_due()
            .times(1)
            .returning(move |_| Ok(vec![returned.clone()]));
        store
            .expect_update()
            .withf(move |s: &ScheduledTask| {
                s.next_run > previous_next_run && s.last_error.is_none() && s.last_run.is_some()
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut queue = MockQueue::new();
        queue
            .expect_enqueue()
            .withf(|t: &Task| t.task_type == TaskType::SyncAll)
            .times(1)
            .returning(|_| Ok("task-1".to_string()));

        scheduler(store, queue).tick().await;
    }

    #[tokio::test]
    async fn test_tick_enqueue_failure_keeps_next_run() {
        let sched = due_schedule("nightly");
        let previous_next_run = sched.next_run;

        let mut store = MockSchedules::new();
        let returned = sched.clone();
        store
            .expect_get_due()
            .returning(move |_| Ok(vec![returned.clone()]));
        store
            .expect_update()
            .withf(move |s: &ScheduledTask| {
                s.next_run == previous_next_run
                    && s.last_error.as_deref().is_some_and(|e| e.contains("queue down"))
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut queue = MockQueue::new();
        queue
            .expect_enqueue()
            .returning(|_| Err(CoreError::Storage("queue down".to_string())));

        scheduler(store, queue).tick().await;
    }

    #[tokio::test]
    async fn test_trigger_now_ignores_dueness() {
        let mut sched = ScheduledTask::new("weekly", TaskType::SyncAll, Duration::from_secs(600));
        sched.next_run = Utc::now() + chrono::Duration::hours(1);
        let id = sched.id.clone();

        let mut store = MockSchedules::new();
        let returned = sched.clone();
        store
            .expect_get()
            .with(eq(id.clone()))
            .returning(move |_| Ok(Some(returned.clone())));
        store.expect_update().times(1).returning(|_| Ok(()));

        let mut queue = MockQueue::new();
        queue
            .expect_enqueue()
            .times(1)
            .returning(|_| Ok("task-7".to_string()));

        let task_id = scheduler(store, queue).trigger_now(&id).await.unwrap();
        assert_eq!(task_id, "task-7");
    }

    #[tokio::test]
    async fn test_create_schedule_enforces_unique_name() {
        let existing = due_schedule("taken");

        let mut store = MockSchedules::new();
        let returned = existing.clone();
        store
            .expect_get_by_name()
            .with(eq("taken"))
            .returning(move |_| Ok(Some(returned.clone())));

        let err = scheduler(store, MockQueue::new())
            .create_schedule(due_schedule("taken"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_start_and_stop_lifecycle() {
        let mut store = MockSchedules::new();
        store.expect_get_due().returning(|_| Ok(vec![]));

        let scheduler = scheduler(store, MockQueue::new());
        let token = CancellationToken::new();

        scheduler.clone().start(&token).await;
        assert!(scheduler.is_running());
        scheduler.clone().start(&token).await;

        scheduler.stop().await;
        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }
}
