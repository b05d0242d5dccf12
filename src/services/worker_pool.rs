//! Worker pool: dequeues tasks and dispatches them to typed handlers.
//!
//! Each worker loops on a blocking dequeue with timeout so cancellation is
//! observed promptly even on an idle queue. Handler success acks the task;
//! handler failure nacks it with the error string; an unregistered task type
//! nacks with "unknown task type".

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::errors::CoreResult;
use crate::domain::models::{Task, TaskType};
use crate::domain::ports::TaskQueue;

/// A typed task handler.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// The task type this handler consumes.
    fn task_type(&self) -> TaskType;

    /// Process one task. Errors are reported to the queue via nack.
    async fn handle(&self, cancel: &CancellationToken, task: &Task) -> CoreResult<()>;
}

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub concurrency: usize,
    pub dequeue_timeout: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            dequeue_timeout: Duration::from_secs(5),
        }
    }
}

/// Health snapshot of the pool and its queue.
#[derive(Debug, Clone)]
pub struct WorkerHealth {
    pub running: bool,
    pub queue_healthy: bool,
    pub error: Option<String>,
}

/// Dispatches queued tasks to registered handlers with bounded concurrency.
pub struct WorkerPool {
    queue: Arc<dyn TaskQueue>,
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
    config: WorkerPoolConfig,
    running: AtomicBool,
    cancel: std::sync::Mutex<Option<CancellationToken>>,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(queue: Arc<dyn TaskQueue>, config: WorkerPoolConfig) -> Self {
        Self {
            queue,
            handlers: HashMap::new(),
            config,
            running: AtomicBool::new(false),
            cancel: std::sync::Mutex::new(None),
            workers: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// Register a handler for its task type. Last registration wins.
    pub fn register_handler(&mut self, handler: Arc<dyn TaskHandler>) {
        self.handlers
            .insert(handler.task_type().as_str().to_string(), handler);
    }

    /// Spawn the workers. A second start while running is a no-op.
    pub async fn start(&self, parent: &CancellationToken) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("worker pool already running");
            return;
        }

        let token = parent.child_token();
        *self.cancel.lock().expect("cancel lock poisoned") = Some(token.clone());

        let mut workers = self.workers.lock().await;
        for worker_id in 0..self.config.concurrency {
            let queue = self.queue.clone();
            let handlers = self.handlers.clone();
            let timeout = self.config.dequeue_timeout;
            let token = token.clone();
            workers.push(tokio::spawn(async move {
                worker_loop(worker_id, queue, handlers, timeout, token).await;
            }));
        }
        info!(concurrency = self.config.concurrency, "worker pool started");
    }

    /// Stop the workers and wait for them to drain. Idempotent.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(token) = self.cancel.lock().expect("cancel lock poisoned").take() {
            token.cancel();
        }
        let mut workers = self.workers.lock().await;
        for result in futures::future::join_all(workers.drain(..)).await {
            if let Err(err) = result {
                error!(error = %err, "worker task panicked");
            }
        }
        info!("worker pool stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Pool and queue health.
    pub async fn health(&self) -> WorkerHealth {
        match self.queue.ping().await {
            Ok(()) => WorkerHealth {
                running: self.is_running(),
                queue_healthy: true,
                error: None,
            },
            Err(err) => WorkerHealth {
                running: self.is_running(),
                queue_healthy: false,
                error: Some(err.to_string()),
            },
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<dyn TaskQueue>,
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
    timeout: Duration,
    token: CancellationToken,
) {
    debug!(worker_id, "worker started");
    loop {
        let task = tokio::select! {
            () = token.cancelled() => break,
            result = queue.dequeue(timeout) => match result {
                Ok(Some(task)) => task,
                Ok(None) => continue,
                Err(err) => {
                    warn!(worker_id, error = %err, "dequeue failed");
                    // Back off briefly so a broken queue does not spin.
                    tokio::select! {
                        () = token.cancelled() => break,
                        () = tokio::time::sleep(Duration::from_millis(500)) => continue,
                    }
                }
            },
        };

        dispatch(worker_id, &queue, &handlers, &token, &task).await;
    }
    debug!(worker_id, "worker stopped");
}

async fn dispatch(
    worker_id: usize,
    queue: &Arc<dyn TaskQueue>,
    handlers: &HashMap<String, Arc<dyn TaskHandler>>,
    token: &CancellationToken,
    task: &Task,
) {
    let Some(handler) = handlers.get(task.task_type.as_str()) else {
        warn!(worker_id, task_id = %task.id, task_type = %task.task_type, "unknown task type");
        if let Err(err) = queue.nack(&task.id, "unknown task type").await {
            error!(task_id = %task.id, error = %err, "nack failed");
        }
        return;
    };

    debug!(worker_id, task_id = %task.id, task_type = %task.task_type, "task dispatched");
    match handler.handle(token, task).await {
        Ok(()) => {
            if let Err(err) = queue.ack(&task.id).await {
                error!(task_id = %task.id, error = %err, "ack failed");
            }
        }
        Err(err) => {
            warn!(task_id = %task.id, error = %err, "task handler failed");
            if let Err(nack_err) = queue.nack(&task.id, &err.to_string()).await {
                error!(task_id = %task.id, error = %nack_err, "nack failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryTaskQueue;
    use crate::domain::errors::CoreError;
    use crate::domain::models::TaskStatus;
    use std::sync::atomic::AtomicUsize;

    struct CountingHandler {
        task_type: TaskType,
        handled: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl TaskHandler for CountingHandler {
        fn task_type(&self) -> TaskType {
            self.task_type.clone()
        }

        async fn handle(&self, _cancel: &CancellationToken, _task: &Task) -> CoreResult<()> {
            self.handled.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(CoreError::Transport("handler exploded".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn pool_with_handler(
        queue: Arc<dyn TaskQueue>,
        handler: Arc<dyn TaskHandler>,
    ) -> Arc<WorkerPool> {
        let mut pool = WorkerPool::new(
            queue,
            WorkerPoolConfig {
                concurrency: 2,
                dequeue_timeout: Duration::from_millis(50),
            },
        );
        pool.register_handler(handler);
        Arc::new(pool)
    }

    #[tokio::test]
    async fn test_successful_task_is_acked() {
        let queue = Arc::new(MemoryTaskQueue::new());
        let handled = Arc::new(AtomicUsize::new(0));
        let pool = pool_with_handler(
            queue.clone(),
            Arc::new(CountingHandler {
                task_type: TaskType::SyncAll,
                handled: handled.clone(),
                fail: false,
            }),
        );

        let task_id = queue.enqueue(Task::sync_all()).await.unwrap();

        let token = CancellationToken::new();
        pool.start(&token).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        pool.stop().await;

        assert_eq!(handled.load(Ordering::SeqCst), 1);
        let task = queue.get_task(&task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_failed_task_is_nacked_with_reason() {
        let queue = Arc::new(MemoryTaskQueue::new());
        let handled = Arc::new(AtomicUsize::new(0));
        let pool = pool_with_handler(
            queue.clone(),
            Arc::new(CountingHandler {
                task_type: TaskType::SyncAll,
                handled: handled.clone(),
                fail: true,
            }),
        );

        let task_id = queue.enqueue(Task::sync_all()).await.unwrap();

        let token = CancellationToken::new();
        pool.start(&token).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        pool.stop().await;

        assert!(handled.load(Ordering::SeqCst) >= 1);
        let task = queue.get_task(&task_id).await.unwrap().unwrap();
        assert!(task.last_error.as_deref().unwrap_or("").contains("handler exploded"));
    }

    #[tokio::test]
    async fn test_unknown_task_type_is_nacked() {
        let queue = Arc::new(MemoryTaskQueue::new());
        let pool = pool_with_handler(
            queue.clone(),
            Arc::new(CountingHandler {
                task_type: TaskType::SyncAll,
                handled: Arc::new(AtomicUsize::new(0)),
                fail: false,
            }),
        );

        let task_id = queue
            .enqueue(Task::new(TaskType::Other("mystery".to_string())))
            .await
            .unwrap();

        let token = CancellationToken::new();
        pool.start(&token).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        pool.stop().await;

        let task = queue.get_task(&task_id).await.unwrap().unwrap();
        assert_eq!(task.last_error.as_deref(), Some("unknown task type"));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_start_restarts() {
        let queue = Arc::new(MemoryTaskQueue::new());
        let pool = pool_with_handler(
            queue.clone(),
            Arc::new(CountingHandler {
                task_type: TaskType::SyncAll,
                handled: Arc::new(AtomicUsize::new(0)),
                fail: false,
            }),
        );

        let token = CancellationToken::new();
        pool.start(&token).await;
        assert!(pool.is_running());

        // Second start while running is a no-op.
        pool.start(&token).await;

        pool.stop().await;
        pool.stop().await;
        assert!(!pool.is_running());

        // Restart after stop works.
        let token = CancellationToken::new();
        pool.start(&token).await;
        assert!(pool.is_running());
        pool.stop().await;
    }

    #[tokio::test]
    async fn test_health_reports_queue_status() {
        let queue = Arc::new(MemoryTaskQueue::new());
        let pool = pool_with_handler(
            queue,
            Arc::new(CountingHandler {
                task_type: TaskType::SyncAll,
                handled: Arc::new(AtomicUsize::new(0)),
                fail: false,
            }),
        );

        let health = pool.health().await;
        assert!(!health.running);
        assert!(health.queue_healthy);
        assert!(health.error.is_none());
    }
}
