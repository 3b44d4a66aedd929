use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, error, info_span, warn};

use crate::config::ExecutorConfig;
use crate::error::TaskError;

/// Result of running a task to completion, including retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub name: String,
    /// Attempts made, including the first.
    pub attempts: u32,
    pub result: Result<(), TaskError>,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Bounded worker pool running at-least-once tasks.
///
/// A task is a factory producing one attempt per call; an attempt failing
/// with a retryable [`TaskError`] is retried according to
/// [`ExecutorConfig::retry`]. At most [`ExecutorConfig::max_concurrent`]
/// attempts run at a time across background and inline tasks.
#[derive(Clone)]
pub struct TaskExecutor {
    config: Arc<ExecutorConfig>,
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
    failed: Arc<AtomicU64>,
}

impl TaskExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        Self {
            config: Arc::new(config),
            semaphore,
            tracker: TaskTracker::new(),
            failed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Number of tasks that ended in failure since startup.
    pub fn failed_tasks(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Schedule `task` in the background and return immediately.
    pub fn spawn<F, Fut>(&self, name: impl Into<String>, task: F) -> JoinHandle<TaskOutcome>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let name = name.into();
        let this = self.clone();
        let span = info_span!("task", task.name = %name);
        self.tracker
            .spawn(async move { this.run_with_retry(name, task).await }.instrument(span))
    }

    /// Run `task` on the caller's task and wait for its outcome.
    pub async fn run<F, Fut>(&self, name: impl Into<String>, task: F) -> TaskOutcome
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<(), TaskError>>,
    {
        let name = name.into();
        let span = info_span!("task", task.name = %name);
        self.run_with_retry(name, task).instrument(span).await
    }

    /// Stop accepting work and wait for every background task to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.semaphore.close();
    }

    async fn run_with_retry<F, Fut>(&self, name: String, task: F) -> TaskOutcome
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<(), TaskError>>,
    {
        let policy = &self.config.retry;
        let mut attempt: u32 = 0;
        let result = loop {
            let outcome = self.attempt(&task).await;
            match outcome {
                Ok(()) => {
                    debug!(task = %name, attempt, "task completed");
                    break Ok(());
                }
                Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                    let delay = policy.strategy.delay_for(attempt);
                    warn!(
                        task = %name,
                        attempt,
                        error = %err,
                        delay_ms = %delay.as_millis(),
                        "task failed, will retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(
                        task = %name,
                        attempt,
                        error = %err,
                        retryable = err.is_retryable(),
                        "task failed"
                    );
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    break Err(err);
                }
            }
        };
        TaskOutcome {
            name,
            attempts: attempt + 1,
            result,
        }
    }

    async fn attempt<F, Fut>(&self, task: &F) -> Result<(), TaskError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<(), TaskError>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| TaskError::Closed)?;
        tokio::time::timeout(self.config.task_timeout, task())
            .await
            .map_err(|_| TaskError::TimedOut(self.config.task_timeout))?
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    use super::*;
    use crate::retry::{RetryPolicy, RetryStrategy};

    fn config(max_retries: u32, max_concurrent: usize) -> ExecutorConfig {
        ExecutorConfig {
            retry: RetryPolicy {
                max_retries,
                strategy: RetryStrategy::Constant {
                    delay: Duration::from_millis(10),
                },
            },
            task_timeout: Duration::from_secs(5),
            max_concurrent,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_task_is_run_again() {
        let executor = TaskExecutor::new(config(3, 4));
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let outcome = executor
            .spawn("flaky", move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TaskError::Retryable("registry timeout".into()))
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(executor.failed_tasks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_task_is_not_retried() {
        let executor = TaskExecutor::new(config(3, 4));
        let calls = AtomicU32::new(0);
        let outcome = executor
            .run("broken", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TaskError::Fatal("duplicate service id".into())) }
            })
            .await;
        assert_eq!(outcome.attempts, 1);
        assert_eq!(
            outcome.result,
            Err(TaskError::Fatal("duplicate service id".into()))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(executor.failed_tasks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_attempt_counts_as_retryable() {
        let mut cfg = config(1, 1);
        cfg.task_timeout = Duration::from_millis(100);
        let executor = TaskExecutor::new(cfg);
        let outcome = executor
            .run("slow", || async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            })
            .await;
        assert_eq!(outcome.attempts, 2);
        assert_eq!(
            outcome.result,
            Err(TaskError::TimedOut(Duration::from_millis(100)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_is_bounded() {
        let executor = TaskExecutor::new(config(0, 2));
        let running = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));
        for i in 0..6 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            executor.spawn(format!("t{i}"), move || {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            });
        }
        executor.shutdown().await;
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn closed_executor_rejects_work() {
        let executor = TaskExecutor::new(config(0, 1));
        executor.shutdown().await;
        let outcome = executor.run("late", || async { Ok(()) }).await;
        assert_eq!(outcome.result, Err(TaskError::Closed));
    }
}
