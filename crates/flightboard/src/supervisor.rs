//! Periodic task supervision.
//!
//! Each cadence of the board (progress refresh, status poll, auto-sort) runs
//! as its own tokio task driven by an interval. A [`Supervisor`] starts them
//! under one cancellation token and stops them together when the session
//! ends.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// The kind of periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Re-reads distance and flight identity and updates progress.
    ProgressRefresh,
    /// Polls the flight status for changes.
    FlightStatus,
    /// Re-sorts the flight table.
    AutoSort,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProgressRefresh => write!(f, "progress-refresh"),
            Self::FlightStatus => write!(f, "flight-status"),
            Self::AutoSort => write!(f, "auto-sort"),
        }
    }
}

/// A unit of work repeated on a fixed period.
#[async_trait]
pub trait PeriodicTask: Send + 'static {
    /// Which cadence this task implements.
    fn kind(&self) -> TaskKind;

    /// Runs once, immediately, before the first tick.
    async fn start(&mut self) {}

    /// Runs once per period.
    async fn tick(&mut self);
}

/// Starts periodic tasks and stops them together.
#[derive(Debug, Default)]
pub struct Supervisor {
    token: CancellationToken,
    tasks: Vec<(TaskKind, JoinHandle<()>)>,
}

impl Supervisor {
    /// Create a supervisor with no tasks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task`, ticking every `period` after an initial `start`.
    ///
    /// The first tick fires one full period after spawning.
    pub fn spawn<T: PeriodicTask>(&mut self, mut task: T, period: Duration) {
        let kind = task.kind();
        let token = self.token.child_token();

        let handle = tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => return,
                () = task.start() => {}
            }

            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // A tick that never finishes must not outlive the session.
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    () = async {
                        ticker.tick().await;
                        task.tick().await;
                    } => {}
                }
            }
            debug!(task = %kind, "Periodic task stopped");
        });

        debug!(task = %kind, ?period, "Spawned periodic task");
        self.tasks.push((kind, handle));
    }

    /// Signal every task to stop.
    pub fn stop_all(&self) {
        self.token.cancel();
    }

    /// Stop every task and wait for them to finish.
    pub async fn shutdown(&mut self) {
        self.stop_all();
        for (kind, handle) in self.tasks.drain(..) {
            if let Err(e) = handle.await {
                warn!(task = %kind, "Periodic task ended abnormally: {e}");
            }
        }
    }

    /// Number of spawned tasks.
    #[must_use]
    pub fn count(&self) -> usize {
        self.tasks.len()
    }

    /// Kinds of the spawned tasks, in spawn order.
    #[must_use]
    pub fn kinds(&self) -> Vec<TaskKind> {
        self.tasks.iter().map(|(kind, _)| *kind).collect()
    }

    /// Whether the stop signal has been sent.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::logging::init_test_logging;

    struct Counter {
        kind: TaskKind,
        starts: Arc<AtomicUsize>,
        ticks: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PeriodicTask for Counter {
        fn kind(&self) -> TaskKind {
            self.kind
        }

        async fn start(&mut self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        async fn tick(&mut self) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counter(kind: TaskKind) -> (Counter, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let starts = Arc::new(AtomicUsize::new(0));
        let ticks = Arc::new(AtomicUsize::new(0));
        (
            Counter {
                kind,
                starts: starts.clone(),
                ticks: ticks.clone(),
            },
            starts,
            ticks,
        )
    }

    #[test]
    fn test_task_kind_display() {
        assert_eq!(TaskKind::ProgressRefresh.to_string(), "progress-refresh");
        assert_eq!(TaskKind::FlightStatus.to_string(), "flight-status");
        assert_eq!(TaskKind::AutoSort.to_string(), "auto-sort");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_period() {
        let mut supervisor = Supervisor::new();
        let (task, starts, ticks) = counter(TaskKind::ProgressRefresh);
        supervisor.spawn(task, Duration::from_secs(2));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_cadences() {
        let mut supervisor = Supervisor::new();
        let (fast, _, fast_ticks) = counter(TaskKind::ProgressRefresh);
        let (slow, _, slow_ticks) = counter(TaskKind::FlightStatus);
        supervisor.spawn(fast, Duration::from_secs(2));
        supervisor.spawn(slow, Duration::from_secs(20));

        tokio::time::sleep(Duration::from_secs(41)).await;
        assert_eq!(fast_ticks.load(Ordering::SeqCst), 20);
        assert_eq!(slow_ticks.load(Ordering::SeqCst), 2);
        assert_eq!(
            supervisor.kinds(),
            vec![TaskKind::ProgressRefresh, TaskKind::FlightStatus]
        );

        supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_every_task() {
        let mut supervisor = Supervisor::new();
        let (a, _, a_ticks) = counter(TaskKind::ProgressRefresh);
        let (b, _, b_ticks) = counter(TaskKind::AutoSort);
        supervisor.spawn(a, Duration::from_secs(1));
        supervisor.spawn(b, Duration::from_secs(1));
        assert_eq!(supervisor.count(), 2);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        supervisor.shutdown().await;
        assert!(supervisor.is_stopped());
        assert_eq!(supervisor.count(), 0);

        let (a_before, b_before) = (a_ticks.load(Ordering::SeqCst), b_ticks.load(Ordering::SeqCst));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(a_ticks.load(Ordering::SeqCst), a_before);
        assert_eq!(b_ticks.load(Ordering::SeqCst), b_before);
    }

    struct Stuck {
        entered: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PeriodicTask for Stuck {
        fn kind(&self) -> TaskKind {
            TaskKind::ProgressRefresh
        }

        async fn tick(&mut self) {
            self.entered.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<()>().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_hung_tick() {
        init_test_logging();
        let mut supervisor = Supervisor::new();
        let entered = Arc::new(AtomicUsize::new(0));
        supervisor.spawn(
            Stuck {
                entered: entered.clone(),
            },
            Duration::from_secs(2),
        );

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(entered.load(Ordering::SeqCst), 1);

        let stopped = tokio::time::timeout(Duration::from_secs(1), supervisor.shutdown()).await;
        assert!(stopped.is_ok());
        assert_eq!(supervisor.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_tick_does_not_block_other_tasks() {
        let mut supervisor = Supervisor::new();
        let entered = Arc::new(AtomicUsize::new(0));
        let (status, _, status_ticks) = counter(TaskKind::FlightStatus);
        supervisor.spawn(
            Stuck {
                entered: entered.clone(),
            },
            Duration::from_secs(2),
        );
        supervisor.spawn(status, Duration::from_secs(20));

        tokio::time::sleep(Duration::from_secs(41)).await;
        assert_eq!(entered.load(Ordering::SeqCst), 1);
        assert_eq!(status_ticks.load(Ordering::SeqCst), 2);

        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_drop_cancels() {
        let supervisor = Supervisor::new();
        let token = supervisor.token.clone();
        drop(supervisor);
        assert!(token.is_cancelled());
    }
}
