//! The polling core.
//!
//! One timer task enumerates outdated feeds and enqueues them as jobs; an
//! elastic pool of worker tasks drains the queue and runs the ingestion
//! pipeline. Both sides read the shared configuration (poll interval,
//! worker target) that the control protocol mutates at runtime.
//!
//! Lifecycle rules:
//!
//! - all entry points go through an explicit `Arc<Aggregator>` handle;
//! - the configuration/lifecycle mutex is never held across an await;
//! - shutdown is one root watch channel, observed by the timer and every
//!   worker, plus closing the job queue to unblock idle workers;
//! - shrinking the pool cancels specific workers, so the physical count
//!   converges to the target immediately instead of racing a broadcast.

pub mod ingest;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error};

use crate::app::{FreshetError, Result};
use crate::domain::Feed;
use crate::fetcher::Fetcher;
use crate::store::Store;

pub use ingest::Ingestor;

/// Jobs ready for pickup. The timer loop is the only producer; every worker
/// shares the receiving end.
type JobQueue = Arc<tokio::sync::Mutex<mpsc::Receiver<Feed>>>;

/// The scheduler owning the poll timer, the worker pool and their shared
/// configuration.
pub struct Aggregator<S> {
    store: Arc<S>,
    ingestor: Arc<Ingestor<S>>,
    state: Mutex<State>,
}

struct State {
    interval: Duration,
    workers: usize,
    running: Option<Running>,
}

/// Channels and task handles that exist only while the aggregator runs.
struct Running {
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    interval_tx: watch::Sender<Duration>,
    jobs_tx: mpsc::Sender<Feed>,
    queue: JobQueue,
    timer: JoinHandle<()>,
    pool: Vec<Worker>,
    /// Workers cancelled by a shrink; joined at stop.
    retired: Vec<JoinHandle<()>>,
}

struct Worker {
    quit_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl<S: Store + Send + Sync + 'static> Aggregator<S> {
    pub fn new(
        store: Arc<S>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        interval: Duration,
        workers: usize,
    ) -> Self {
        let ingestor = Arc::new(Ingestor::new(fetcher, store.clone()));
        Self {
            store,
            ingestor,
            state: Mutex::new(State {
                interval,
                workers,
                running: None,
            }),
        }
    }

    /// Spawn the timer loop and the configured number of workers.
    /// Non-blocking; fails with `AlreadyStarted` while running.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut state = self.lock_state();
        if state.running.is_some() {
            return Err(FreshetError::AlreadyStarted);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (interval_tx, interval_rx) = watch::channel(state.interval);
        let (jobs_tx, jobs_rx) = mpsc::channel(1);
        let queue: JobQueue = Arc::new(tokio::sync::Mutex::new(jobs_rx));

        let timer = tokio::spawn(timer_loop(
            Arc::clone(self),
            jobs_tx.clone(),
            shutdown_rx.clone(),
            interval_rx,
        ));

        let pool = (0..state.workers)
            .map(|_| spawn_worker(self.ingestor.clone(), queue.clone(), shutdown_rx.clone()))
            .collect();

        state.running = Some(Running {
            shutdown_tx,
            shutdown_rx,
            interval_tx,
            jobs_tx,
            queue,
            timer,
            pool,
            retired: Vec::new(),
        });
        Ok(())
    }

    /// Cancel the timer, close the job queue, cancel every worker and wait
    /// for all of them to finish. Fails with `NotStarted` when not running.
    pub async fn stop(&self) -> Result<()> {
        let running = {
            let mut state = self.lock_state();
            state.running.take().ok_or(FreshetError::NotStarted)?
        };

        // Root cancellation; the queue closes once the timer drops its
        // sender clone on the way out.
        let _ = running.shutdown_tx.send(true);
        drop(running.jobs_tx);

        if let Err(e) = running.timer.await {
            error!("timer task failed: {e}");
        }
        for worker in running.pool {
            let _ = worker.quit_tx.send(true);
            if let Err(e) = worker.handle.await {
                error!("worker task failed: {e}");
            }
        }
        for handle in running.retired {
            if let Err(e) = handle.await {
                error!("worker task failed: {e}");
            }
        }
        Ok(())
    }

    /// Update the poll interval and restart the current period from now.
    /// No-op while stopped.
    pub fn set_interval(&self, interval: Duration) {
        let mut state = self.lock_state();
        if state.running.is_none() {
            return;
        }
        state.interval = interval;
        if let Some(running) = &state.running {
            let _ = running.interval_tx.send(interval);
        }
    }

    /// Change the worker target. Shrinking cancels specific workers so the
    /// pool converges immediately; growing spawns the difference. The
    /// target is updated even while stopped.
    pub fn resize(&self, workers: usize) -> Result<()> {
        if workers == 0 {
            return Err(FreshetError::InvalidWorkerCount);
        }
        let mut state = self.lock_state();
        state.workers = workers;

        if let Some(running) = state.running.as_mut() {
            while running.pool.len() > workers {
                if let Some(worker) = running.pool.pop() {
                    let _ = worker.quit_tx.send(true);
                    running.retired.push(worker.handle);
                }
            }
            while running.pool.len() < workers {
                running.pool.push(spawn_worker(
                    self.ingestor.clone(),
                    running.queue.clone(),
                    running.shutdown_rx.clone(),
                ));
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        self.lock_state().interval
    }

    pub fn workers(&self) -> usize {
        self.lock_state().workers
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("aggregator state lock poisoned")
    }
}

/// Enqueues up to `workers` outdated feeds on every tick. Terminates only
/// on shutdown.
async fn timer_loop<S: Store + Send + Sync + 'static>(
    agg: Arc<Aggregator<S>>,
    jobs_tx: mpsc::Sender<Feed>,
    mut shutdown_rx: watch::Receiver<bool>,
    mut interval_rx: watch::Receiver<Duration>,
) {
    let period = *interval_rx.borrow_and_update();
    let mut ticker = time::interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => return,
            _ = interval_rx.changed() => {
                // Reprogram the ticker, discarding the elapsed part of the
                // current period.
                let period = *interval_rx.borrow_and_update();
                ticker = time::interval_at(Instant::now() + period, period);
            }
            _ = ticker.tick() => {
                let limit = agg.workers();
                let feeds = match agg.store.pick_outdated(limit) {
                    Ok(feeds) => feeds,
                    Err(e) => {
                        error!("Error fetching outdated feeds: {e}");
                        continue;
                    }
                };
                debug!(count = feeds.len(), "enqueueing outdated feeds");
                for feed in feeds {
                    tokio::select! {
                        _ = shutdown_rx.changed() => return,
                        sent = jobs_tx.send(feed) => {
                            if sent.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        }
    }
}

fn spawn_worker<S: Store + Send + Sync + 'static>(
    ingestor: Arc<Ingestor<S>>,
    queue: JobQueue,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Worker {
    let (quit_tx, mut quit_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        loop {
            let job = tokio::select! {
                _ = shutdown_rx.changed() => return,
                _ = quit_rx.changed() => return,
                job = next_job(&queue) => job,
            };
            let Some(feed) = job else { return };
            if let Err(e) = ingestor.ingest(&feed).await {
                error!(url = %feed.url, "Error processing feed: {e}");
            }
        }
    });
    Worker { quit_tx, handle }
}

/// Wait for the next job. The queue lock is only held while parked on the
/// channel, never while a job is being processed.
async fn next_job(queue: &JobQueue) -> Option<Feed> {
    queue.lock().await.recv().await
}
