//! # Work-Stealing Scheduler
//!
//! Distributes whole images across a fixed pool of workers.
//!
//! ```text
//! seed (round-robin, before any worker starts)
//!   tasks: t0 t1 t2 t3 t4 t5 t6
//!   deque 0: t0 t3 t6     deque 1: t1 t4     deque 2: t2 t5
//!
//! worker loop
//!   ├─ pop_own()                 newest of my own tasks
//!   ├─ steal() from 0, 1, 2 ...  oldest of someone else's (skip myself)
//!   └─ nothing anywhere          exit
//! ```
//!
//! Tasks are never added after the run starts, so a worker that finds every
//! deque empty can leave for good.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::deque::{Stealer, WorkStealingDeque};
use crate::effect::parse_effects;
use crate::error::{FxError, FxResult};
use crate::executor::SlicedEffectExecutor;
use crate::image::Image;

/// One image to process: where it comes from, where it goes, and what to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    /// Identifier the resolver loads the input image from.
    pub source: String,
    /// Identifier the resolver stores the result under.
    pub destination: String,
    /// Effect identifiers, applied in order.
    pub effects: Vec<String>,
}

impl Task {
    /// Creates a task.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        effects: Vec<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            effects,
        }
    }
}

/// Loads task inputs and stores task outputs.
///
/// Called concurrently from every worker.
pub trait TaskResolver: Sync {
    /// Loads the input image for `task`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or decoded.
    fn load(&self, task: &Task) -> FxResult<Image>;

    /// Stores the latest result of `image` ([`Image::output`]) for `task`.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be written.
    fn store(&self, task: &Task, image: &Image) -> FxResult<()>;
}

/// Identity of the worker running a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerContext {
    id: usize,
    worker_count: usize,
}

impl WorkerContext {
    /// Index of this worker in `0..worker_count`.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Size of the pool.
    #[inline]
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }
}

/// Per-worker counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Tasks this worker completed.
    pub processed: usize,
    /// Tasks this worker took from another worker's deque.
    pub stolen: usize,
}

/// Outcome of a successful pool run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Counters indexed by worker id.
    pub workers: Vec<WorkerStats>,
}

impl PoolReport {
    fn idle(worker_count: usize) -> Self {
        Self {
            workers: vec![WorkerStats::default(); worker_count],
        }
    }

    /// Total tasks completed.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.workers.iter().map(|w| w.processed).sum()
    }

    /// Total tasks that ran on a worker other than the one they were
    /// seeded to.
    #[must_use]
    pub fn stolen(&self) -> usize {
        self.workers.iter().map(|w| w.stolen).sum()
    }
}

/// Abort flag plus the first error reported by any worker.
#[derive(Debug, Default)]
struct RunState {
    aborting: AtomicBool,
    first_error: Mutex<Option<FxError>>,
}

impl RunState {
    #[inline]
    fn is_aborting(&self) -> bool {
        self.aborting.load(Ordering::Acquire)
    }

    fn abort(&self, error: FxError) {
        self.aborting.store(true, Ordering::Release);

        let mut slot = self.first_error.lock();
        if slot.is_none() {
            warn!(%error, "aborting run");
            *slot = Some(error);
        } else {
            debug!(%error, "run already aborting, dropping error");
        }
    }
}

/// A fixed-size pool of work-stealing workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerPool {
    worker_count: usize,
}

impl WorkerPool {
    /// Creates a pool of `worker_count` workers.
    ///
    /// # Errors
    ///
    /// Returns [`FxError::InvalidWorkerCount`] if `worker_count` is zero.
    pub fn new(worker_count: usize) -> FxResult<Self> {
        if worker_count == 0 {
            return Err(FxError::InvalidWorkerCount(worker_count));
        }
        Ok(Self { worker_count })
    }

    /// Number of workers.
    #[inline]
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Runs `process` once for every task and returns when all workers exit.
    ///
    /// All tasks are seeded round-robin before the first worker starts. The
    /// first error stops every worker at its next task boundary; tasks still
    /// queued are dropped and that error is returned.
    ///
    /// # Errors
    ///
    /// Returns the first error from `process`, [`FxError::WorkerPanicked`] if
    /// a worker panicked, or [`FxError::Spawn`] if a thread could not start.
    pub fn run<T, F>(&self, tasks: Vec<T>, process: F) -> FxResult<PoolReport>
    where
        T: Send,
        F: Fn(T, &WorkerContext) -> FxResult<()> + Sync,
    {
        let worker_count = self.worker_count;
        if tasks.is_empty() {
            return Ok(PoolReport::idle(worker_count));
        }

        let task_count = tasks.len();
        let deques: Vec<WorkStealingDeque<T>> =
            (0..worker_count).map(|_| WorkStealingDeque::new()).collect();
        for (index, task) in tasks.into_iter().enumerate() {
            deques[index % worker_count].push_own(task);
        }
        let stealers: Vec<Stealer<T>> = deques.iter().map(WorkStealingDeque::stealer).collect();
        let state = RunState::default();

        debug!(tasks = task_count, workers = worker_count, "pool seeded");

        let (stats, panicked) = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(worker_count);

            for (id, deque) in deques.into_iter().enumerate() {
                let context = WorkerContext { id, worker_count };
                let stealers = stealers.as_slice();
                let state = &state;
                let process = &process;

                let spawned = thread::Builder::new()
                    .name(format!("phasefx-worker-{id}"))
                    .spawn_scoped(scope, move || {
                        worker_loop(&context, &deque, stealers, state, process)
                    });

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(err) => {
                        state.abort(FxError::Spawn(err));
                        break;
                    }
                }
            }

            let mut stats = Vec::with_capacity(handles.len());
            let mut panicked = None;
            for (id, handle) in handles.into_iter().enumerate() {
                if let Ok(worker) = handle.join() {
                    stats.push(worker);
                } else {
                    warn!(worker = id, "worker panicked");
                    if panicked.is_none() {
                        panicked = Some(id);
                    }
                    stats.push(WorkerStats::default());
                }
            }
            (stats, panicked)
        });

        if let Some(error) = state.first_error.into_inner() {
            return Err(error);
        }
        if let Some(id) = panicked {
            return Err(FxError::WorkerPanicked(id));
        }

        let report = PoolReport { workers: stats };
        info!(
            processed = report.processed(),
            stolen = report.stolen(),
            workers = worker_count,
            "pool finished"
        );
        Ok(report)
    }
}

/// Pops own tasks, then steals, until nothing is left anywhere.
fn worker_loop<T, F>(
    context: &WorkerContext,
    own: &WorkStealingDeque<T>,
    stealers: &[Stealer<T>],
    state: &RunState,
    process: &F,
) -> WorkerStats
where
    T: Send,
    F: Fn(T, &WorkerContext) -> FxResult<()> + Sync,
{
    let mut stats = WorkerStats::default();

    while !state.is_aborting() {
        let task = if let Some(task) = own.pop_own() {
            task
        } else if let Some((victim, task)) = steal_from_peers(context.id, stealers) {
            debug!(worker = context.id, victim, "stole task");
            stats.stolen += 1;
            task
        } else {
            break;
        };

        if let Err(error) = process(task, context) {
            state.abort(error);
            break;
        }
        stats.processed += 1;
    }

    debug!(
        worker = context.id,
        processed = stats.processed,
        stolen = stats.stolen,
        "worker exiting"
    );
    stats
}

/// Tries every other worker in index order; returns the victim and its task.
fn steal_from_peers<T: Send>(me: usize, stealers: &[Stealer<T>]) -> Option<(usize, T)> {
    stealers
        .iter()
        .enumerate()
        .filter(|&(victim, _)| victim != me)
        .find_map(|(victim, stealer)| stealer.steal().map(|task| (victim, task)))
}

/// Loads, transforms and stores one task.
fn process_task<R: TaskResolver>(
    task: &Task,
    executor: &SlicedEffectExecutor,
    resolver: &R,
) -> FxResult<()> {
    let effects = parse_effects(&task.effects)?;
    let mut image = resolver.load(task)?;
    executor.run(&mut image, &effects)?;
    resolver.store(task, &image)
}

/// Runs every task through a work-stealing pool of `worker_count` workers.
///
/// Each task's effects run on a [`SlicedEffectExecutor`] with the same
/// `worker_count` bands.
///
/// # Errors
///
/// Returns [`FxError::InvalidWorkerCount`] before anything runs, or the first
/// failing task as [`FxError::TaskAborted`].
pub fn schedule_tasks<R: TaskResolver>(
    tasks: Vec<Task>,
    worker_count: usize,
    resolver: &R,
) -> FxResult<PoolReport> {
    let pool = WorkerPool::new(worker_count)?;
    let executor = SlicedEffectExecutor::new(worker_count)?;

    info!(tasks = tasks.len(), workers = worker_count, "scheduling tasks");

    pool.run(tasks, |task, context| {
        process_task(&task, &executor, resolver).map_err(|error| error.in_task(&task.source))?;
        info!(
            worker = context.id(),
            source = %task.source,
            destination = %task.destination,
            "task complete"
        );
        Ok(())
    })
}
