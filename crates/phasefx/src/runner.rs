//! # Run Modes
//!
//! ```text
//! s         one thread          image after image, effects unsplit
//! parfiles  min(threads, M)     shared queue of images, effects unsplit
//! bsp       threads bands       image after image, effects in row bands
//! bspsteal  threads workers     work-stealing images, effects in row bands
//! ```
//!
//! Every mode sees the same task list and writes the same outputs.

use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use phasefx_core::{
    apply_effects_sequential, parse_effects, schedule_tasks, FxError, FxResult,
    SlicedEffectExecutor, Task, TaskResolver,
};
use phasefx_io::{build_tasks, PngResolver};
use tracing::{debug, info, warn};

use crate::config::{Mode, PipelineConfig};
use crate::error::PipelineResult;

/// What a finished run did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Mode that ran.
    pub mode: Mode,
    /// Tasks completed.
    pub tasks: usize,
    /// Tasks moved between workers (`bspsteal` only).
    pub stolen: usize,
    /// Wall-clock time for processing, excluding task-list parsing.
    pub elapsed: Duration,
}

/// Loads every task from `config`'s layout and runs it in `config.mode`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the task list cannot be
/// read, or any task fails.
pub fn run_pipeline(config: &PipelineConfig) -> PipelineResult<RunSummary> {
    config.validate()?;
    let tasks = build_tasks(&config.layout(), &config.data_dirs)?;
    info!(
        mode = %config.mode,
        threads = config.threads,
        tasks = tasks.len(),
        "starting run"
    );
    run_tasks(config.mode, tasks, config.threads, &PngResolver)
}

/// Runs prepared tasks in `mode` against any resolver.
///
/// # Errors
///
/// Returns [`phasefx_core::FxError::InvalidWorkerCount`] for zero threads
/// and the first failing task otherwise.
pub fn run_tasks<R: TaskResolver>(
    mode: Mode,
    tasks: Vec<Task>,
    threads: usize,
    resolver: &R,
) -> PipelineResult<RunSummary> {
    if threads == 0 {
        return Err(FxError::InvalidWorkerCount(threads).into());
    }

    let count = tasks.len();
    let start = Instant::now();
    let mut stolen = 0;

    match mode {
        Mode::Sequential => {
            for task in &tasks {
                run_one(task, resolver, Processing::Whole)?;
            }
        }
        Mode::ParFiles => run_parfiles(tasks, threads, resolver)?,
        Mode::Bsp => {
            let executor = SlicedEffectExecutor::new(threads)?;
            for task in &tasks {
                run_one(task, resolver, Processing::Banded(&executor))?;
            }
        }
        Mode::BspSteal => stolen = schedule_tasks(tasks, threads, resolver)?.stolen(),
    }

    let summary = RunSummary {
        mode,
        tasks: count,
        stolen,
        elapsed: start.elapsed(),
    };
    info!(
        mode = %summary.mode,
        tasks = summary.tasks,
        stolen = summary.stolen,
        elapsed_ms = summary.elapsed.as_millis(),
        "run finished"
    );
    Ok(summary)
}

/// How one image's effects are executed.
#[derive(Clone, Copy)]
enum Processing<'a> {
    /// Single-threaded, whole image per effect.
    Whole,
    /// Barrier-phased row bands.
    Banded(&'a SlicedEffectExecutor),
}

/// Loads, transforms and stores one task on the calling thread.
fn run_one<R: TaskResolver>(
    task: &Task,
    resolver: &R,
    processing: Processing<'_>,
) -> FxResult<()> {
    let start = Instant::now();
    transform(task, resolver, processing).map_err(|error| error.in_task(&task.source))?;
    debug!(
        source = %task.source,
        destination = %task.destination,
        elapsed_ms = start.elapsed().as_millis(),
        "task complete"
    );
    Ok(())
}

fn transform<R: TaskResolver>(
    task: &Task,
    resolver: &R,
    processing: Processing<'_>,
) -> FxResult<()> {
    let effects = parse_effects(&task.effects)?;
    let mut image = resolver.load(task)?;
    match processing {
        Processing::Whole => apply_effects_sequential(&mut image, &effects),
        Processing::Banded(executor) => executor.run(&mut image, &effects)?,
    }
    resolver.store(task, &image)
}

/// Keeps the first error of a run; later ones are logged and dropped.
fn record_error(slot: &Mutex<Option<FxError>>, error: FxError) {
    let mut slot = slot.lock();
    if slot.is_none() {
        warn!(%error, "aborting run");
        *slot = Some(error);
    } else {
        debug!(%error, "run already aborting, dropping error");
    }
}

/// Image-level parallelism: `min(threads, tasks)` workers drain one queue.
fn run_parfiles<R: TaskResolver>(tasks: Vec<Task>, threads: usize, resolver: &R) -> FxResult<()> {
    if tasks.is_empty() {
        return Ok(());
    }

    let workers = threads.min(tasks.len());
    let (sender, receiver) = crossbeam_channel::unbounded();
    for task in tasks {
        // The receiver is alive, so the send cannot fail.
        let _ = sender.send(task);
    }
    drop(sender);

    let first_error: Mutex<Option<FxError>> = Mutex::new(None);

    let panicked = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let receiver = receiver.clone();
            let first_error = &first_error;
            let spawned = thread::Builder::new()
                .name(format!("phasefx-files-{id}"))
                .spawn_scoped(scope, move || {
                    while first_error.lock().is_none() {
                        let Ok(task) = receiver.recv() else { break };
                        if let Err(error) = run_one(&task, resolver, Processing::Whole) {
                            record_error(first_error, error);
                            break;
                        }
                    }
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    record_error(first_error, FxError::Spawn(err));
                    break;
                }
            }
        }

        let mut panicked = None;
        for (id, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() {
                warn!(worker = id, "worker panicked");
                if panicked.is_none() {
                    panicked = Some(id);
                }
            }
        }
        panicked
    });

    if let Some(error) = first_error.into_inner() {
        return Err(error);
    }
    match panicked {
        Some(id) => Err(FxError::WorkerPanicked(id)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phasefx_core::{Image, Pixel};
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryResolver {
        stored: Mutex<HashMap<String, Vec<Pixel>>>,
    }

    impl TaskResolver for MemoryResolver {
        fn load(&self, task: &Task) -> FxResult<Image> {
            if task.source.starts_with("missing") {
                return Err(FxError::Resolve {
                    id: task.source.clone(),
                    reason: "not found".to_string(),
                });
            }
            let seed = u16::try_from(task.source.len()).unwrap_or(0);
            let pixels = (0..35u16)
                .map(|i| Pixel::opaque(i * 1700 + seed, 65535 - i * 900, i * seed))
                .collect();
            Image::from_pixels(7, 5, pixels)
        }

        fn store(&self, task: &Task, image: &Image) -> FxResult<()> {
            self.stored
                .lock()
                .insert(task.destination.clone(), image.output().to_vec());
            Ok(())
        }
    }

    fn tasks(count: usize) -> Vec<Task> {
        let lists: [&[&str]; 3] = [&["S", "B"], &["G"], &["E", "S", "G"]];
        (0..count)
            .map(|i| {
                Task::new(
                    format!("in/{}", "x".repeat(i + 1)),
                    format!("out/{i}"),
                    lists[i % lists.len()].iter().map(ToString::to_string).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_every_mode_writes_identical_outputs() {
        let baseline = MemoryResolver::default();
        let summary = run_tasks(Mode::Sequential, tasks(9), 1, &baseline).unwrap();
        assert_eq!(summary.tasks, 9);
        let expected = baseline.stored.into_inner();
        assert_eq!(expected.len(), 9);

        for mode in [Mode::ParFiles, Mode::Bsp, Mode::BspSteal] {
            for threads in [1, 3, 16] {
                let resolver = MemoryResolver::default();
                let summary = run_tasks(mode, tasks(9), threads, &resolver).unwrap();
                assert_eq!(summary.mode, mode);
                assert_eq!(summary.tasks, 9);
                assert_eq!(resolver.stored.into_inner(), expected, "{mode} with {threads}");
            }
        }
    }

    #[test]
    fn test_zero_threads_rejected() {
        let resolver = MemoryResolver::default();
        for mode in Mode::ALL {
            assert!(run_tasks(mode, tasks(2), 0, &resolver).is_err());
        }
    }

    #[test]
    fn test_empty_task_list_succeeds() {
        let resolver = MemoryResolver::default();
        for mode in Mode::ALL {
            let summary = run_tasks(mode, Vec::new(), 4, &resolver).unwrap();
            assert_eq!(summary.tasks, 0);
        }
    }

    #[test]
    fn test_failing_task_aborts_every_mode() {
        for mode in Mode::ALL {
            let resolver = MemoryResolver::default();
            let mut list = tasks(4);
            list.push(Task::new("missing.png", "out/missing", vec!["B".to_string()]));

            let err = run_tasks(mode, list, 2, &resolver).unwrap_err();
            assert!(
                err.to_string().contains("missing.png"),
                "{mode}: unexpected error {err}"
            );
        }
    }
}
