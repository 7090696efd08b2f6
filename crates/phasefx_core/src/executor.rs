//! # Sliced Effect Executor
//!
//! Applies an effect list to one image, one barrier-synchronized phase per
//! effect.
//!
//! ```text
//! [Apply an effect]
//! ├─ Launcher partitions rows into worker_count bands
//! ├─ One scoped thread per band: kernel(current → scratch[band])
//! ├─ Every band thread calls barrier.wait() when done
//! ├─ Launcher calls barrier.wait()
//! │  (blocks until all bands + self arrive)
//! [Barrier release]
//! └─ Swap buffers (except after the last effect), next effect
//! ```
//!
//! Bands partition the *write* set only. A 3×3 kernel reads one row past
//! each band edge, which is why no effect may start before the previous one
//! has finished on every band.

use std::thread;

use crate::effect::{parse_effects, Effect, RowBand};
use crate::error::{FxError, FxResult};
use crate::image::Image;
use crate::sync::PhaseBarrier;

/// Splits `[0, height)` into `count` contiguous bands.
///
/// Every band but the last has `height / count` rows; the last absorbs the
/// remainder. Bands are disjoint and cover every row exactly once. When
/// `count > height` the leading bands are empty.
///
/// # Panics
///
/// Panics if `count` is zero.
#[must_use]
pub fn partition_rows(height: usize, count: usize) -> Vec<RowBand> {
    assert!(count > 0, "Cannot partition rows into zero bands");

    let band_height = height / count;
    (0..count)
        .map(|i| {
            let start = i * band_height;
            let end = if i == count - 1 { height } else { start + band_height };
            RowBand::new(start, end)
        })
        .collect()
}

/// Runs effects over row bands in parallel, one phase per effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlicedEffectExecutor {
    worker_count: usize,
}

impl SlicedEffectExecutor {
    /// Creates an executor that splits every phase into `worker_count` bands.
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

    /// Number of band workers per phase.
    #[inline]
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Applies `effects` in order. An empty list leaves the image untouched.
    ///
    /// # Errors
    ///
    /// Returns [`FxError::Spawn`] if a band thread cannot be started. Bands
    /// already running finish their phase first; the image contents are
    /// unspecified afterwards.
    pub fn run(&self, image: &mut Image, effects: &[Effect]) -> FxResult<()> {
        self.run_with(image, effects, |band| {
            thread::Builder::new().name(format!("phasefx-band-{band}"))
        })
    }

    /// [`run`](Self::run) with the builder for each band thread supplied by
    /// the caller.
    fn run_with<B>(&self, image: &mut Image, effects: &[Effect], band_builder: B) -> FxResult<()>
    where
        B: Fn(usize) -> thread::Builder,
    {
        if effects.is_empty() {
            return Ok(());
        }

        image.settle();
        let bounds = image.bounds();
        let bands = partition_rows(bounds.height, self.worker_count);
        // One barrier for the whole run: bands plus the launcher, every phase.
        let barrier = PhaseBarrier::new(self.worker_count + 1);

        for (index, &effect) in effects.iter().enumerate() {
            let kernel = effect.kernel();
            let (input, output) = image.buffers_mut();

            let spawn_error = thread::scope(|scope| {
                let mut remaining = output;
                let mut spawn_error = None;

                for (band_index, &band) in bands.iter().enumerate() {
                    let (band_output, rest) =
                        std::mem::take(&mut remaining).split_at_mut(band.len() * bounds.width);
                    remaining = rest;

                    let barrier = &barrier;
                    let spawned = band_builder(band_index).spawn_scoped(scope, move || {
                        kernel.apply(input, band_output, band, bounds);
                        let _ = barrier.wait();
                    });

                    if let Err(err) = spawned {
                        // Arrive for this band and every later one so the
                        // running bands are released.
                        for _ in band_index..bands.len() {
                            let _ = barrier.arrive();
                        }
                        spawn_error = Some(err);
                        break;
                    }
                }

                let phase = barrier.wait();
                tracing::debug!(
                    effect = %effect,
                    generation = phase.generation,
                    "phase released"
                );
                spawn_error
            });

            if let Some(err) = spawn_error {
                tracing::warn!(effect = %effect, error = %err, "band thread failed to start");
                return Err(FxError::Spawn(err));
            }

            if index + 1 < effects.len() {
                image.swap_buffers();
            }
        }

        image.mark_output_in_scratch();
        Ok(())
    }
}

/// Single-threaded reference path with the same buffer semantics as
/// [`SlicedEffectExecutor::run`].
pub fn apply_effects_sequential(image: &mut Image, effects: &[Effect]) {
    if effects.is_empty() {
        return;
    }

    image.settle();
    let bounds = image.bounds();
    for (index, &effect) in effects.iter().enumerate() {
        let (input, output) = image.buffers_mut();
        effect.kernel().apply(input, output, RowBand::full(bounds), bounds);
        if index + 1 < effects.len() {
            image.swap_buffers();
        }
    }

    image.mark_output_in_scratch();
}

/// Parses `effects` and runs them over `image` with `worker_count` bands.
///
/// Every identifier is validated before the first phase, so an unknown one
/// leaves the image untouched.
///
/// # Errors
///
/// Returns [`FxError::UnknownEffect`] or [`FxError::InvalidWorkerCount`], and
/// [`FxError::Spawn`] if a band thread cannot be started.
pub fn apply_effects_to_image<S: AsRef<str>>(
    image: &mut Image,
    effects: &[S],
    worker_count: usize,
) -> FxResult<()> {
    let executor = SlicedEffectExecutor::new(worker_count)?;
    let effects = parse_effects(effects)?;
    executor.run(image, &effects)
}
