//! # PHASEFX Core Engine
//!
//! Parallel image effects with two orthogonal strategies:
//! - **Across images:** a pool of workers with per-worker lock-free deques
//!   and work stealing
//! - **Within an image:** row bands processed concurrently, one
//!   barrier-synchronized phase per effect
//!
//! ## Architecture Rules
//!
//! 1. **No global state** - deques, barriers and abort flags live in the
//!    structs that own a run
//! 2. **Disjoint writes** - a band writes only its own rows of the scratch
//!    buffer
//! 3. **Phase ordering** - effect N+1 never reads a pixel before effect N
//!    has finished on every band
//!
//! ## Example
//!
//! ```rust,ignore
//! use phasefx_core::{apply_effects_to_image, Image, Pixel};
//!
//! let mut image = Image::filled(640, 480, Pixel::opaque(100, 200, 300));
//! apply_effects_to_image(&mut image, &["S", "B", "G"], 8)?;
//! let result = image.output();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod deque;
pub mod effect;
pub mod error;
pub mod executor;
pub mod image;
pub mod scheduler;
pub mod sync;

pub use deque::{Stealer, WorkStealingDeque};
pub use effect::{parse_effects, Convolution3x3, Effect, EffectKernel, Grayscale, RowBand};
pub use error::{FxError, FxResult};
pub use executor::{
    apply_effects_sequential, apply_effects_to_image, partition_rows, SlicedEffectExecutor,
};
pub use image::{Bounds, Image, Pixel, CHANNEL_MAX};
pub use scheduler::{
    schedule_tasks, PoolReport, Task, TaskResolver, WorkerContext, WorkerPool, WorkerStats,
};
pub use sync::{PhaseBarrier, PhaseWait};
