//! Filesystem [`TaskResolver`]: task identifiers are PNG paths.

use phasefx_core::{FxResult, Image, Task, TaskResolver};

use crate::png::{load_png, save_png};

/// Loads `task.source` and stores to `task.destination` as PNG files.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngResolver;

impl TaskResolver for PngResolver {
    fn load(&self, task: &Task) -> FxResult<Image> {
        load_png(&task.source).map_err(|e| e.into_resolve(&task.source))
    }

    fn store(&self, task: &Task, image: &Image) -> FxResult<()> {
        save_png(image, &task.destination).map_err(|e| e.into_resolve(&task.destination))
    }
}
