//! # PNG Codec
//!
//! Every image enters and leaves the core as 16-bit RGBA, whatever depth the
//! file on disk uses.
//!
//! ```text
//! file.png ──decode──► Rgba16 ──cast_slice──► [Pixel] ──► Image
//! Image::output() ──cast_slice──► [u16] ──► Rgba16 ──encode──► out.png
//! ```

use std::fs;
use std::path::Path;

use image::{ImageBuffer, ImageFormat, Rgba};
use phasefx_core::{Image, Pixel};

use crate::error::{IoError, IoResult};

/// A 16-bit RGBA buffer as the codec sees it.
type Rgba16Buffer = ImageBuffer<Rgba<u16>, Vec<u16>>;

/// Decodes a PNG into a 16-bit RGBA [`Image`].
///
/// 8-bit sources are widened (`v * 257`), so full-scale stays full-scale.
///
/// # Errors
///
/// Returns [`IoError::Image`] if the file cannot be opened or decoded.
pub fn load_png(path: impl AsRef<Path>) -> IoResult<Image> {
    let path = path.as_ref();
    let rgba = image::open(path)
        .map_err(|e| IoError::image(path, e))?
        .into_rgba16();

    let (width, height) = rgba.dimensions();
    let too_large = || IoError::Dimensions {
        width: u64::from(width),
        height: u64::from(height),
    };
    let width = usize::try_from(width).map_err(|_| too_large())?;
    let height = usize::try_from(height).map_err(|_| too_large())?;

    let channels = rgba.into_raw();
    let pixels: Vec<Pixel> = bytemuck::cast_slice(&channels).to_vec();
    let image = Image::from_pixels(width, height, pixels).map_err(|_| too_large())?;

    tracing::debug!(path = %path.display(), width, height, "decoded png");
    Ok(image)
}

/// Encodes the latest result of `image` as a 16-bit RGBA PNG.
///
/// Missing parent directories are created.
///
/// # Errors
///
/// Returns [`IoError::Io`] if a directory cannot be created,
/// [`IoError::Dimensions`] if the image is too large for PNG, and
/// [`IoError::Image`] if encoding or writing fails.
pub fn save_png(image: &Image, path: impl AsRef<Path>) -> IoResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IoError::io(parent, e))?;
    }

    let too_large = || IoError::Dimensions {
        width: image.width() as u64,
        height: image.height() as u64,
    };
    let width = u32::try_from(image.width()).map_err(|_| too_large())?;
    let height = u32::try_from(image.height()).map_err(|_| too_large())?;

    let channels: Vec<u16> = bytemuck::cast_slice(image.output()).to_vec();
    let buffer = Rgba16Buffer::from_raw(width, height, channels).ok_or_else(too_large)?;
    buffer
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| IoError::image(path, e))?;

    tracing::debug!(path = %path.display(), width, height, "encoded png");
    Ok(())
}
