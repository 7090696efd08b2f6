//! # Double-Buffered Images
//!
//! An [`Image`] owns two equally-sized pixel buffers:
//!
//! ```text
//!   current ──read──► kernel ──write──► scratch
//!        ▲                                 │
//!        └────────── swap (between effects)┘
//! ```
//!
//! The swap is a pointer exchange, never a copy. After the last effect of a
//! run the result is left in `scratch` and the image remembers that;
//! [`Image::output`] always returns the latest result.

use bytemuck::{Pod, Zeroable};

use crate::error::{FxError, FxResult};

/// Largest value a channel can hold (16-bit depth).
pub const CHANNEL_MAX: u16 = u16::MAX;

/// One RGBA pixel with 16 bits per channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Pixel {
    /// Red channel.
    pub r: u16,
    /// Green channel.
    pub g: u16,
    /// Blue channel.
    pub b: u16,
    /// Alpha channel (never touched by effects).
    pub a: u16,
}

impl Pixel {
    /// Creates a pixel from its four channels.
    #[inline]
    #[must_use]
    pub const fn new(r: u16, g: u16, b: u16, a: u16) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a fully opaque pixel.
    #[inline]
    #[must_use]
    pub const fn opaque(r: u16, g: u16, b: u16) -> Self {
        Self::new(r, g, b, CHANNEL_MAX)
    }
}

/// Width and height of an image in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bounds {
    /// Pixels per row.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
}

impl Bounds {
    /// Creates new bounds.
    #[inline]
    #[must_use]
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Total pixel count.
    #[inline]
    #[must_use]
    pub const fn area(self) -> usize {
        self.width * self.height
    }

    /// Returns true if the signed coordinate lies inside the image.
    #[inline]
    #[must_use]
    pub fn contains(self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Row-major index of `(x, y)`.
    #[inline]
    #[must_use]
    pub const fn index(self, x: usize, y: usize) -> usize {
        y * self.width + x
    }
}

/// A mutable image with an input buffer and a scratch buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    current: Vec<Pixel>,
    scratch: Vec<Pixel>,
    bounds: Bounds,
    /// Set when the last run left its result in `scratch`.
    output_in_scratch: bool,
}

impl Image {
    /// Creates a transparent black image.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, Pixel::default())
    }

    /// Creates an image with every pixel set to `pixel`.
    #[must_use]
    pub fn filled(width: usize, height: usize, pixel: Pixel) -> Self {
        let bounds = Bounds::new(width, height);
        Self {
            current: vec![pixel; bounds.area()],
            scratch: vec![Pixel::default(); bounds.area()],
            bounds,
            output_in_scratch: false,
        }
    }

    /// Wraps an existing row-major pixel buffer.
    ///
    /// # Errors
    ///
    /// Returns [`FxError::BufferSizeMismatch`] if `pixels.len()` is not
    /// `width * height`.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Pixel>) -> FxResult<Self> {
        let bounds = Bounds::new(width, height);
        if pixels.len() != bounds.area() {
            return Err(FxError::BufferSizeMismatch {
                expected: bounds.area(),
                actual: pixels.len(),
            });
        }

        Ok(Self {
            scratch: vec![Pixel::default(); pixels.len()],
            current: pixels,
            bounds,
            output_in_scratch: false,
        })
    }

    /// Returns the image bounds.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Image width in pixels.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.bounds.width
    }

    /// Image height in pixels.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> usize {
        self.bounds.height
    }

    /// Returns true if the last run left its result in the scratch buffer.
    #[inline]
    #[must_use]
    pub const fn has_pending_output(&self) -> bool {
        self.output_in_scratch
    }

    /// The latest result: the scratch buffer after a non-empty run, the
    /// input buffer otherwise.
    #[inline]
    #[must_use]
    pub fn output(&self) -> &[Pixel] {
        if self.output_in_scratch {
            &self.scratch
        } else {
            &self.current
        }
    }

    /// Consumes the image and returns the latest result.
    #[must_use]
    pub fn into_output(self) -> Vec<Pixel> {
        if self.output_in_scratch {
            self.scratch
        } else {
            self.current
        }
    }

    /// Reads a pixel of the latest result.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    #[inline]
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> Pixel {
        assert!(x < self.width() && y < self.height(), "Pixel ({x}, {y}) out of bounds");
        self.output()[self.bounds.index(x, y)]
    }

    /// Writes a pixel into the input of the next run.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn set_pixel(&mut self, x: usize, y: usize, pixel: Pixel) {
        assert!(x < self.width() && y < self.height(), "Pixel ({x}, {y}) out of bounds");
        self.settle();
        let index = self.bounds.index(x, y);
        self.current[index] = pixel;
    }

    /// Exchanges the roles of the two buffers. O(1).
    #[inline]
    pub fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.current, &mut self.scratch);
    }

    /// Promotes a pending result so that it becomes the next run's input.
    pub(crate) fn settle(&mut self) {
        if self.output_in_scratch {
            self.swap_buffers();
            self.output_in_scratch = false;
        }
    }

    /// Records that the last completed effect wrote into `scratch`.
    pub(crate) fn mark_output_in_scratch(&mut self) {
        self.output_in_scratch = true;
    }

    /// Splits the image into (readable input, writable output).
    #[inline]
    pub(crate) fn buffers_mut(&mut self) -> (&[Pixel], &mut [Pixel]) {
        (&self.current, &mut self.scratch)
    }
}
