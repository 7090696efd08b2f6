//! # Effect Kernels
//!
//! Pure per-pixel transforms. A kernel reads the whole input buffer (bands
//! need their neighbors' rows) and writes only the rows of its band.
//!
//! | Id | Effect      | Weights (row-major 3×3)          |
//! |----|-------------|----------------------------------|
//! | S  | Sharpen     | `0 -1 0 / -1 5 -1 / 0 -1 0`      |
//! | E  | Edge detect | `-1 -1 -1 / -1 8 -1 / -1 -1 -1`  |
//! | B  | Blur        | `1/9` everywhere                 |
//! | G  | Grayscale   | pointwise `(r + g + b) / 3`      |
//!
//! Neighbors outside the image are treated as zero ("zero padding"), so
//! border pixels lose some accuracy. That is accepted, not an error.

use std::fmt;
use std::str::FromStr;

use crate::error::{FxError, FxResult};
use crate::image::{Bounds, Pixel, CHANNEL_MAX};

/// A contiguous range of rows `[start, end)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RowBand {
    /// First row (inclusive).
    pub start: usize,
    /// Last row (exclusive).
    pub end: usize,
}

impl RowBand {
    /// Creates a band covering `[start, end)`.
    #[inline]
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Band covering every row of `bounds`.
    #[inline]
    #[must_use]
    pub const fn full(bounds: Bounds) -> Self {
        Self::new(0, bounds.height)
    }

    /// Number of rows in the band.
    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start
    }

    /// Returns true if the band has no rows.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }
}

/// A stateless transform applied to one band of an image.
pub trait EffectKernel: Send + Sync {
    /// Writes `band`'s rows of the result into `output`.
    ///
    /// `input` is the full readable buffer (`bounds.area()` pixels) and
    /// `output` holds exactly `band.len() * bounds.width` pixels, row-major,
    /// starting at row `band.start`.
    fn apply(&self, input: &[Pixel], output: &mut [Pixel], band: RowBand, bounds: Bounds);
}

/// Clamps an accumulated channel into `0..=65535`, truncating toward zero.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_channel(value: f64) -> u16 {
    value.clamp(0.0, f64::from(CHANNEL_MAX)) as u16
}

/// A 3×3 convolution over the color channels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Convolution3x3 {
    weights: [f64; 9],
}

impl Convolution3x3 {
    /// Creates a kernel from row-major weights.
    #[must_use]
    pub const fn new(weights: [f64; 9]) -> Self {
        Self { weights }
    }

    /// Weight applied to the pixel itself.
    #[inline]
    #[must_use]
    pub const fn center_weight(&self) -> f64 {
        self.weights[4]
    }

    /// Convolves the neighborhood of `(x, y)`; alpha is taken from the
    /// center pixel unchanged.
    #[inline]
    #[allow(clippy::cast_possible_wrap)]
    fn convolve(&self, input: &[Pixel], bounds: Bounds, x: usize, y: usize) -> Pixel {
        let (mut r, mut g, mut b) = (0.0f64, 0.0f64, 0.0f64);

        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                let nx = x as isize + dx;
                let ny = y as isize + dy;
                if !bounds.contains(nx, ny) {
                    continue; // zero padding
                }

                #[allow(clippy::cast_sign_loss)]
                let neighbor = input[bounds.index(nx as usize, ny as usize)];
                #[allow(clippy::cast_sign_loss)]
                let weight = self.weights[((dy + 1) * 3 + (dx + 1)) as usize];
                r += f64::from(neighbor.r) * weight;
                g += f64::from(neighbor.g) * weight;
                b += f64::from(neighbor.b) * weight;
            }
        }

        let alpha = input[bounds.index(x, y)].a;
        Pixel::new(clamp_channel(r), clamp_channel(g), clamp_channel(b), alpha)
    }
}

impl EffectKernel for Convolution3x3 {
    fn apply(&self, input: &[Pixel], output: &mut [Pixel], band: RowBand, bounds: Bounds) {
        debug_assert_eq!(input.len(), bounds.area());
        debug_assert_eq!(output.len(), band.len() * bounds.width);

        for (row, y) in (band.start..band.end).enumerate() {
            let out_row = &mut output[row * bounds.width..(row + 1) * bounds.width];
            for (x, out) in out_row.iter_mut().enumerate() {
                *out = self.convolve(input, bounds, x, y);
            }
        }
    }
}

/// Unweighted average of the three color channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Grayscale;

impl Grayscale {
    /// Grayscale value of one pixel; alpha passes through.
    #[inline]
    #[must_use]
    pub fn convert(pixel: Pixel) -> Pixel {
        let sum = u32::from(pixel.r) + u32::from(pixel.g) + u32::from(pixel.b);
        // Average of three u16 values always fits.
        #[allow(clippy::cast_possible_truncation)]
        let gray = (sum / 3) as u16;
        Pixel::new(gray, gray, gray, pixel.a)
    }
}

impl EffectKernel for Grayscale {
    fn apply(&self, input: &[Pixel], output: &mut [Pixel], band: RowBand, bounds: Bounds) {
        let rows = &input[bounds.index(0, band.start)..bounds.index(0, band.end)];
        for (out, &pixel) in output.iter_mut().zip(rows) {
            *out = Self::convert(pixel);
        }
    }
}

const NINTH: f64 = 1.0 / 9.0;

static SHARPEN: Convolution3x3 =
    Convolution3x3::new([0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0]);
static EDGE_DETECT: Convolution3x3 =
    Convolution3x3::new([-1.0, -1.0, -1.0, -1.0, 8.0, -1.0, -1.0, -1.0, -1.0]);
static BLUR: Convolution3x3 = Convolution3x3::new([NINTH; 9]);
static GRAYSCALE: Grayscale = Grayscale;

/// The closed set of supported effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Sharpen (`S`).
    Sharpen,
    /// Edge detection (`E`).
    EdgeDetect,
    /// Box blur (`B`).
    Blur,
    /// Grayscale (`G`).
    Grayscale,
}

impl Effect {
    /// Every effect, in identifier order `S, E, B, G`.
    pub const ALL: [Self; 4] = [Self::Sharpen, Self::EdgeDetect, Self::Blur, Self::Grayscale];

    /// The short identifier used in task lists.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Sharpen => "S",
            Self::EdgeDetect => "E",
            Self::Blur => "B",
            Self::Grayscale => "G",
        }
    }

    /// The kernel implementing this effect.
    #[must_use]
    pub fn kernel(self) -> &'static dyn EffectKernel {
        match self {
            Self::Sharpen => &SHARPEN,
            Self::EdgeDetect => &EDGE_DETECT,
            Self::Blur => &BLUR,
            Self::Grayscale => &GRAYSCALE,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Effect {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S" | "sharpen" => Ok(Self::Sharpen),
            "E" | "edge-detect" => Ok(Self::EdgeDetect),
            "B" | "blur" => Ok(Self::Blur),
            "G" | "grayscale" => Ok(Self::Grayscale),
            other => Err(FxError::UnknownEffect(other.to_string())),
        }
    }
}

/// Parses a whole effect list, failing on the first unknown identifier.
///
/// # Errors
///
/// Returns [`FxError::UnknownEffect`] for any identifier outside the set.
pub fn parse_effects<S: AsRef<str>>(identifiers: &[S]) -> FxResult<Vec<Effect>> {
    identifiers.iter().map(|id| id.as_ref().parse()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply_full(kernel: &dyn EffectKernel, input: &[Pixel], bounds: Bounds) -> Vec<Pixel> {
        let mut output = vec![Pixel::default(); bounds.area()];
        kernel.apply(input, &mut output, RowBand::full(bounds), bounds);
        output
    }

    #[test]
    fn test_grayscale_truncates_average() {
        let out = Grayscale::convert(Pixel::new(25, 75, 250, 1234));
        assert_eq!(out, Pixel::new(116, 116, 116, 1234));
    }

    #[test]
    fn test_grayscale_is_fixed_point() {
        let once = Grayscale::convert(Pixel::new(65535, 3, 40000, 7));
        assert_eq!(Grayscale::convert(once), once);
    }

    #[test]
    fn test_one_pixel_image_keeps_only_center_weight() {
        let bounds = Bounds::new(1, 1);
        let input = [Pixel::new(1000, 2000, 3000, 42)];

        for kernel in [&SHARPEN, &EDGE_DETECT, &BLUR] {
            let weight = kernel.center_weight();
            let scaled = |v: u16| clamp_channel(f64::from(v) * weight);
            let result = apply_full(kernel, &input, bounds);
            assert_eq!(result[0], Pixel::new(scaled(1000), scaled(2000), scaled(3000), 42));
        }

        let blurred = apply_full(&BLUR, &input, bounds);
        assert_eq!(blurred[0], Pixel::new(111, 222, 333, 42));
    }

    #[test]
    fn test_one_pixel_image_clamps_high() {
        let bounds = Bounds::new(1, 1);
        let input = [Pixel::new(20000, 65535, 0, CHANNEL_MAX)];
        let sharpened = apply_full(Effect::Sharpen.kernel(), &input, bounds);
        assert_eq!(sharpened[0], Pixel::new(65535, 65535, 0, CHANNEL_MAX));
    }

    #[test]
    fn test_edge_detect_clamps_low() {
        // Bright neighbors around a dark center drive the sum negative.
        let bounds = Bounds::new(3, 3);
        let mut input = vec![Pixel::opaque(1000, 1000, 1000); 9];
        input[4] = Pixel::opaque(0, 0, 0);
        let edges = apply_full(Effect::EdgeDetect.kernel(), &input, bounds);
        assert_eq!(edges[4], Pixel::opaque(0, 0, 0));
    }

    #[test]
    fn test_band_writes_only_its_rows() {
        let bounds = Bounds::new(3, 4);
        let input: Vec<Pixel> = (0..12u16).map(|v| Pixel::opaque(v * 100, v, 0)).collect();
        let full = apply_full(Effect::Sharpen.kernel(), &input, bounds);

        let band = RowBand::new(1, 3);
        let mut partial = vec![Pixel::default(); band.len() * bounds.width];
        Effect::Sharpen.kernel().apply(&input, &mut partial, band, bounds);
        assert_eq!(partial.as_slice(), &full[3..9]);
    }

    #[test]
    fn test_parse_effects() {
        let effects = parse_effects(&["S", "edge-detect", "B", "G"]).unwrap();
        assert_eq!(effects, Effect::ALL.to_vec());

        let err = parse_effects(&["S", "X"]).unwrap_err();
        assert!(matches!(err, FxError::UnknownEffect(ref id) if id == "X"));
    }

    #[test]
    fn test_effect_code_round_trips_through_from_str() {
        for effect in Effect::ALL {
            assert_eq!(effect.code().parse::<Effect>().unwrap(), effect);
        }
    }
}
