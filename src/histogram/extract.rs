//! Color histogram extraction.
//!
//! Layout of an extracted histogram:
//!
//! ```text
//! [ 0.0 x depth | r0 b0 g0 | r1 b1 g1 | ... ]
//! ```
//!
//! Channel intensities are taken at 8-bit precision (the 16-bit value shifted
//! right by 8). Bin `i` is divided by the channel sum selected by `i % 3`, where
//! sum 0 is red, 1 is blue and 2 is green. When `depth` is not a multiple of 3
//! the divisor therefore belongs to a different channel than the bin itself;
//! comparison only requires both sides to share the layout.

use crate::error::HistogramError;
use image::{DynamicImage, ImageFormat};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Normalized color histogram of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Path of the source image
    name: PathBuf,

    /// Normalized bins: `depth` padding bins followed by 3 bins per pixel
    bins: Vec<f32>,
}

impl Histogram {
    /// Build a histogram from pre-computed bins.
    pub fn new(name: impl Into<PathBuf>, bins: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            bins,
        }
    }

    /// Build a histogram from a decoded image.
    pub fn from_image(name: impl Into<PathBuf>, image: &DynamicImage, depth: usize) -> Self {
        let rgba = image.to_rgba16();
        let pixel_count = rgba.width() as usize * rgba.height() as usize;

        let mut bins = Vec::with_capacity(depth + 3 * pixel_count);
        bins.resize(depth, 0.0f64);

        // [red, blue, green]
        let mut channel_sums = [0.0f64; 3];

        for pixel in rgba.pixels() {
            let [red, green, blue, _alpha] = pixel.0;
            let red = f64::from(red >> 8);
            let green = f64::from(green >> 8);
            let blue = f64::from(blue >> 8);

            channel_sums[0] += red;
            channel_sums[1] += blue;
            channel_sums[2] += green;

            bins.extend_from_slice(&[red, blue, green]);
        }

        let bins = bins
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let divisor = channel_sums[i % 3];
                if divisor > 0.0 {
                    (value / divisor) as f32
                } else {
                    0.0
                }
            })
            .collect();

        Self {
            name: name.into(),
            bins,
        }
    }

    /// Source image path.
    pub fn name(&self) -> &Path {
        &self.name
    }

    /// Normalized bins.
    pub fn bins(&self) -> &[f32] {
        &self.bins
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Sum of all bins.
    pub fn total_mass(&self) -> f32 {
        self.bins.iter().sum()
    }
}

/// Read and decode a JPEG file, then build its histogram.
///
/// Nothing is returned on failure: open errors map to [`HistogramError::Io`]
/// and everything the decoder rejects maps to [`HistogramError::Decode`].
pub fn extract(path: &Path, depth: usize) -> Result<Histogram, HistogramError> {
    let file = File::open(path).map_err(|source| HistogramError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let image = image::load(BufReader::new(file), ImageFormat::Jpeg).map_err(|source| {
        HistogramError::Decode {
            path: path.to_path_buf(),
            source,
        }
    })?;

    tracing::trace!(
        "Decoded {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );

    Ok(Histogram::from_image(path, &image, depth))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_length_includes_padding() {
        let hist = Histogram::from_image("a.jpg", &solid(4, 3, [10, 20, 30]), 10);
        assert_eq!(hist.len(), 10 + 3 * 12);
        assert!(hist.bins()[..10].iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_solid_color_normalization() {
        let hist = Histogram::from_image("a.jpg", &solid(3, 2, [200, 40, 90]), 0);

        for &bin in hist.bins() {
            assert_close(bin, 1.0 / 6.0);
        }
        // Each channel normalizes to 1
        assert_close(hist.total_mass(), 3.0);
    }

    #[test]
    fn test_pure_red_has_zero_blue_and_green() {
        let hist = Histogram::from_image("red.jpg", &solid(2, 2, [255, 0, 0]), 0);

        for (i, &bin) in hist.bins().iter().enumerate() {
            match i % 3 {
                0 => assert_close(bin, 0.25),
                _ => assert_eq!(bin, 0.0),
            }
        }
    }

    #[test]
    fn test_black_image_has_no_nan() {
        let hist = Histogram::from_image("black.jpg", &solid(5, 5, [0, 0, 0]), 7);
        assert!(hist.bins().iter().all(|b| *b == 0.0));
    }

    #[test]
    fn test_channel_order_red_blue_green() {
        // Two pixels so each channel sum differs from the single value
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([30, 10, 20]));
        img.put_pixel(1, 0, Rgb([10, 30, 60]));
        let hist = Histogram::from_image("pair.jpg", &DynamicImage::ImageRgb8(img), 0);

        // red sum 40, blue sum 80, green sum 40
        let expected = [30.0 / 40.0, 20.0 / 80.0, 10.0 / 40.0, 10.0 / 40.0, 60.0 / 80.0, 30.0 / 40.0];
        for (bin, want) in hist.bins().iter().zip(expected) {
            assert_close(*bin, want);
        }
    }

    #[test]
    fn test_unaligned_depth_uses_index_modulo() {
        // depth 1 shifts pixel data by one slot: the red value lands at index 1
        // and is divided by the blue sum
        let mut img = RgbImage::new(1, 1);
        img.put_pixel(0, 0, Rgb([100, 50, 25]));
        let hist = Histogram::from_image("shift.jpg", &DynamicImage::ImageRgb8(img), 1);

        // sums: red 100, blue 25, green 50
        assert_eq!(hist.len(), 4);
        assert_eq!(hist.bins()[0], 0.0);
        assert_close(hist.bins()[1], 100.0 / 25.0);
        assert_close(hist.bins()[2], 25.0 / 50.0);
        assert_close(hist.bins()[3], 50.0 / 100.0);
    }

    #[test]
    fn test_extract_missing_file() {
        let err = extract(Path::new("/nonexistent/definitely/missing.jpg"), 10).unwrap_err();
        assert!(matches!(err, HistogramError::Io { .. }));
    }

    #[test]
    fn test_extract_not_a_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"this is not a jpeg").unwrap();

        let err = extract(&path, 10).unwrap_err();
        assert!(matches!(err, HistogramError::Decode { .. }));
    }

    #[test]
    fn test_extract_jpeg_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.jpg");
        solid(8, 8, [128, 128, 128])
            .save_with_format(&path, ImageFormat::Jpeg)
            .unwrap();

        let hist = extract(&path, 3).unwrap();
        assert_eq!(hist.name(), path.as_path());
        assert_eq!(hist.len(), 3 + 3 * 64);
        assert!(hist.bins().iter().all(|b| b.is_finite()));
        assert!((hist.total_mass() - 3.0).abs() < 1e-3);
    }
}
