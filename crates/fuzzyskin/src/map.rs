//! Displacement-map loading and sampling.

use std::path::Path;

use crate::error::{FuzzyError, Result};

/// A decoded 2-D scalar field sampled by normalized planar position.
///
/// Values are luminance normalized into `[0, 1]`; the displacement
/// generator rescales samples into the configured `[z_min, z_max]` range.
#[derive(Debug, Clone)]
pub struct DisplacementMap {
    width: u32,
    height: u32,
    samples: Vec<f32>,
}

impl DisplacementMap {
    /// Decode an image file into a normalized luminance field.
    pub fn load(path: &Path) -> Result<Self> {
        let img = image::open(path).map_err(|source| FuzzyError::MapLoad {
            path: path.display().to_string(),
            source,
        })?;
        let luma = img.to_luma8();
        let (width, height) = luma.dimensions();
        let samples = luma.pixels().map(|p| f32::from(p.0[0]) / 255.0).collect();
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Build a field from raw row-major samples in `[0, 1]`.
    pub fn from_samples(width: u32, height: u32, samples: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 || samples.len() != (width * height) as usize {
            return Err(FuzzyError::InvalidSettings(format!(
                "displacement field dimensions {}x{} do not match {} samples",
                width,
                height,
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Width in samples.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in samples.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bilinear sample at normalized coordinates, clamped to the edges.
    pub fn sample(&self, u: f64, v: f64) -> f64 {
        let fx = u.clamp(0.0, 1.0) * f64::from(self.width - 1);
        let fy = v.clamp(0.0, 1.0) * f64::from(self.height - 1);

        let x0 = fx.floor() as u32;
        let y0 = fy.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let tx = fx - f64::from(x0);
        let ty = fy - f64::from(y0);

        let at = |x: u32, y: u32| f64::from(self.samples[(y * self.width + x) as usize]);

        let top = at(x0, y0) * (1.0 - tx) + at(x1, y0) * tx;
        let bottom = at(x0, y1) * (1.0 - tx) + at(x1, y1) * tx;
        top * (1.0 - ty) + bottom * ty
    }
}
