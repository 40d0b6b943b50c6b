use ndarray::{Array3, Array4, ArrayView3, Axis};

use crate::foundation::error::{NodeError, NodeResult};

/// Channel counts an image tensor may carry (luma, RGB, RGBA).
pub const SUPPORTED_CHANNELS: [usize; 3] = [1, 3, 4];

/// Channel count of every latent tensor emitted by the size nodes.
pub const LATENT_CHANNELS: usize = 4;

/// Spatial downscale factor between pixel space and latent space.
pub const LATENT_DOWNSCALE: u32 = 8;

/// A batch of images laid out as `[batch, height, width, channels]`, values in `0.0..=1.0`.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBatch {
    data: Array4<f32>,
}

impl ImageBatch {
    /// Wrap an existing tensor, validating the channel axis.
    pub fn new(data: Array4<f32>) -> NodeResult<Self> {
        let channels = data.shape()[3];
        if !SUPPORTED_CHANNELS.contains(&channels) {
            return Err(NodeError::validation(format!(
                "unsupported image channel count {channels} (expected 1, 3 or 4)"
            )));
        }
        Ok(Self { data })
    }

    /// A batch filled with zeros (black, and transparent when `channels == 4`).
    pub fn zeros(batch: usize, height: usize, width: usize, channels: usize) -> NodeResult<Self> {
        Self::new(Array4::zeros((batch, height, width, channels)))
    }

    /// A batch of `batch` copies of one solid color; `color.len()` selects the channel count.
    pub fn solid(batch: usize, height: usize, width: usize, color: &[f32]) -> NodeResult<Self> {
        let channels = color.len();
        let data = Array4::from_shape_fn((batch, height, width, channels), |(_, _, _, c)| {
            color[c]
        });
        Self::new(data)
    }

    /// Promote a single `[height, width, channels]` image to a batch of one.
    pub fn from_single(image: Array3<f32>) -> NodeResult<Self> {
        Self::new(image.insert_axis(Axis(0)))
    }

    /// Normalize a `u8` tensor (`0..=255`) to a float batch.
    pub fn from_u8(data: &Array4<u8>) -> NodeResult<Self> {
        Self::new(data.mapv(|v| f32::from(v) / 255.0))
    }

    /// Stack single images (all the same shape) back into a batch.
    pub fn stack(images: &[Array3<f32>]) -> NodeResult<Self> {
        let views: Vec<ArrayView3<'_, f32>> = images.iter().map(|img| img.view()).collect();
        let data = ndarray::stack(Axis(0), &views)?;
        Self::new(data)
    }

    pub fn batch(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn height(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn width(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn channels(&self) -> usize {
        self.data.shape()[3]
    }

    /// Borrow image `index` of the batch as `[height, width, channels]`.
    pub fn image(&self, index: usize) -> NodeResult<ArrayView3<'_, f32>> {
        if index >= self.batch() {
            return Err(NodeError::shape(format!(
                "image index {index} out of range for batch of {}",
                self.batch()
            )));
        }
        Ok(self.data.index_axis(Axis(0), index))
    }

    pub fn data(&self) -> &Array4<f32> {
        &self.data
    }

    pub fn into_data(self) -> Array4<f32> {
        self.data
    }
}

/// Placeholder latent tensor, shaped `[batch, 4, height / 8, width / 8]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Latent {
    pub samples: Array4<f32>,
}

impl Latent {
    /// All-zero latent for a pixel-space `width` x `height`.
    pub fn zeros(batch: u32, width: u32, height: u32) -> Self {
        let shape = (
            batch as usize,
            LATENT_CHANNELS,
            (height / LATENT_DOWNSCALE) as usize,
            (width / LATENT_DOWNSCALE) as usize,
        );
        Self {
            samples: Array4::zeros(shape),
        }
    }

    pub fn shape(&self) -> [usize; 4] {
        let s = self.samples.shape();
        [s[0], s[1], s[2], s[3]]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/tensor.rs"]
mod tests;
