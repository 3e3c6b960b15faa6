use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{DriftError, Result};

/// A single grayscale microscopy frame.
/// Pixel values are f32 in [0.0, 1.0].
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f32>,
    /// Original bit depth before conversion (8 or 16)
    pub original_bit_depth: u8,
    /// Optional per-frame metadata
    pub metadata: FrameMetadata,
}

impl Frame {
    pub fn new(data: Array2<f32>, bit_depth: u8) -> Self {
        Self {
            data,
            original_bit_depth: bit_depth,
            metadata: FrameMetadata::default(),
        }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }
}

#[derive(Clone, Debug, Default)]
pub struct FrameMetadata {
    pub frame_index: usize,
    pub timestamp_us: Option<u64>,
    /// Acquisition label of the frame (electron energy, time, ...).
    pub label: Option<f64>,
}

/// Translation of a frame in pixels. Positive values move image content
/// towards higher row/column indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub dy: f64,
    pub dx: f64,
}

impl Shift {
    pub fn new(dy: f64, dx: f64) -> Self {
        Self { dy, dx }
    }

    pub fn is_zero(&self) -> bool {
        self.dy == 0.0 && self.dx == 0.0
    }
}

/// Metadata carried alongside a stack; the registration core only needs the
/// pixel data, the rest is passed through to the writers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StackInfo {
    /// Physical pixel spacing (row, col), if known.
    pub pixel_spacing: Option<(f64, f64)>,
    pub bit_depth: u8,
    pub source: Option<String>,
}

/// A time-ordered stack of equally sized frames.
#[derive(Clone, Debug)]
pub struct FrameStack {
    frames: Vec<Frame>,
    pub info: StackInfo,
}

impl FrameStack {
    /// Build a stack, checking that it is non-empty and that every frame has
    /// the same shape.
    pub fn new(frames: Vec<Frame>) -> Result<Self> {
        let first = frames.first().ok_or(DriftError::EmptySequence)?;
        let dim = first.data.dim();
        let bit_depth = first.original_bit_depth;

        if let Some((i, f)) = frames.iter().enumerate().find(|(_, f)| f.data.dim() != dim) {
            return Err(DriftError::DimensionMismatch(format!(
                "frame {} is {}x{}, expected {}x{}",
                i,
                f.width(),
                f.height(),
                dim.1,
                dim.0
            )));
        }

        Ok(Self {
            frames,
            info: StackInfo {
                bit_depth,
                ..StackInfo::default()
            },
        })
    }

    pub fn with_info(mut self, info: StackInfo) -> Self {
        self.info = info;
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame shape as (height, width).
    pub fn dim(&self) -> (usize, usize) {
        self.frames[0].data.dim()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Result<&Frame> {
        self.frames.get(index).ok_or(DriftError::FrameIndexOutOfRange {
            index,
            total: self.frames.len(),
        })
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}
