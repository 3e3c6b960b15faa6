use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriftError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid SER file: {0}")]
    InvalidSer(String),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Frame index {index} out of range (total: {total})")]
    FrameIndexOutOfRange { index: usize, total: usize },

    #[error("Empty frame sequence")]
    EmptySequence,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error(
        "Insufficient overlap: {surviving} frame(s) survive masking in {components} \
         disconnected group(s); lower min_normed_weight or sample more densely"
    )]
    InsufficientOverlap { surviving: usize, components: usize },

    #[error("Non-finite {quantity} for frame pair ({i}, {j})")]
    NonFinite {
        quantity: &'static str,
        i: usize,
        j: usize,
    },

    #[error("Least-squares solve failed: {0}")]
    Solver(String),

    #[error("Report serialization error: {0}")]
    Report(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DriftError>;
