use std::path::Path;

use anyhow::{bail, Context, Result};
use driftcorr_core::frame::FrameStack;
use driftcorr_core::io::image_io::load_image_sequence;
use driftcorr_core::io::ser::SerReader;

/// Load a SER file or a directory of TIFF/PNG frames.
pub fn load_stack(path: &Path) -> Result<FrameStack> {
    if path.is_dir() {
        return load_image_sequence(path)
            .with_context(|| format!("Failed to load image sequence {}", path.display()));
    }

    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("ser") => {
            let reader = SerReader::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            reader
                .read_stack(path)
                .with_context(|| format!("Failed to read frames of {}", path.display()))
        }
        _ => bail!(
            "Unsupported input {} (expected a .ser file or an image directory)",
            path.display()
        ),
    }
}
