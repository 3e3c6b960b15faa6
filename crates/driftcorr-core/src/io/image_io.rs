use std::path::{Path, PathBuf};

use image::{GrayImage, ImageBuffer, ImageFormat, Luma};
use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{DriftError, Result};
use crate::frame::{Frame, FrameStack, StackInfo};

const SEQUENCE_EXTENSIONS: &[&str] = &["tif", "tiff", "png"];

/// Save a frame as 16-bit grayscale TIFF.
pub fn save_tiff(frame: &Frame, path: &Path) -> Result<()> {
    let pixels: Vec<u16> = frame
        .data
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 65535.0).round() as u16)
        .collect();

    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(
        frame.width() as u32,
        frame.height() as u32,
        pixels,
    )
    .ok_or(DriftError::InvalidDimensions {
        width: frame.width() as u32,
        height: frame.height() as u32,
    })?;
    img.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save a frame as 8-bit grayscale PNG.
pub fn save_png(frame: &Frame, path: &Path) -> Result<()> {
    let mut img = GrayImage::new(frame.width() as u32, frame.height() as u32);
    for ((row, col), &v) in frame.data.indexed_iter() {
        let val = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        img.put_pixel(col as u32, row as u32, Luma([val]));
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save frame, choosing format from file extension.
pub fn save_image(frame: &Frame, path: &Path) -> Result<()> {
    match extension_of(path).as_deref() {
        Some("png") => save_png(frame, path),
        _ => save_tiff(frame, path),
    }
}

/// Load a grayscale image file into a Frame.
pub fn load_image(path: &Path) -> Result<Frame> {
    let img = image::open(path)?;
    let bit_depth = match img.color() {
        image::ColorType::L8 | image::ColorType::La8 | image::ColorType::Rgb8 => 8,
        _ => 16,
    };
    let gray = img.to_luma16();
    let (w, h) = gray.dimensions();
    let data = Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
        gray.get_pixel(col as u32, row as u32).0[0] as f32 / 65535.0
    });

    Ok(Frame::new(data, bit_depth))
}

/// Image files of a directory in name order.
pub fn list_image_sequence(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && extension_of(p).is_some_and(|ext| SEQUENCE_EXTENSIONS.contains(&ext.as_str()))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Load every image of a directory, sorted by file name, as one stack.
pub fn load_image_sequence(dir: &Path) -> Result<FrameStack> {
    let paths = list_image_sequence(dir)?;
    debug!(dir = %dir.display(), files = paths.len(), "Loading image sequence");

    let mut frames: Vec<Frame> = paths
        .par_iter()
        .map(|p| load_image(p))
        .collect::<Result<_>>()?;
    for (i, frame) in frames.iter_mut().enumerate() {
        frame.metadata.frame_index = i;
    }

    let stack = FrameStack::new(frames)?;
    let info = StackInfo {
        bit_depth: stack.info.bit_depth,
        source: Some(dir.display().to_string()),
        ..StackInfo::default()
    };
    Ok(stack.with_info(info))
}

/// Write frames as `<prefix>_<index>.<ext>` into `dir`, creating it if needed.
pub fn save_image_sequence(
    frames: &[Frame],
    dir: &Path,
    prefix: &str,
    ext: &str,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let digits = frames.len().max(1).to_string().len().max(4);
    frames
        .par_iter()
        .enumerate()
        .map(|(i, frame)| {
            let path = dir.join(format!("{prefix}_{i:0digits$}.{ext}"));
            save_image(frame, &path)?;
            Ok(path)
        })
        .collect()
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter_is_case_insensitive() {
        assert_eq!(extension_of(Path::new("a/b/frame.TIF")).as_deref(), Some("tif"));
        assert_eq!(extension_of(Path::new("noext")), None);
    }

    #[test]
    fn test_png_round_trip_quantizes_to_8_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.png");
        let data = Array2::from_shape_fn((3, 4), |(r, c)| (r * 4 + c) as f32 / 11.0);
        save_image(&Frame::new(data.clone(), 8), &path).unwrap();

        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.data.dim(), (3, 4));
        assert_eq!(loaded.original_bit_depth, 8);
        for (a, b) in loaded.data.iter().zip(data.iter()) {
            assert!((a - b).abs() < 1.0 / 255.0);
        }
    }
}
