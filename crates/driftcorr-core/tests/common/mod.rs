use ndarray::Array2;

use driftcorr_core::frame::{Frame, FrameStack};
use driftcorr_core::io::ser::SER_HEADER_SIZE;

/// Deterministic blob positions and radii for a synthetic specimen.
pub fn blob_field(height: usize, width: usize, count: usize, seed: u64) -> Vec<(f64, f64, f64)> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64
    };
    (0..count)
        .map(|_| {
            let y = next() * (height as f64 + 20.0) - 10.0;
            let x = next() * (width as f64 + 20.0) - 10.0;
            let r = 1.5 + next() * 2.5;
            (y, x, r)
        })
        .collect()
}

/// Render the blob field with its content moved by `(dy, dx)` pixels.
pub fn render(
    height: usize,
    width: usize,
    blobs: &[(f64, f64, f64)],
    dy: f64,
    dx: f64,
) -> Array2<f32> {
    Array2::from_shape_fn((height, width), |(r, c)| {
        let mut v = 0.05;
        for &(y, x, rad) in blobs {
            let ry = r as f64 - dy - y;
            let rx = c as f64 - dx - x;
            v += 0.8 * (-(ry * ry + rx * rx) / (2.0 * rad * rad)).exp();
        }
        v.min(1.0) as f32
    })
}

/// Stack of one specimen drifting along `drift` (content offset per frame).
pub fn drifting_stack(size: usize, drift: &[(f64, f64)], seed: u64) -> FrameStack {
    let blobs = blob_field(size, size, size * size / 250, seed);
    let frames = drift
        .iter()
        .enumerate()
        .map(|(i, &(dy, dx))| {
            let mut f = Frame::new(render(size, size, &blobs, dy, dx), 16);
            f.metadata.frame_index = i;
            f
        })
        .collect();
    FrameStack::new(frames).expect("equal frame sizes")
}

/// Add uniform noise in `[-amplitude, amplitude]` to every pixel.
pub fn add_noise(stack: FrameStack, amplitude: f32, seed: u64) -> FrameStack {
    let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 40) as f32 / (1u64 << 24) as f32
    };
    let frames = stack
        .into_frames()
        .into_iter()
        .map(|mut f| {
            f.data.mapv_inplace(|v| v + amplitude * (2.0 * next() - 1.0));
            f
        })
        .collect();
    FrameStack::new(frames).expect("equal frame sizes")
}

/// Shifts that undo `drift`, with the mean removed on each axis.
pub fn expected_shifts(drift: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let n = drift.len() as f64;
    let mean_y = drift.iter().map(|d| d.0).sum::<f64>() / n;
    let mean_x = drift.iter().map(|d| d.1).sum::<f64>() / n;
    drift
        .iter()
        .map(|&(dy, dx)| (-(dy - mean_y), -(dx - mean_x)))
        .collect()
}

/// Build a mono SER header with the given bit depth.
pub fn build_ser_header(width: u32, height: u32, bit_depth: u32, num_frames: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SER_HEADER_SIZE);

    // Magic (14 bytes)
    buf.extend_from_slice(b"LUCAM-RECORDER");
    // LuID
    buf.extend_from_slice(&0i32.to_le_bytes());
    // ColorID = MONO
    buf.extend_from_slice(&0i32.to_le_bytes());
    // LittleEndian = 0 (little-endian per Siril convention)
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&(width as i32).to_le_bytes());
    buf.extend_from_slice(&(height as i32).to_le_bytes());
    buf.extend_from_slice(&(bit_depth as i32).to_le_bytes());
    buf.extend_from_slice(&(num_frames as i32).to_le_bytes());
    // Observer, Instrument, Telescope (40 bytes each)
    buf.extend_from_slice(&[0u8; 120]);
    // DateTime, DateTimeUTC
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());

    assert_eq!(buf.len(), SER_HEADER_SIZE);
    buf
}

/// Write a SER buffer to a temporary file and return the handle.
pub fn write_test_ser(data: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut f = tempfile::NamedTempFile::new().expect("create temp file");
    f.write_all(data).expect("write SER data");
    f.flush().expect("flush");
    f
}
