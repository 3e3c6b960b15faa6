use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{DriftError, Result};
use crate::frame::Frame;
use crate::io::ser::{SerHeader, SER_HEADER_SIZE, SER_MAGIC};
use crate::shift::CorrectedStack;

/// Instrument tag written to SER files produced from a corrected stack.
pub const DRIFT_CORRECTED_TAG: &str = "DriftCorrected";

/// Writes a mono SER file at the raw byte level.
pub struct SerWriter {
    writer: BufWriter<File>,
    header: SerHeader,
    frames_written: u32,
}

impl SerWriter {
    /// Create a new SER file and write the header.
    pub fn create(path: &Path, header: &SerHeader) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        write_header(&mut writer, header)?;
        Ok(Self {
            writer,
            header: header.clone(),
            frames_written: 0,
        })
    }

    /// Quantize a frame to the header's bit depth and append it.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let (w, h) = (self.header.width as usize, self.header.height as usize);
        if frame.data.dim() != (h, w) {
            return Err(DriftError::DimensionMismatch(format!(
                "frame is {}x{}, SER header says {}x{}",
                frame.width(),
                frame.height(),
                w,
                h
            )));
        }
        if self.frames_written >= self.header.frame_count {
            return Err(DriftError::InvalidSer(format!(
                "header declares {} frames",
                self.header.frame_count
            )));
        }

        let max_val = ((1u32 << self.header.pixel_depth) - 1) as f32;
        let mut bytes = Vec::with_capacity(self.header.frame_byte_size());
        for &v in frame.data.iter() {
            let q = (v.clamp(0.0, 1.0) * max_val).round() as u16;
            if self.header.bytes_per_pixel() == 1 {
                bytes.push(q as u8);
            } else if self.header.little_endian {
                bytes.extend_from_slice(&q.to_le_bytes());
            } else {
                bytes.extend_from_slice(&q.to_be_bytes());
            }
        }
        self.writer.write_all(&bytes)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Write the optional timestamp trailer (one u64 per frame, little-endian).
    pub fn write_timestamps(&mut self, timestamps: &[u64]) -> Result<()> {
        for &ts in timestamps {
            self.writer.write_all(&ts.to_le_bytes())?;
        }
        Ok(())
    }

    /// Flush and finalize the file.
    pub fn finalize(mut self) -> Result<()> {
        if self.frames_written != self.header.frame_count {
            return Err(DriftError::InvalidSer(format!(
                "wrote {} of {} frames",
                self.frames_written, self.header.frame_count
            )));
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Write a corrected stack as SER, keeping the input bit depth and
/// timestamps and tagging the instrument field as drift corrected.
pub fn write_corrected_ser(path: &Path, stack: &CorrectedStack) -> Result<()> {
    let (h, w) = stack.dim();
    let depth = match stack.info.bit_depth {
        0 => 16,
        d => d.min(16) as u32,
    };
    let mut header = SerHeader::mono(w as u32, h as u32, depth, stack.frames.len() as u32);
    if stack.drift_corrected {
        header.instrument = DRIFT_CORRECTED_TAG.to_string();
    }

    let mut writer = SerWriter::create(path, &header)?;
    for frame in &stack.frames {
        writer.write_frame(frame)?;
    }

    let timestamps: Option<Vec<u64>> = stack
        .frames
        .iter()
        .map(|f| f.metadata.timestamp_us)
        .collect();
    if let Some(ts) = timestamps {
        writer.write_timestamps(&ts)?;
    }
    writer.finalize()
}

fn write_header(w: &mut impl Write, header: &SerHeader) -> Result<()> {
    w.write_all(SER_MAGIC)?;
    // LuID
    w.write_all(&0i32.to_le_bytes())?;
    w.write_all(&header.color_id.to_le_bytes())?;
    // 0 = little-endian (Siril convention)
    let le_flag: i32 = if header.little_endian { 0 } else { 1 };
    w.write_all(&le_flag.to_le_bytes())?;
    w.write_all(&(header.width as i32).to_le_bytes())?;
    w.write_all(&(header.height as i32).to_le_bytes())?;
    w.write_all(&(header.pixel_depth as i32).to_le_bytes())?;
    w.write_all(&(header.frame_count as i32).to_le_bytes())?;
    write_fixed_string(w, &header.observer, 40)?;
    write_fixed_string(w, &header.instrument, 40)?;
    write_fixed_string(w, &header.telescope, 40)?;
    w.write_all(&header.date_time.to_le_bytes())?;
    w.write_all(&header.date_time_utc.to_le_bytes())?;

    debug_assert_eq!(
        14 + 4 + 4 + 4 + 4 + 4 + 4 + 4 + 40 + 40 + 40 + 8 + 8,
        SER_HEADER_SIZE
    );
    Ok(())
}

fn write_fixed_string(w: &mut impl Write, s: &str, len: usize) -> Result<()> {
    let bytes = s.as_bytes();
    let n = bytes.len().min(len);
    w.write_all(&bytes[..n])?;
    w.write_all(&vec![0u8; len - n])?;
    Ok(())
}
