use std::fs::File;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use ndarray::Array2;
use rayon::prelude::*;

use crate::error::{DriftError, Result};
use crate::frame::{Frame, FrameMetadata, FrameStack, StackInfo};

pub const SER_HEADER_SIZE: usize = 178;
pub(crate) const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";
/// ColorID of single-plane monochrome data, the only layout detector stacks use.
pub(crate) const SER_COLOR_MONO: i32 = 0;

/// SER file header (178 bytes).
#[derive(Clone, Debug)]
pub struct SerHeader {
    pub color_id: i32,
    pub little_endian: bool,
    pub width: u32,
    pub height: u32,
    pub pixel_depth: u32,
    pub frame_count: u32,
    pub observer: String,
    pub instrument: String,
    pub telescope: String,
    pub date_time: u64,
    pub date_time_utc: u64,
}

impl SerHeader {
    /// Header for a little-endian mono stack.
    pub fn mono(width: u32, height: u32, pixel_depth: u32, frame_count: u32) -> Self {
        Self {
            color_id: SER_COLOR_MONO,
            little_endian: true,
            width,
            height,
            pixel_depth,
            frame_count,
            observer: String::new(),
            instrument: String::new(),
            telescope: String::new(),
            date_time: 0,
            date_time_utc: 0,
        }
    }

    /// Bytes per sample (1 for 8-bit, 2 for 9-16 bit).
    pub fn bytes_per_pixel(&self) -> usize {
        if self.pixel_depth <= 8 {
            1
        } else {
            2
        }
    }

    /// Total bytes per frame.
    pub fn frame_byte_size(&self) -> usize {
        self.width as usize * self.height as usize * self.bytes_per_pixel()
    }
}

/// Memory-mapped reader for mono SER image stacks.
pub struct SerReader {
    mmap: Mmap,
    pub header: SerHeader,
}

impl SerReader {
    /// Open a SER file and parse its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // The map is read-only and the file is not modified while mapped.
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SER_HEADER_SIZE {
            return Err(DriftError::InvalidSer(
                "File too small for SER header".into(),
            ));
        }
        if &mmap[0..14] != SER_MAGIC {
            return Err(DriftError::InvalidSer(
                "Missing LUCAM-RECORDER magic".into(),
            ));
        }

        let header = parse_header(&mmap[..SER_HEADER_SIZE])?;
        if header.color_id != SER_COLOR_MONO {
            return Err(DriftError::InvalidSer(format!(
                "Unsupported color id {} (only mono stacks are supported)",
                header.color_id
            )));
        }

        let expected = header
            .frame_byte_size()
            .checked_mul(header.frame_count as usize)
            .and_then(|n| n.checked_add(SER_HEADER_SIZE))
            .ok_or_else(|| DriftError::InvalidSer("Frame data size overflows".into()))?;
        if mmap.len() < expected {
            return Err(DriftError::InvalidSer(format!(
                "File truncated: expected at least {} bytes, got {}",
                expected,
                mmap.len()
            )));
        }

        Ok(Self { mmap, header })
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count as usize
    }

    /// Raw bytes of a single frame (zero-copy from mmap).
    pub fn frame_raw(&self, index: usize) -> Result<&[u8]> {
        let count = self.frame_count();
        if index >= count {
            return Err(DriftError::FrameIndexOutOfRange {
                index,
                total: count,
            });
        }
        let size = self.header.frame_byte_size();
        let offset = SER_HEADER_SIZE + index * size;
        Ok(&self.mmap[offset..offset + size])
    }

    /// Read a single frame, converting to f32 in [0.0, 1.0].
    pub fn read_frame(&self, index: usize) -> Result<Frame> {
        let raw = self.frame_raw(index)?;
        let data = decode_plane(
            raw,
            self.header.height as usize,
            self.header.width as usize,
            self.header.pixel_depth,
            self.header.little_endian,
        );

        let mut frame = Frame::new(data, self.header.pixel_depth.min(16) as u8);
        frame.metadata = FrameMetadata {
            frame_index: index,
            timestamp_us: self.read_timestamp(index),
            label: None,
        };
        Ok(frame)
    }

    /// Per-frame timestamp from the optional trailer.
    fn read_timestamp(&self, index: usize) -> Option<u64> {
        let trailer = SER_HEADER_SIZE + self.header.frame_byte_size() * self.frame_count();
        let at = trailer + index * 8;
        let bytes = self.mmap.get(at..at + 8)?;
        Some(u64::from_le_bytes(bytes.try_into().ok()?))
    }

    /// Decode every frame into a stack, in parallel.
    pub fn read_stack(&self, path: &Path) -> Result<FrameStack> {
        let frames: Vec<Frame> = (0..self.frame_count())
            .into_par_iter()
            .map(|i| self.read_frame(i))
            .collect::<Result<_>>()?;

        let info = StackInfo {
            pixel_spacing: None,
            bit_depth: self.header.pixel_depth.min(16) as u8,
            source: Some(path.display().to_string()),
        };
        Ok(FrameStack::new(frames)?.with_info(info))
    }
}

fn parse_header(buf: &[u8]) -> Result<SerHeader> {
    let mut cursor = std::io::Cursor::new(&buf[14..]);

    let _lu_id = cursor.read_i32::<LittleEndian>()?;
    let color_id = cursor.read_i32::<LittleEndian>()?;
    let le_flag = cursor.read_i32::<LittleEndian>()?;
    let width = cursor.read_i32::<LittleEndian>()? as u32;
    let height = cursor.read_i32::<LittleEndian>()? as u32;
    let pixel_depth = cursor.read_i32::<LittleEndian>()? as u32;
    let frame_count = cursor.read_i32::<LittleEndian>()? as u32;

    let observer = read_fixed_string(&buf[42..82]);
    let instrument = read_fixed_string(&buf[82..122]);
    let telescope = read_fixed_string(&buf[122..162]);

    let mut cursor = std::io::Cursor::new(&buf[162..]);
    let date_time = cursor.read_u64::<LittleEndian>()?;
    let date_time_utc = cursor.read_u64::<LittleEndian>()?;

    if width == 0 || height == 0 {
        return Err(DriftError::InvalidDimensions { width, height });
    }
    if pixel_depth == 0 || pixel_depth > 16 {
        return Err(DriftError::InvalidSer(format!(
            "Unsupported pixel depth {}",
            pixel_depth
        )));
    }

    // Siril convention: 0 means little-endian pixel data.
    let little_endian = le_flag != 1;

    Ok(SerHeader {
        color_id,
        little_endian,
        width,
        height,
        pixel_depth,
        frame_count,
        observer,
        instrument,
        telescope,
        date_time,
        date_time_utc,
    })
}

fn read_fixed_string(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

fn decode_plane(
    raw: &[u8],
    height: usize,
    width: usize,
    bit_depth: u32,
    little_endian: bool,
) -> Array2<f32> {
    let max_val = ((1u32 << bit_depth) - 1) as f32;
    let bytes_per_sample = if bit_depth <= 8 { 1 } else { 2 };

    Array2::from_shape_fn((height, width), |(row, col)| {
        let idx = (row * width + col) * bytes_per_sample;
        let val = if bytes_per_sample == 1 {
            raw[idx] as f32
        } else {
            let pair = [raw[idx], raw[idx + 1]];
            if little_endian {
                u16::from_le_bytes(pair) as f32
            } else {
                u16::from_be_bytes(pair) as f32
            }
        };
        val / max_val
    })
}
