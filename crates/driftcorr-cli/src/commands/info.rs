use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use driftcorr_core::io::image_io::list_image_sequence;
use driftcorr_core::io::ser::{SerHeader, SerReader};

use crate::input::load_stack;

#[derive(Args)]
pub struct InfoArgs {
    /// Input SER file or image directory
    pub input: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    if args.input.is_dir() {
        return sequence_info(args);
    }

    let reader = SerReader::open(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;

    println!("File:        {}", args.input.display());
    for line in ser_header_lines(&reader.header, reader.frame_count()) {
        println!("{}", line);
    }

    if let Ok(first) = reader.read_frame(0) {
        if let Some(ts) = first.metadata.timestamp_us {
            println!("Timestamps:  yes (first {})", ts);
        }
    }

    Ok(())
}

fn ser_header_lines(header: &SerHeader, frame_count: usize) -> Vec<String> {
    let mut lines = vec![
        format!("Frames:      {}", frame_count),
        format!("Dimensions:  {}x{}", header.width, header.height),
        format!("Bit depth:   {}", header.pixel_depth),
    ];
    if !header.instrument.is_empty() {
        lines.push(format!("Instrument:  {}", header.instrument));
    }
    let total_mb = (header.frame_byte_size() * frame_count) as f64 / (1024.0 * 1024.0);
    lines.push(format!("Data size:   {:.1} MB", total_mb));
    lines
}

fn sequence_info(args: &InfoArgs) -> Result<()> {
    let files = list_image_sequence(&args.input)?;
    println!("Directory:   {}", args.input.display());
    println!("Frames:      {}", files.len());
    if let (Some(first), Some(last)) = (files.first(), files.last()) {
        println!("First:       {}", first.display());
        println!("Last:        {}", last.display());
    }

    let stack = load_stack(&args.input)?;
    let (h, w) = stack.dim();
    println!("Dimensions:  {}x{}", w, h);
    println!("Bit depth:   {}", stack.info.bit_depth);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lines_show_instrument_only() {
        let mut header = SerHeader::mono(64, 32, 16, 4);
        header.observer = "someone".into();
        header.telescope = "scope".into();
        header.instrument = "DriftCorrected".into();

        let lines = ser_header_lines(&header, 4);
        assert!(lines.contains(&"Dimensions:  64x32".to_string()));
        assert!(lines.contains(&"Instrument:  DriftCorrected".to_string()));
        assert!(!lines.iter().any(|l| l.contains("someone") || l.contains("scope")));
    }
}
