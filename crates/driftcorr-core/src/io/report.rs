use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::pipeline::DriftReport;
use crate::trajectory::DenseShifts;

/// Write a run report as pretty-printed JSON.
pub fn write_report_json(report: &DriftReport, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn read_report_json(path: &Path) -> Result<DriftReport> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Write one `frame,dy,dx` line per frame.
pub fn write_shift_table(shifts: &DenseShifts, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "frame,dy,dx")?;
    for (i, s) in shifts.shifts.iter().enumerate() {
        writeln!(writer, "{},{:.6},{:.6}", i, s.dy, s.dx)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Shift;

    #[test]
    fn test_shift_table_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shifts.csv");
        let shifts = DenseShifts {
            shifts: vec![Shift::new(0.0, 0.0), Shift::new(1.5, -2.25)],
        };
        write_shift_table(&shifts, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "frame,dy,dx");
        assert_eq!(lines[2], "1,1.500000,-2.250000");
        assert_eq!(lines.len(), 3);
    }
}
