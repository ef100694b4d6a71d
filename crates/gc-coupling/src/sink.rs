//! Append-only per-point log.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

pub const SINK_HEADER: &str = "date\tstep\titeration\tpressure_bar\tflow_m3_s\tthermal_power_mw";

/// One sampled exchange at a coupling point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleLine {
    pub timestamp: NaiveDateTime,
    pub step: usize,
    pub iteration: u32,
    pub pressure_bar: f64,
    pub flow_m3_s: f64,
    pub thermal_power_mw: f64,
}

impl SampleLine {
    fn render(&self) -> String {
        format!(
            "{}\t{}\t{}\t{:.6}\t{:.6}\t{:.6}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.step,
            self.iteration,
            self.pressure_bar,
            self.flow_m3_s,
            self.thermal_power_mw
        )
    }
}

pub struct PointSink {
    path: Option<PathBuf>,
    out: BufWriter<Box<dyn Write>>,
    lines: usize,
}

impl PointSink {
    /// Create (truncate) the file at `path` and write the header.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        let mut sink = Self::from_writer(Box::new(file))?;
        sink.path = Some(path.to_path_buf());
        Ok(sink)
    }

    pub fn from_writer(writer: Box<dyn Write>) -> io::Result<Self> {
        let mut out = BufWriter::new(writer);
        writeln!(out, "{SINK_HEADER}")?;
        Ok(Self {
            path: None,
            out,
            lines: 0,
        })
    }

    /// Sink that discards everything.
    pub fn discard() -> Self {
        Self {
            path: None,
            out: BufWriter::new(Box::new(io::sink())),
            lines: 0,
        }
    }

    pub fn write_sample(&mut self, line: &SampleLine) -> io::Result<()> {
        writeln!(self.out, "{}", line.render())?;
        self.lines += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Sample lines written so far (header excluded).
    pub fn lines(&self) -> usize {
        self.lines
    }
}
