//! Retained-draw records and the sinks they are written to.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::state::ChainState;
use super::types::MediationError;

/// One retained draw of the per-mediator parameters and `beta_a`.
#[derive(Debug, Clone, PartialEq)]
pub struct MediationDraw {
    /// Zero-based iteration that produced this draw.
    pub iteration: usize,
    pub beta_m: Vec<f64>,
    pub pi_m: Vec<f64>,
    pub alpha_a: Vec<f64>,
    pub pi_a: Vec<f64>,
    pub beta_a: f64,
    /// Indicator `r1` at the time of the draw.
    pub mediator_included: Vec<bool>,
    /// Indicator `r3` at the time of the draw.
    pub exposure_included: Vec<bool>,
}

impl MediationDraw {
    #[must_use]
    pub fn from_state(iteration: usize, state: &ChainState) -> Self {
        Self {
            iteration,
            beta_m: state.beta_m.clone(),
            pi_m: state.pi_m.clone(),
            alpha_a: state.alpha_a.clone(),
            pi_a: state.pi_a.clone(),
            beta_a: state.beta_a,
            mediator_included: state.r1.clone(),
            exposure_included: state.r3.clone(),
        }
    }

    /// `alpha_a[j] * beta_m[j]` for every mediator.
    #[must_use]
    pub fn indirect_effects(&self) -> Vec<f64> {
        self.alpha_a
            .iter()
            .zip(&self.beta_m)
            .map(|(alpha, beta)| alpha * beta)
            .collect()
    }
}

/// `beta_m[0] pi_m[0] alpha_a[0] pi_a[0] ... beta_a`, space separated.
impl fmt::Display for MediationDraw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for j in 0..self.beta_m.len() {
            write!(
                f,
                "{} {} {} {} ",
                self.beta_m[j], self.pi_m[j], self.alpha_a[j], self.pi_a[j]
            )?;
        }
        write!(f, "{}", self.beta_a)
    }
}

/// Destination for retained draws.
pub trait DrawSink {
    /// # Errors
    ///
    /// Returns `MediationError::Output` if the draw cannot be written.
    fn record(&mut self, draw: &MediationDraw) -> Result<(), MediationError>;

    /// # Errors
    ///
    /// Returns `MediationError::Output` if buffered draws cannot be flushed.
    fn flush(&mut self) -> Result<(), MediationError> {
        Ok(())
    }
}

impl DrawSink for Vec<MediationDraw> {
    fn record(&mut self, draw: &MediationDraw) -> Result<(), MediationError> {
        self.push(draw.clone());
        Ok(())
    }
}

impl<S: DrawSink + ?Sized> DrawSink for &mut S {
    fn record(&mut self, draw: &MediationDraw) -> Result<(), MediationError> {
        (**self).record(draw)
    }

    fn flush(&mut self) -> Result<(), MediationError> {
        (**self).flush()
    }
}

/// Writes each draw as one text line.
#[derive(Debug)]
pub struct LineSink<W: Write> {
    writer: W,
    lines: usize,
}

impl<W: Write> LineSink<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    #[must_use]
    pub const fn lines_written(&self) -> usize {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl LineSink<BufWriter<File>> {
    /// Open `directory/results_<q>.txt` in append mode, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns `MediationError::Output` if the file cannot be opened.
    pub fn append_results(directory: impl AsRef<Path>, mediators: usize) -> Result<Self, MediationError> {
        let path = directory.as_ref().join(results_file_name(mediators));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!(path = %path.display(), "appending draws to results file");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> DrawSink for LineSink<W> {
    fn record(&mut self, draw: &MediationDraw) -> Result<(), MediationError> {
        writeln!(self.writer, "{draw}")?;
        self.lines += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), MediationError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// File name used for runs with `mediators` candidate mediators.
#[must_use]
pub fn results_file_name(mediators: usize) -> PathBuf {
    PathBuf::from(format!("results_{mediators}.txt"))
}
