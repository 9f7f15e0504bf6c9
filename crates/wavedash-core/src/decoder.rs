//! Raw decoder capability and the adapter that shields the normalizer from it
//!
//! A decoder turns a simulator's native waveform file into named traces.
//! The adapter turns every decoder failure into either a [`ParseError`]
//! (axis problems) or a [`ParseWarning`] (single signal problems), and
//! flattens complex vectors to magnitudes.

use crate::types::{DecodeError, ParseError, ParseWarning, PlotInfo, StepId, VectorData};
use tracing::{debug, trace, warn};

/// Decoded waveform file
pub trait RawDecoder {
    /// All trace names in file order. The first one is the independent variable.
    fn trace_names(&self) -> Vec<String>;

    /// Step ids of a stepped simulation. Empty when the file has no steps.
    fn steps(&self) -> Vec<StepId>;

    /// Independent variable values for one step
    fn axis(&self, step: StepId) -> Result<Vec<f64>, DecodeError>;

    /// Values of one trace for one step
    fn trace_values(&self, name: &str, step: StepId) -> Result<VectorData, DecodeError>;

    /// Title, date and plot name
    fn plot_info(&self) -> PlotInfo;
}

/// Opens a [`RawDecoder`] over an in-memory file
pub trait DecoderFactory {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn RawDecoder>, DecodeError>;
}

/// Wraps a decoder so that no single trace can abort a parse
pub struct DecoderAdapter<'a> {
    decoder: &'a dyn RawDecoder,
}

impl<'a> DecoderAdapter<'a> {
    pub fn new(decoder: &'a dyn RawDecoder) -> Self {
        Self { decoder }
    }

    pub fn trace_names(&self) -> Vec<String> {
        self.decoder.trace_names()
    }

    pub fn plot_info(&self) -> PlotInfo {
        self.decoder.plot_info()
    }

    /// First reported step, or step 0 with a warning when none is reported.
    /// Later steps are ignored.
    pub fn select_step(&self, warnings: &mut Vec<ParseWarning>) -> StepId {
        let steps = self.decoder.steps();
        match steps.first() {
            Some(&step) => {
                if steps.len() > 1 {
                    debug!(
                        step = %step,
                        ignored = steps.len() - 1,
                        "multi-step file, processing first step only"
                    );
                }
                step
            }
            None => {
                record(warnings, ParseWarning::StepDefaulted);
                StepId(0)
            }
        }
    }

    /// Axis values for `step`. An unavailable or empty axis is fatal.
    pub fn axis(&self, step: StepId) -> Result<Vec<f64>, ParseError> {
        match self.decoder.axis(step) {
            Ok(values) if !values.is_empty() => Ok(values),
            Ok(_) => {
                warn!(step = %step, "axis vector is empty");
                Err(ParseError::MissingAxis)
            }
            Err(e) => {
                warn!(step = %step, error = %e, "axis extraction failed");
                Err(ParseError::MissingAxis)
            }
        }
    }

    /// Real-valued samples of one signal, or the warning explaining why
    /// it could not be extracted.
    pub fn signal(&self, name: &str, step: StepId) -> Result<Vec<f64>, ParseWarning> {
        match self.decoder.trace_values(name, step) {
            Ok(data) => {
                trace!(
                    signal = name,
                    points = data.len(),
                    complex = data.is_complex(),
                    "extracted trace"
                );
                Ok(data.into_magnitudes())
            }
            Err(e) => Err(ParseWarning::ExtractionFailed {
                signal: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Log a warning and keep it for the caller
pub(crate) fn record(warnings: &mut Vec<ParseWarning>, warning: ParseWarning) {
    warn!(%warning, "parse warning");
    warnings.push(warning);
}
