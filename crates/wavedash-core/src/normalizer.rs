//! Waveform dataset normalizer
//!
//! Builds a [`WaveformDataset`] from a decoder: picks the step, reads the
//! axis, extracts every remaining trace, and drops traces whose length does
//! not match the axis. Problems with single traces become warnings on the
//! dataset; only missing traces or a missing axis abort the build.

use crate::decoder::{record, DecoderAdapter, DecoderFactory, RawDecoder};
use crate::types::{ParseError, ParseWarning, Result, WaveformDataset};
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::{field, info, instrument, Span};

/// Normalize an opened decoder into a dataset
#[instrument(skip_all, fields(traces = field::Empty, step = field::Empty))]
pub fn normalize(decoder: &dyn RawDecoder) -> Result<WaveformDataset> {
    let adapter = DecoderAdapter::new(decoder);
    let span = Span::current();

    let names = adapter.trace_names();
    span.record("traces", names.len());
    let (independent, traces) = names.split_first().ok_or(ParseError::NoTraces)?;

    let mut warnings = Vec::new();
    let step = adapter.select_step(&mut warnings);
    span.record("step", step.0);
    let axis = adapter.axis(step)?;

    let mut seen: HashSet<&str> = HashSet::with_capacity(names.len());
    seen.insert(independent);
    let mut signals = IndexMap::with_capacity(traces.len());

    for name in traces {
        if !seen.insert(name) {
            record(
                &mut warnings,
                ParseWarning::DuplicateTrace {
                    signal: name.clone(),
                },
            );
            continue;
        }

        match adapter.signal(name, step) {
            Ok(values) if values.len() == axis.len() => {
                signals.insert(name.clone(), values);
            }
            Ok(values) => record(
                &mut warnings,
                ParseWarning::LengthMismatch {
                    signal: name.clone(),
                    expected: axis.len(),
                    actual: values.len(),
                },
            ),
            Err(warning) => record(&mut warnings, warning),
        }
    }

    info!(
        scale = %independent,
        step = %step,
        points = axis.len(),
        signals = signals.len(),
        warnings = warnings.len(),
        "Dataset built"
    );

    Ok(WaveformDataset::from_reconciled(
        independent.clone(),
        axis,
        signals,
        adapter.plot_info(),
        step,
        warnings,
    ))
}

/// Open `bytes` with `factory` and normalize the result
pub fn parse_bytes(bytes: &[u8], factory: &dyn DecoderFactory) -> Result<WaveformDataset> {
    let decoder = factory.open(bytes)?;
    normalize(decoder.as_ref())
}
