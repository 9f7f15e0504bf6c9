//! Common types, errors, and constants for waveform datasets

use indexmap::IndexMap;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Number of plot tiles in a session
pub const TILE_COUNT: usize = 4;

/// File extension accepted by the upload pipeline (matched case-insensitively)
pub const DEFAULT_EXTENSION: &str = ".raw";

/// X-axis label used when the dataset has no independent variable name
pub const DEFAULT_X_LABEL: &str = "Time";
/// Y-axis label used when a tile overlays signals of different types
pub const MIXED_UNITS_LABEL: &str = "Mixed Units";

pub const PLACEHOLDER_X_LABEL: &str = "Time / Frequency";
pub const PLACEHOLDER_Y_LABEL: &str = "Amplitude";
pub const PLACEHOLDER_HINT: &str =
    "No signal plotted\nSelect a signal and click \"Plot to Active Tile\"";

/// Number of signal names spelled out in a tile title before "+N more"
pub const MAX_TITLE_SIGNALS: usize = 3;

/// Series colors, indexed by position within a tile (wraps around)
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Placeholder for scalar metadata the decoder does not provide
pub const UNKNOWN_METADATA: &str = "Unknown";

// ============================================================================
// Enums
// ============================================================================

/// Index of one sweep iteration in a stepped simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub usize);

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Vector data - either real or complex
#[derive(Debug, Clone, PartialEq)]
pub enum VectorData {
    Real(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl VectorData {
    pub fn len(&self) -> usize {
        match self {
            VectorData::Real(v) => v.len(),
            VectorData::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, VectorData::Complex(_))
    }

    /// Real values as-is; complex values reduced to their magnitude.
    /// Phase is discarded.
    pub fn into_magnitudes(self) -> Vec<f64> {
        match self {
            VectorData::Real(v) => v,
            VectorData::Complex(v) => v.into_iter().map(|c| c.norm()).collect(),
        }
    }

    /// Real part of every element. Used for axis vectors, which some
    /// writers store as complex with a zero imaginary part.
    pub fn into_real_parts(self) -> Vec<f64> {
        match self {
            VectorData::Real(v) => v,
            VectorData::Complex(v) => v.into_iter().map(|c| c.re).collect(),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Failure reported by a raw decoder
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Trace not found: {0}")]
    TraceNotFound(String),

    #[error("Step {0} out of range")]
    StepOutOfRange(StepId),
}

/// Failure that leaves the caller without a dataset
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("No traces found in the raw file")]
    NoTraces,

    #[error("Independent variable data is missing")]
    MissingAxis,

    #[error("{0}")]
    DecodeFailure(String),
}

impl From<DecodeError> for ParseError {
    fn from(e: DecodeError) -> Self {
        ParseError::DecodeFailure(e.to_string())
    }
}

/// Failure of the upload pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    #[error("{0}")]
    Rejected(String),

    #[error("Failed to parse file: {0}")]
    Parse(#[from] ParseError),
}

/// A dataset payload that violates the dataset invariants
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatasetError {
    #[error("signal '{signal}' has {actual} points, axis has {expected}")]
    LengthMismatch {
        signal: String,
        expected: usize,
        actual: usize,
    },

    #[error("metadata reports {reported} {field}, dataset has {actual}")]
    CountMismatch {
        field: &'static str,
        reported: usize,
        actual: usize,
    },
}

/// Non-fatal problem recorded while building a dataset
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParseWarning {
    #[error("decoder reported no steps, using step 0")]
    StepDefaulted,

    #[error("could not extract trace {signal}: {reason}")]
    ExtractionFailed { signal: String, reason: String },

    #[error("trace {signal} has {actual} points, expected {expected}; dropped")]
    LengthMismatch {
        signal: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate trace {signal} ignored")]
    DuplicateTrace { signal: String },
}

impl ParseWarning {
    /// Signal the warning refers to, if any
    pub fn signal(&self) -> Option<&str> {
        match self {
            ParseWarning::StepDefaulted => None,
            ParseWarning::ExtractionFailed { signal, .. }
            | ParseWarning::LengthMismatch { signal, .. }
            | ParseWarning::DuplicateTrace { signal } => Some(signal),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

// ============================================================================
// Data Structures
// ============================================================================

/// Scalar metadata reported by a decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotInfo {
    pub title: String,
    pub date: String,
    pub plot_name: String,
}

impl Default for PlotInfo {
    fn default() -> Self {
        Self {
            title: UNKNOWN_METADATA.to_string(),
            date: UNKNOWN_METADATA.to_string(),
            plot_name: UNKNOWN_METADATA.to_string(),
        }
    }
}

/// Dataset metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub title: String,
    pub date: String,
    pub plot_name: String,
    pub num_points: usize,
    pub num_signals: usize,
    pub processed_step: StepId,
}

/// Normalized waveform data for one decoded file.
///
/// Every signal has exactly as many points as the axis. The dataset is
/// immutable; a new upload replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "DatasetTransport")]
pub struct WaveformDataset {
    independent_variable_name: String,
    #[serde(serialize_with = "samples::serialize_values")]
    axis_values: Vec<f64>,
    #[serde(serialize_with = "samples::serialize_signals")]
    signals: IndexMap<String, Vec<f64>>,
    metadata: DatasetMetadata,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<ParseWarning>,
}

impl WaveformDataset {
    /// Build a dataset, checking that every signal matches the axis length.
    pub fn new(
        independent_variable_name: impl Into<String>,
        axis_values: Vec<f64>,
        signals: IndexMap<String, Vec<f64>>,
        info: PlotInfo,
        processed_step: StepId,
    ) -> std::result::Result<Self, DatasetError> {
        check_lengths(&axis_values, &signals)?;
        Ok(Self::from_reconciled(
            independent_variable_name.into(),
            axis_values,
            signals,
            info,
            processed_step,
            Vec::new(),
        ))
    }

    /// Caller guarantees that signal lengths already match the axis.
    pub(crate) fn from_reconciled(
        independent_variable_name: String,
        axis_values: Vec<f64>,
        signals: IndexMap<String, Vec<f64>>,
        info: PlotInfo,
        processed_step: StepId,
        warnings: Vec<ParseWarning>,
    ) -> Self {
        let metadata = DatasetMetadata {
            title: info.title,
            date: info.date,
            plot_name: info.plot_name,
            num_points: axis_values.len(),
            num_signals: signals.len(),
            processed_step,
        };
        Self {
            independent_variable_name,
            axis_values,
            signals,
            metadata,
            warnings,
        }
    }

    /// Name of the sweep axis (e.g. "time", "frequency")
    pub fn independent_variable_name(&self) -> &str {
        &self.independent_variable_name
    }

    pub fn axis_values(&self) -> &[f64] {
        &self.axis_values
    }

    /// Signals in trace order
    pub fn signals(&self) -> &IndexMap<String, Vec<f64>> {
        &self.signals
    }

    /// Get signal values by name (case-sensitive)
    pub fn signal(&self, name: &str) -> Option<&[f64]> {
        self.signals.get(name).map(Vec::as_slice)
    }

    pub fn contains_signal(&self, name: &str) -> bool {
        self.signals.contains_key(name)
    }

    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.signals.keys().map(String::as_str)
    }

    pub fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    /// Warnings recorded while the dataset was built
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// Number of points on the axis
    pub fn len(&self) -> usize {
        self.axis_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axis_values.is_empty()
    }

    /// Serialize to the JSON transport form
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Rebuild from the JSON transport form, re-checking all invariants
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

fn check_lengths(
    axis_values: &[f64],
    signals: &IndexMap<String, Vec<f64>>,
) -> std::result::Result<(), DatasetError> {
    for (name, values) in signals {
        if values.len() != axis_values.len() {
            return Err(DatasetError::LengthMismatch {
                signal: name.clone(),
                expected: axis_values.len(),
                actual: values.len(),
            });
        }
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetTransport {
    independent_variable_name: String,
    #[serde(deserialize_with = "samples::deserialize_values")]
    axis_values: Vec<f64>,
    #[serde(deserialize_with = "samples::deserialize_signals")]
    signals: IndexMap<String, Vec<f64>>,
    metadata: DatasetMetadata,
    #[serde(default)]
    warnings: Vec<ParseWarning>,
}

impl TryFrom<DatasetTransport> for WaveformDataset {
    type Error = DatasetError;

    fn try_from(t: DatasetTransport) -> std::result::Result<Self, Self::Error> {
        check_lengths(&t.axis_values, &t.signals)?;
        if t.metadata.num_points != t.axis_values.len() {
            return Err(DatasetError::CountMismatch {
                field: "points",
                reported: t.metadata.num_points,
                actual: t.axis_values.len(),
            });
        }
        if t.metadata.num_signals != t.signals.len() {
            return Err(DatasetError::CountMismatch {
                field: "signals",
                reported: t.metadata.num_signals,
                actual: t.signals.len(),
            });
        }
        Ok(Self {
            independent_variable_name: t.independent_variable_name,
            axis_values: t.axis_values,
            signals: t.signals,
            metadata: t.metadata,
            warnings: t.warnings,
        })
    }
}

/// JSON form of sample vectors. Finite values are plain numbers; NaN and
/// the infinities are written as `"NaN"`, `"Infinity"` and `"-Infinity"`.
/// A `null` sample reads back as NaN.
mod samples {
    use indexmap::IndexMap;
    use serde::de::{self, Deserializer, Visitor};
    use serde::ser::Serializer;
    use serde::{Deserialize, Serialize};
    use std::fmt;

    struct Sample(f64);

    impl Serialize for Sample {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match self.0 {
                v if v.is_finite() => serializer.serialize_f64(v),
                v if v.is_nan() => serializer.serialize_str("NaN"),
                v if v > 0.0 => serializer.serialize_str("Infinity"),
                _ => serializer.serialize_str("-Infinity"),
            }
        }
    }

    impl<'de> Deserialize<'de> for Sample {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(SampleVisitor)
        }
    }

    struct SampleVisitor;

    impl<'de> Visitor<'de> for SampleVisitor {
        type Value = Sample;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number, null, \"NaN\", \"Infinity\" or \"-Infinity\"")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Sample, E> {
            Ok(Sample(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Sample, E> {
            Ok(Sample(v as f64))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Sample, E> {
            Ok(Sample(v as f64))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Sample, E> {
            Ok(Sample(f64::NAN))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Sample, E> {
            match v {
                "NaN" => Ok(Sample(f64::NAN)),
                "Infinity" => Ok(Sample(f64::INFINITY)),
                "-Infinity" => Ok(Sample(f64::NEG_INFINITY)),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }

    struct Samples<'a>(&'a [f64]);

    impl Serialize for Samples<'_> {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.collect_seq(self.0.iter().map(|&v| Sample(v)))
        }
    }

    fn unwrap_samples(samples: Vec<Sample>) -> Vec<f64> {
        samples.into_iter().map(|s| s.0).collect()
    }

    pub fn serialize_values<S>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Samples(values).serialize(serializer)
    }

    pub fn serialize_signals<S>(
        signals: &IndexMap<String, Vec<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(signals.iter().map(|(name, values)| (name, Samples(values))))
    }

    pub fn deserialize_values<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<Sample>::deserialize(deserializer).map(unwrap_samples)
    }

    pub fn deserialize_signals<'de, D>(deserializer: D) -> Result<IndexMap<String, Vec<f64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = IndexMap::<String, Vec<Sample>>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(name, samples)| (name, unwrap_samples(samples)))
            .collect())
    }
}
