//! # WaveDash - Core Library
//!
//! Waveform dataset normalization and multi-signal plot tiles for SPICE
//! simulation output.
//!
//! ## Features
//!
//! - Built-in SPICE3/ngspice raw decoder (binary and ASCII, multi-plot)
//! - Pluggable decoders through the [`RawDecoder`] capability
//! - Tolerant normalization: bad traces become warnings, not failures
//! - Four plot tiles, each overlaying any number of signals
//! - Transparent migration of legacy single-signal tile assignments
//! - Structured logging via `tracing` for diagnostics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wavedash_core::{parse_raw, select, TileConfiguration, TileId};
//!
//! let bytes = std::fs::read("simulation.raw").unwrap();
//! let dataset = parse_raw(&bytes).unwrap();
//! println!("Axis: {} ({} points)", dataset.independent_variable_name(), dataset.len());
//!
//! for warning in dataset.warnings() {
//!     println!("warning: {}", warning);
//! }
//!
//! let tiles = TileConfiguration::new()
//!     .select_tile(TileId::Tile1)
//!     .select_signal("V(out)")
//!     .add_signal_to_active_tile();
//!
//! let spec = select(Some(&dataset), &tiles, TileId::Tile1);
//! println!("{}: {} series", spec.title, spec.series.len());
//! ```
//!
//! ## Session State
//!
//! ```rust,no_run
//! use wavedash_core::{upload, Action, AppState, TileId, UploadRequest, WaveDashConfig};
//!
//! let settings = WaveDashConfig::default();
//! let request = UploadRequest::from_bytes(&std::fs::read("sim.raw").unwrap(), "sim.raw");
//!
//! let state = AppState::new()
//!     .dispatch(Action::UploadFinished(upload(&request, &settings)))
//!     .dispatch(Action::SelectTile(TileId::Tile2))
//!     .dispatch(Action::SelectSignal("V(out)".into()))
//!     .dispatch(Action::AddSignalToActiveTile);
//!
//! println!("{}", state.tile_status_text(TileId::Tile2));
//! ```
//!
//! ## Enabling Logging
//!
//! This library uses `tracing` for structured logging. To see log output,
//! initialize a tracing subscriber in your application:
//!
//! ```rust,ignore
//! // Add tracing-subscriber to your Cargo.toml
//! tracing_subscriber::fmt::init();
//!
//! // Now library logs will be visible
//! let dataset = wavedash_core::parse_raw(&bytes).unwrap();
//! ```

mod classify;
mod config;
mod decoder;
mod normalizer;
mod raw_parser;
mod render;
mod session;
mod tiles;
mod types;
mod upload;

// Re-export public types
pub use types::{
    // Data model
    DatasetMetadata,
    PlotInfo,
    StepId,
    VectorData,
    WaveformDataset,
    // Errors and warnings
    DatasetError,
    DecodeError,
    ParseError,
    ParseWarning,
    Result,
    UploadError,
    // Constants
    DEFAULT_EXTENSION,
    DEFAULT_PALETTE,
    DEFAULT_X_LABEL,
    MAX_TITLE_SIGNALS,
    MIXED_UNITS_LABEL,
    PLACEHOLDER_HINT,
    PLACEHOLDER_X_LABEL,
    PLACEHOLDER_Y_LABEL,
    TILE_COUNT,
    UNKNOWN_METADATA,
};

pub use classify::{classify, node_name, signal_info, SignalInfo, SignalType};
pub use config::WaveDashConfig;
pub use decoder::{DecoderAdapter, DecoderFactory, RawDecoder};
pub use normalizer::{normalize, parse_bytes};
pub use raw_parser::{SpiceRawDecoderFactory, SpiceRawFile};
pub use render::{
    select, select_with, title_for, Annotation, AnnotationKind, RenderSpec, Series,
};
pub use session::{Action, AppState, PlotButton, UploadStatus};
pub use tiles::{TileAssignment, TileConfiguration, TileId, UnknownTile};
pub use upload::{
    decode_payload, error_feedback, format_size, parse_upload, UploadOutcome, UploadRequest,
};

// ============================================================================
// Public API Functions
// ============================================================================

/// Decode and normalize a SPICE raw file held in memory.
///
/// # Arguments
/// * `bytes` - Contents of a `.raw` file (binary or ASCII)
///
/// # Returns
/// * `Ok(WaveformDataset)` - Normalized dataset, possibly with warnings
/// * `Err(ParseError)` - If the file has no traces, no axis, or cannot be decoded
pub fn parse_raw(bytes: &[u8]) -> Result<WaveformDataset> {
    parse_bytes(bytes, &SpiceRawDecoderFactory)
}

/// Run an upload request through the built-in raw decoder.
pub fn upload(
    request: &UploadRequest,
    settings: &WaveDashConfig,
) -> std::result::Result<UploadOutcome, UploadError> {
    parse_upload(request, settings, &SpiceRawDecoderFactory)
}
