//! Integration tests for wavedash-core
//!
//! - Normalization against a scripted decoder
//! - Tile configuration scenarios driven through the session reducers
//! - Upload pipeline over real SPICE raw files
//! - Dataset transport round-trips

use indexmap::IndexMap;
use std::collections::HashMap;
use wavedash_core::{
    normalize, parse_raw, select, upload, Action, AnnotationKind, AppState, DecodeError,
    DecoderFactory, ParseError, ParseWarning, PlotInfo, RawDecoder, StepId, TileAssignment,
    TileConfiguration, TileId, UploadError, UploadRequest, UploadStatus, VectorData,
    WaveDashConfig, WaveformDataset,
};

// =============================================================================
// Test helpers
// =============================================================================

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Decoder returning fixed traces for step 0
struct ScriptedDecoder {
    names: Vec<String>,
    axis: Vec<f64>,
    traces: HashMap<String, VectorData>,
}

impl ScriptedDecoder {
    fn new(names: &[&str], axis: &[f64], traces: &[(&str, &[f64])]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            axis: axis.to_vec(),
            traces: traces
                .iter()
                .map(|(n, v)| (n.to_string(), VectorData::Real(v.to_vec())))
                .collect(),
        }
    }
}

impl RawDecoder for ScriptedDecoder {
    fn trace_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn steps(&self) -> Vec<StepId> {
        vec![StepId(0)]
    }

    fn axis(&self, _step: StepId) -> Result<Vec<f64>, DecodeError> {
        Ok(self.axis.clone())
    }

    fn trace_values(&self, name: &str, _step: StepId) -> Result<VectorData, DecodeError> {
        self.traces
            .get(name)
            .cloned()
            .ok_or_else(|| DecodeError::TraceNotFound(name.to_string()))
    }

    fn plot_info(&self) -> PlotInfo {
        PlotInfo {
            title: "scripted".into(),
            ..PlotInfo::default()
        }
    }
}

struct RejectingFactory;

impl DecoderFactory for RejectingFactory {
    fn open(&self, _bytes: &[u8]) -> Result<Box<dyn RawDecoder>, DecodeError> {
        Err(DecodeError::Format("unsupported".into()))
    }
}

fn dataset(names: &[&str]) -> WaveformDataset {
    let signals: IndexMap<String, Vec<f64>> = names
        .iter()
        .map(|n| (n.to_string(), vec![0.0, 0.5, 1.0]))
        .collect();
    WaveformDataset::new(
        "time",
        vec![0.0, 1.0, 2.0],
        signals,
        PlotInfo::default(),
        StepId(0),
    )
    .unwrap()
}

const RC_RAW: &str = "Title: rc lowpass\n\
Date: Mon Mar  2 10:00:00 2026\n\
Plotname: Transient Analysis\n\
Flags: real\n\
No. Variables: 4\n\
No. Points: 3\n\
Variables:\n\
\t0\ttime\ttime\n\
\t1\tV(in)\tvoltage\n\
\t2\tV(out)\tvoltage\n\
\t3\tI(R1)\tcurrent\n\
Values:\n\
 0\t0.0\n\
\t1.0\n\
\t0.0\n\
\t1.0e-3\n\
\n\
 1\t1.0e-6\n\
\t1.0\n\
\t0.5\n\
\t5.0e-4\n\
\n\
 2\t2.0e-6\n\
\t1.0\n\
\t0.75\n\
\t2.5e-4\n";

// =============================================================================
// Test: Normalization
// =============================================================================

#[test]
fn test_scenario_short_trace_dropped() {
    init_logging();
    let decoder = ScriptedDecoder::new(
        &["time", "V(out)", "I(R1)"],
        &[0.0, 1.0, 2.0],
        &[("V(out)", &[0.0, 1.0, 2.0]), ("I(R1)", &[0.0, 0.1])],
    );

    let ds = normalize(&decoder).unwrap();

    assert_eq!(ds.independent_variable_name(), "time");
    assert_eq!(ds.axis_values(), [0.0, 1.0, 2.0]);
    assert_eq!(ds.signals().len(), 1);
    assert_eq!(ds.signal("V(out)"), Some(&[0.0, 1.0, 2.0][..]));
    assert_eq!(
        ds.warnings(),
        [ParseWarning::LengthMismatch {
            signal: "I(R1)".into(),
            expected: 3,
            actual: 2,
        }]
    );
    assert_eq!(ds.metadata().title, "scripted");
    assert_eq!(ds.metadata().date, "Unknown");
}

#[test]
fn test_complex_traces_become_magnitudes() {
    let mut decoder = ScriptedDecoder::new(&["frequency", "V(out)"], &[1.0, 10.0], &[]);
    decoder.traces.insert(
        "V(out)".into(),
        VectorData::Complex(vec![
            c64(3.0, 4.0),
            c64(-6.0, 8.0),
        ]),
    );

    let ds = normalize(&decoder).unwrap();
    assert_eq!(ds.signal("V(out)"), Some(&[5.0, 10.0][..]));
    assert_eq!(ds.independent_variable_name(), "frequency");
}

fn c64(re: f64, im: f64) -> num_complex::Complex64 {
    num_complex::Complex64::new(re, im)
}

#[test]
fn test_decoder_with_only_axis() {
    let decoder = ScriptedDecoder::new(&["time"], &[0.0, 1.0], &[]);
    let ds = normalize(&decoder).unwrap();
    assert!(ds.signals().is_empty());
    assert_eq!(ds.len(), 2);
    assert!(ds.warnings().is_empty());
}

// =============================================================================
// Test: Tile Scenarios
// =============================================================================

#[test]
fn test_scenario_overlay_and_dedup() {
    let state = AppState::new()
        .dispatch(Action::UploadFinished(Ok(wavedash_core::UploadOutcome {
            dataset: dataset(&["V(out)", "I(R1)"]),
            filename: "rc.raw".into(),
            size_bytes: 10,
        })))
        .dispatch(Action::SelectTile(TileId::Tile2))
        .dispatch(Action::SelectSignal("V(out)".into()))
        .dispatch(Action::AddSignalToActiveTile)
        .dispatch(Action::SelectSignal("I(R1)".into()))
        .dispatch(Action::AddSignalToActiveTile)
        .dispatch(Action::SelectSignal("V(out)".into()))
        .dispatch(Action::AddSignalToActiveTile);

    assert_eq!(state.tiles().signals(TileId::Tile2), ["V(out)", "I(R1)"]);
    for other in [TileId::Tile1, TileId::Tile3, TileId::Tile4] {
        assert!(!state.tiles().is_assigned(other));
    }

    let (_, spec) = state.render_tile(TileId::Tile2);
    assert_eq!(spec.series.len(), 2);
    assert_eq!(spec.y_label, "Mixed Units");
    assert!(spec.show_legend);
}

#[test]
fn test_scenario_missing_signal_annotated() {
    let ds = dataset(&["V(out)"]);
    let config = TileConfiguration::from_assignments([(
        TileId::Tile1,
        TileAssignment::from(vec!["V(out)".to_string(), "Z(missing)".to_string()]),
    )]);

    let spec = select(Some(&ds), &config, TileId::Tile1);

    assert_eq!(spec.series.len(), 1);
    assert_eq!(spec.series[0].name, "V(out)");
    assert_eq!(spec.missing_signals(), ["Z(missing)"]);
    assert_eq!(
        spec.annotation.as_ref().map(|a| a.kind),
        Some(AnnotationKind::MissingSignals)
    );
}

#[test]
fn test_clear_touches_only_active_tile() {
    let config = TileConfiguration::from_assignments([
        (TileId::Tile1, TileAssignment::from("V(a)")),
        (
            TileId::Tile3,
            TileAssignment::from(vec!["V(b)".to_string(), "V(c)".to_string()]),
        ),
    ]);

    let cleared = config.select_tile(TileId::Tile3).clear_active_tile();

    assert!(cleared.assignment(TileId::Tile3).is_none());
    assert_eq!(
        cleared.assignment(TileId::Tile1),
        Some(&TileAssignment::Single("V(a)".into()))
    );
    assert_eq!(cleared.active_tile(), Some(TileId::Tile3));
}

#[test]
fn test_legacy_session_migrates_on_add() {
    let json = r#"{
        "assignments": { "plot-tile-1": "V(out)", "plot-tile-2": ["V(in)"] },
        "activeTile": "plot-tile-1",
        "selectedSignal": "I(R1)"
    }"#;
    let config: TileConfiguration = serde_json::from_str(json).unwrap();
    assert!(config.assignment(TileId::Tile1).unwrap().is_legacy());

    let next = config.add_signal_to_active_tile();
    assert_eq!(
        next.assignment(TileId::Tile1),
        Some(&TileAssignment::List(vec!["V(out)".into(), "I(R1)".into()]))
    );
    assert!(config.assignment(TileId::Tile1).unwrap().is_legacy());
}

// =============================================================================
// Test: Upload Pipeline
// =============================================================================

#[test]
fn test_upload_ascii_raw_file() {
    init_logging();
    let request = UploadRequest::from_bytes(RC_RAW.as_bytes(), "rc.raw");
    let outcome = upload(&request, &WaveDashConfig::default()).unwrap();

    assert_eq!(outcome.size_bytes, RC_RAW.len());
    let ds = &outcome.dataset;
    assert_eq!(
        ds.signal_names().collect::<Vec<_>>(),
        ["V(in)", "V(out)", "I(R1)"]
    );
    assert_eq!(ds.axis_values(), [0.0, 1.0e-6, 2.0e-6]);
    assert_eq!(ds.signal("V(out)"), Some(&[0.0, 0.5, 0.75][..]));
    assert_eq!(ds.metadata().title, "rc lowpass");
    assert_eq!(ds.metadata().plot_name, "Transient Analysis");
    assert!(outcome.feedback().starts_with("✓ Uploaded: rc.raw ("));
}

#[test]
fn test_upload_wrong_extension_keeps_nothing() {
    let request = UploadRequest::from_bytes(RC_RAW.as_bytes(), "rc.txt");
    let result = upload(&request, &WaveDashConfig::default());
    assert_eq!(
        result,
        Err(UploadError::Rejected("Please upload a .raw file".into()))
    );

    let state = AppState::new()
        .dispatch(Action::UploadFinished(Ok(wavedash_core::UploadOutcome {
            dataset: dataset(&["V(out)"]),
            filename: "old.raw".into(),
            size_bytes: 1,
        })))
        .dispatch(Action::UploadFinished(result));
    assert!(state.dataset().is_none());
    assert_eq!(
        state.upload_status(),
        &UploadStatus::Failed {
            message: "✗ Error: Please upload a .raw file".into()
        }
    );
}

#[test]
fn test_upload_decoder_failure_passes_message() {
    let request = UploadRequest::from_bytes(b"garbage", "x.raw");
    let err = wavedash_core::parse_upload(&request, &WaveDashConfig::default(), &RejectingFactory)
        .unwrap_err();
    assert_eq!(
        err,
        UploadError::Parse(ParseError::DecodeFailure(
            "Format error: unsupported".into()
        ))
    );
}

#[test]
fn test_parse_raw_rejects_text() {
    assert!(matches!(
        parse_raw(b"hello world\n"),
        Err(ParseError::DecodeFailure(_))
    ));
}

// =============================================================================
// Test: Transport
// =============================================================================

#[test]
fn test_dataset_json_roundtrip() {
    let ds = parse_raw(RC_RAW.as_bytes()).unwrap();
    let json = ds.to_json().unwrap();
    let back = WaveformDataset::from_json(&json).unwrap();
    assert_eq!(back, ds);
    assert_eq!(back.axis_values(), ds.axis_values());
}

#[test]
fn test_dataset_json_keeps_diverged_samples() {
    let raw = "Title: t\nDate: d\nPlotname: Transient Analysis\nFlags: real\n\
No. Variables: 2\nNo. Points: 3\nVariables:\n\t0\ttime\ttime\n\t1\tV(out)\tvoltage\n\
Values:\n 0\t0.0\n\t1.0\n 1\t1.0\n\tnan\n 2\t2.0\n\tinf\n";
    let ds = parse_raw(raw.as_bytes()).unwrap();
    let back = WaveformDataset::from_json(&ds.to_json().unwrap()).unwrap();

    let out = back.signal("V(out)").unwrap();
    assert_eq!(out[0], 1.0);
    assert!(out[1].is_nan());
    assert_eq!(out[2], f64::INFINITY);
    assert_eq!(back.axis_values(), [0.0, 1.0, 2.0]);
}

#[test]
fn test_dataset_json_rejects_inconsistent_lengths() {
    let json = r#"{
        "independentVariableName": "time",
        "axisValues": [0.0, 1.0],
        "signals": { "V(out)": [1.0] },
        "metadata": {
            "title": "t", "date": "d", "plotName": "p",
            "numPoints": 2, "numSignals": 1, "processedStep": 0
        }
    }"#;
    assert!(WaveformDataset::from_json(json).is_err());
}
