//! Rendering selector
//!
//! Maps a dataset, a tile configuration and a tile id to a [`RenderSpec`]:
//! the series, labels and annotations a chart renderer needs to draw one
//! tile. Missing data never fails; it turns into a placeholder or an
//! annotation.

use crate::classify::{classify, SignalType};
use crate::config::WaveDashConfig;
use crate::tiles::{TileConfiguration, TileId};
use crate::types::{WaveformDataset, PLACEHOLDER_HINT, PLACEHOLDER_X_LABEL, PLACEHOLDER_Y_LABEL};
use serde::Serialize;

/// What an annotation on a tile means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationKind {
    /// Empty tile hint
    Placeholder,
    /// None of the tile's signals exist in the dataset
    NotFound,
    /// Some of the tile's signals exist; the rest are listed
    MissingSignals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub text: String,
    pub missing: Vec<String>,
}

/// One line on a tile
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub name: String,
    pub signal_type: SignalType,
    pub color: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Everything needed to draw one tile
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSpec {
    pub tile: TileId,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
    pub show_legend: bool,
    pub annotation: Option<Annotation>,
}

impl RenderSpec {
    /// Empty tile: title, placeholder axes and a usage hint
    pub fn placeholder(tile: TileId) -> Self {
        Self {
            tile,
            title: format!("Plot Tile {}", tile.number()),
            x_label: PLACEHOLDER_X_LABEL.to_string(),
            y_label: PLACEHOLDER_Y_LABEL.to_string(),
            series: Vec::new(),
            show_legend: false,
            annotation: Some(Annotation {
                kind: AnnotationKind::Placeholder,
                text: PLACEHOLDER_HINT.to_string(),
                missing: Vec::new(),
            }),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.series.is_empty()
    }

    /// Signal names the tile references but the dataset lacks
    pub fn missing_signals(&self) -> &[String] {
        self.annotation
            .as_ref()
            .map(|a| a.missing.as_slice())
            .unwrap_or(&[])
    }
}

/// Select with default settings
pub fn select(
    dataset: Option<&WaveformDataset>,
    config: &TileConfiguration,
    tile: TileId,
) -> RenderSpec {
    select_with(dataset, config, tile, &WaveDashConfig::default())
}

pub fn select_with(
    dataset: Option<&WaveformDataset>,
    config: &TileConfiguration,
    tile: TileId,
    settings: &WaveDashConfig,
) -> RenderSpec {
    let signals = config.signals(tile);
    let dataset = match dataset {
        Some(ds) if !signals.is_empty() => ds,
        _ => return RenderSpec::placeholder(tile),
    };

    let (present, missing): (Vec<&String>, Vec<&String>) =
        signals.iter().partition(|name| dataset.contains_signal(name));
    let missing: Vec<String> = missing.into_iter().cloned().collect();

    if present.is_empty() {
        let mut spec = RenderSpec::placeholder(tile);
        spec.annotation = Some(Annotation {
            kind: AnnotationKind::NotFound,
            text: not_found_text(&missing),
            missing,
        });
        return spec;
    }

    let series: Vec<Series> = present
        .iter()
        .enumerate()
        .filter_map(|(i, name)| {
            dataset.signal(name).map(|values| Series {
                name: name.to_string(),
                signal_type: classify(name),
                color: settings.color(i).to_string(),
                x: dataset.axis_values().to_vec(),
                y: values.to_vec(),
            })
        })
        .collect();

    let x_label = match dataset.independent_variable_name() {
        "" => settings.default_x_label.clone(),
        name => name.to_string(),
    };

    let annotation = (!missing.is_empty()).then(|| Annotation {
        kind: AnnotationKind::MissingSignals,
        text: format!("Not found: {}", missing.join(", ")),
        missing,
    });

    RenderSpec {
        tile,
        title: title_for(&present, settings.max_title_signals),
        x_label,
        y_label: y_label_for(&series, settings),
        show_legend: series.len() > 1,
        series,
        annotation,
    }
}

/// Tile title: one name, a short comma-joined list, or the first two
/// names followed by "+N more". Two names are always listed in full.
pub fn title_for<S: AsRef<str>>(names: &[S], max_listed: usize) -> String {
    let names: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
    match names.len() {
        0 => String::new(),
        n if n <= max_listed.max(2) => names.join(", "),
        n => format!("{}, {} +{} more", names[0], names[1], n - 2),
    }
}

fn y_label_for(series: &[Series], settings: &WaveDashConfig) -> String {
    let mut types = series.iter().map(|s| s.signal_type);
    match types.next() {
        Some(first) if types.all(|t| t == first) => first.unit_label().to_string(),
        Some(_) => settings.mixed_units_label.clone(),
        None => PLACEHOLDER_Y_LABEL.to_string(),
    }
}

fn not_found_text(missing: &[String]) -> String {
    match missing {
        [one] => format!("Signal '{}' not found in data", one),
        many => format!("Signals not found in data: {}", many.join(", ")),
    }
}
