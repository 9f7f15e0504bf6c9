//! Application state and reducers
//!
//! One [`AppState`] value holds everything a session knows: the dataset,
//! the tile configuration and the last upload status. User actions go
//! through [`AppState::dispatch`], which returns a new state and leaves
//! the old one untouched. The delivery layer only dispatches actions and
//! re-renders from the latest state.

use crate::classify::{signal_info, SignalInfo};
use crate::config::WaveDashConfig;
use crate::render::{select_with, title_for, RenderSpec};
use crate::tiles::{TileConfiguration, TileId};
use crate::types::{UploadError, WaveformDataset};
use crate::upload::{error_feedback, UploadOutcome};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Result of the most recent upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum UploadStatus {
    #[default]
    Idle,
    Loaded { message: String },
    Failed { message: String },
}

impl UploadStatus {
    pub fn message(&self) -> &str {
        match self {
            UploadStatus::Idle => "",
            UploadStatus::Loaded { message } | UploadStatus::Failed { message } => message,
        }
    }
}

/// A discrete user action
#[derive(Debug, Clone)]
pub enum Action {
    UploadFinished(Result<UploadOutcome, UploadError>),
    SelectTile(TileId),
    SelectSignal(String),
    AddSignalToActiveTile,
    ClearActiveTile,
}

/// State of the plot button
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlotButton {
    pub enabled: bool,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    dataset: Option<Arc<WaveformDataset>>,
    tiles: TileConfiguration,
    upload_status: UploadStatus,
    settings: Arc<WaveDashConfig>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: WaveDashConfig) -> Self {
        Self {
            settings: Arc::new(settings),
            ..Self::default()
        }
    }

    pub fn dataset(&self) -> Option<&WaveformDataset> {
        self.dataset.as_deref()
    }

    pub fn tiles(&self) -> &TileConfiguration {
        &self.tiles
    }

    pub fn upload_status(&self) -> &UploadStatus {
        &self.upload_status
    }

    pub fn settings(&self) -> &WaveDashConfig {
        &self.settings
    }

    /// Apply one action and return the resulting state
    pub fn dispatch(&self, action: Action) -> AppState {
        match action {
            Action::UploadFinished(Ok(outcome)) => self.upload_succeeded(outcome),
            Action::UploadFinished(Err(error)) => self.upload_failed(&error),
            Action::SelectTile(tile) => self.with_tiles(self.tiles.select_tile(tile)),
            Action::SelectSignal(name) => {
                if self.dataset().is_some_and(|ds| ds.contains_signal(&name)) {
                    self.with_tiles(self.tiles.select_signal(&name))
                } else {
                    debug!(signal = %name, "select ignored: signal not in dataset");
                    self.clone()
                }
            }
            Action::AddSignalToActiveTile => {
                self.with_tiles(self.tiles.add_signal_to_active_tile())
            }
            Action::ClearActiveTile => self.with_tiles(self.tiles.clear_active_tile()),
        }
    }

    fn with_tiles(&self, tiles: TileConfiguration) -> AppState {
        AppState {
            tiles,
            ..self.clone()
        }
    }

    fn upload_succeeded(&self, outcome: UploadOutcome) -> AppState {
        let message = outcome.feedback();
        let dataset = outcome.dataset;

        // Tile assignments survive the swap; names the new file lacks
        // render as not-found annotations.
        let tiles = match self.tiles.selected_signal() {
            Some(name) if !dataset.contains_signal(name) => self.tiles.deselect_signal(),
            _ => self.tiles.clone(),
        };

        AppState {
            dataset: Some(Arc::new(dataset)),
            tiles,
            upload_status: UploadStatus::Loaded { message },
            settings: Arc::clone(&self.settings),
        }
    }

    fn upload_failed(&self, error: &UploadError) -> AppState {
        AppState {
            dataset: None,
            tiles: self.tiles.deselect_signal(),
            upload_status: UploadStatus::Failed {
                message: error_feedback(error),
            },
            settings: Arc::clone(&self.settings),
        }
    }

    // ========================================================================
    // Derived views
    // ========================================================================

    /// Signals of the current dataset, classified, in dataset order
    pub fn signal_list(&self) -> Vec<SignalInfo> {
        self.dataset()
            .map(|ds| signal_info(ds.signal_names()))
            .unwrap_or_default()
    }

    /// Tile header text
    pub fn tile_status_text(&self, tile: TileId) -> String {
        let is_active = self.tiles.active_tile() == Some(tile);
        let signals = self.tiles.signals(tile);
        if signals.is_empty() {
            let status = if is_active { "Active" } else { "Empty" };
            return status.to_string();
        }

        let mut status = format!(
            "Plotting: {}",
            title_for(signals, self.settings.max_title_signals)
        );
        if is_active {
            status.push_str(" (Active)");
        }
        status
    }

    pub fn plot_button(&self) -> PlotButton {
        let (enabled, label) = match (self.tiles.active_tile(), self.tiles.selected_signal()) {
            (Some(tile), Some(signal)) => (
                true,
                format!("Plot '{}' to Tile {}", signal, tile.number()),
            ),
            (None, Some(_)) => (false, "Select a tile to plot to".to_string()),
            (Some(_), None) => (false, "Select a signal to plot".to_string()),
            (None, None) => (false, "Plot to Active Tile".to_string()),
        };
        PlotButton { enabled, label }
    }

    /// Clearing only makes sense for an active tile with signals
    pub fn clear_button_enabled(&self) -> bool {
        self.tiles
            .active_tile()
            .is_some_and(|tile| self.tiles.is_assigned(tile))
    }

    /// Render `tile`, migrating a legacy assignment first. The returned
    /// state carries the migrated configuration.
    pub fn render_tile(&self, tile: TileId) -> (AppState, RenderSpec) {
        let tiles = self.tiles.migrate(tile);
        let spec = select_with(self.dataset(), &tiles, tile, &self.settings);
        (self.with_tiles(tiles), spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::AnnotationKind;
    use crate::tiles::TileAssignment;
    use crate::types::{ParseError, PlotInfo, StepId};
    use indexmap::IndexMap;

    fn outcome(names: &[&str]) -> UploadOutcome {
        let signals: IndexMap<String, Vec<f64>> = names
            .iter()
            .map(|n| (n.to_string(), vec![0.0, 1.0]))
            .collect();
        UploadOutcome {
            dataset: WaveformDataset::new(
                "time",
                vec![0.0, 1.0],
                signals,
                PlotInfo::default(),
                StepId(0),
            )
            .unwrap(),
            filename: "sim.raw".into(),
            size_bytes: 2048,
        }
    }

    fn loaded(names: &[&str]) -> AppState {
        AppState::new().dispatch(Action::UploadFinished(Ok(outcome(names))))
    }

    #[test]
    fn test_upload_success_status() {
        let state = loaded(&["V(out)"]);
        assert_eq!(
            state.upload_status().message(),
            "✓ Uploaded: sim.raw (2.0 KB)"
        );
        assert_eq!(state.signal_list().len(), 1);
    }

    #[test]
    fn test_upload_failure_clears_dataset() {
        let state = loaded(&["V(out)"])
            .dispatch(Action::SelectSignal("V(out)".into()))
            .dispatch(Action::UploadFinished(Err(UploadError::Parse(
                ParseError::NoTraces,
            ))));
        assert!(state.dataset().is_none());
        assert!(state.tiles().selected_signal().is_none());
        assert_eq!(
            state.upload_status(),
            &UploadStatus::Failed {
                message: "✗ Error: Failed to parse file: No traces found in the raw file".into()
            }
        );
        assert!(state.signal_list().is_empty());
    }

    #[test]
    fn test_new_upload_keeps_tiles() {
        let state = loaded(&["V(out)", "V(in)"])
            .dispatch(Action::SelectTile(TileId::Tile1))
            .dispatch(Action::SelectSignal("V(in)".into()))
            .dispatch(Action::AddSignalToActiveTile)
            .dispatch(Action::UploadFinished(Ok(outcome(&["V(out)"]))));

        assert_eq!(state.tiles().signals(TileId::Tile1), ["V(in)"]);
        assert!(state.tiles().selected_signal().is_none());

        let (_, spec) = state.render_tile(TileId::Tile1);
        assert_eq!(spec.annotation.unwrap().kind, AnnotationKind::NotFound);
    }

    #[test]
    fn test_select_unknown_signal_is_noop() {
        let state = loaded(&["V(out)"]).dispatch(Action::SelectSignal("V(nope)".into()));
        assert!(state.tiles().selected_signal().is_none());

        let state = AppState::new().dispatch(Action::SelectSignal("V(out)".into()));
        assert!(state.tiles().selected_signal().is_none());
    }

    #[test]
    fn test_dispatch_leaves_previous_state() {
        let before = loaded(&["V(out)"]).dispatch(Action::SelectTile(TileId::Tile2));
        let after = before
            .dispatch(Action::SelectSignal("V(out)".into()))
            .dispatch(Action::AddSignalToActiveTile);
        assert!(!before.tiles().is_assigned(TileId::Tile2));
        assert_eq!(after.tiles().signals(TileId::Tile2), ["V(out)"]);
    }

    #[test]
    fn test_tile_status_text() {
        let state = loaded(&["V(out)", "I(R1)"]);
        assert_eq!(state.tile_status_text(TileId::Tile1), "Empty");

        let state = state.dispatch(Action::SelectTile(TileId::Tile1));
        assert_eq!(state.tile_status_text(TileId::Tile1), "Active");

        let state = state
            .dispatch(Action::SelectSignal("V(out)".into()))
            .dispatch(Action::AddSignalToActiveTile)
            .dispatch(Action::SelectSignal("I(R1)".into()))
            .dispatch(Action::AddSignalToActiveTile);
        assert_eq!(
            state.tile_status_text(TileId::Tile1),
            "Plotting: V(out), I(R1) (Active)"
        );

        let state = state.dispatch(Action::SelectTile(TileId::Tile2));
        assert_eq!(
            state.tile_status_text(TileId::Tile1),
            "Plotting: V(out), I(R1)"
        );
    }

    #[test]
    fn test_plot_button_labels() {
        let state = loaded(&["V(out)"]);
        assert_eq!(
            state.plot_button(),
            PlotButton {
                enabled: false,
                label: "Plot to Active Tile".into()
            }
        );

        let with_signal = state.dispatch(Action::SelectSignal("V(out)".into()));
        assert_eq!(with_signal.plot_button().label, "Select a tile to plot to");

        let with_tile = state.dispatch(Action::SelectTile(TileId::Tile3));
        assert_eq!(with_tile.plot_button().label, "Select a signal to plot");

        let ready = with_signal.dispatch(Action::SelectTile(TileId::Tile3));
        assert_eq!(
            ready.plot_button(),
            PlotButton {
                enabled: true,
                label: "Plot 'V(out)' to Tile 3".into()
            }
        );
    }

    #[test]
    fn test_clear_button() {
        let state = loaded(&["V(out)"]).dispatch(Action::SelectTile(TileId::Tile1));
        assert!(!state.clear_button_enabled());

        let state = state
            .dispatch(Action::SelectSignal("V(out)".into()))
            .dispatch(Action::AddSignalToActiveTile);
        assert!(state.clear_button_enabled());

        let state = state.dispatch(Action::ClearActiveTile);
        assert!(!state.clear_button_enabled());
        assert!(state.tiles().assignment(TileId::Tile1).is_none());
    }

    #[test]
    fn test_render_tile_migrates_legacy() {
        let state = loaded(&["V(out)"]);
        let state = AppState {
            tiles: TileConfiguration::from_assignments([(
                TileId::Tile4,
                TileAssignment::from("V(out)"),
            )]),
            ..state
        };

        let (next, spec) = state.render_tile(TileId::Tile4);
        assert_eq!(spec.series.len(), 1);
        assert!(state.tiles().assignment(TileId::Tile4).unwrap().is_legacy());
        assert_eq!(
            next.tiles().assignment(TileId::Tile4),
            Some(&TileAssignment::List(vec!["V(out)".into()]))
        );
    }
}
