//! WebAssembly bindings for the WaveDash tile session
//!
//! This crate owns one session value per `WaveDashSession` object and
//! forwards browser events to the core reducers. Render specs come back as
//! plain JavaScript objects ready for a charting library.
//!
//! # Usage
//!
//! ```javascript
//! import init, { WaveDashSession, initLogging } from '@wavedash/wavedash-wasm';
//!
//! await init();
//! initLogging();
//!
//! const session = new WaveDashSession();
//! const status = session.upload(dataUrl, file.name);
//! session.selectTile('plot-tile-1');
//! session.selectSignal('V(out)');
//! session.addSignal();
//! const spec = session.renderTile('plot-tile-1');
//! Plotly.react(div, spec.series.map(s => ({ x: s.x, y: s.y, name: s.name })));
//! ```

use js_sys::{Float64Array, Object, Reflect};
use std::io;
use std::sync::Once;
use tracing::info;
use wasm_bindgen::prelude::*;
use wavedash_core::{upload, Action, AppState, TileId, UploadRequest, WaveDashConfig};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = log)]
    fn console_log(s: &str);
}

// ============================================================================
// Logging
// ============================================================================

/// Line-buffered writer that forwards to `console.log`
struct ConsoleWriter {
    buffer: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            let line = String::from_utf8_lossy(&self.buffer);
            console_log(line.trim_end());
            self.buffer.clear();
        }
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let _ = io::Write::flush(self);
    }
}

static INIT_LOGGING: Once = Once::new();

/// Route core logs to the browser console. `RUST_LOG`-style directives
/// may be passed as `filter`; the default is `info`.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(filter: Option<String>) {
    INIT_LOGGING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_new(filter.as_deref().unwrap_or("info"))
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .without_time()
            .with_writer(|| ConsoleWriter { buffer: Vec::new() })
            .try_init();
        info!("console logging initialized");
    });
}

// ============================================================================
// Session
// ============================================================================

/// One browser session: the uploaded dataset plus the four plot tiles
#[wasm_bindgen]
pub struct WaveDashSession {
    state: AppState,
}

impl Default for WaveDashSession {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WaveDashSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WaveDashSession {
        WaveDashSession {
            state: AppState::new(),
        }
    }

    /// Session with settings given as a JSON string
    #[wasm_bindgen(js_name = withSettings)]
    pub fn with_settings(json: &str) -> Result<WaveDashSession, JsValue> {
        let settings = WaveDashConfig::from_json(json)
            .map_err(|e| JsValue::from_str(&format!("Invalid settings: {}", e)))?;
        Ok(WaveDashSession {
            state: AppState::with_settings(settings),
        })
    }

    /// Handle a finished upload and return the status message
    pub fn upload(&mut self, contents: Option<String>, filename: Option<String>) -> String {
        let request = UploadRequest { contents, filename };
        let result = upload(&request, self.state.settings());
        self.apply(Action::UploadFinished(result));
        self.state.upload_status().message().to_string()
    }

    #[wasm_bindgen(js_name = uploadFailed)]
    pub fn upload_failed(&self) -> bool {
        matches!(
            self.state.upload_status(),
            wavedash_core::UploadStatus::Failed { .. }
        )
    }

    #[wasm_bindgen(js_name = selectTile)]
    pub fn select_tile(&mut self, id: &str) -> Result<(), JsValue> {
        let tile = parse_tile(id)?;
        self.apply(Action::SelectTile(tile));
        Ok(())
    }

    #[wasm_bindgen(js_name = selectSignal)]
    pub fn select_signal(&mut self, name: &str) {
        self.apply(Action::SelectSignal(name.to_string()));
    }

    /// Add the selected signal to the active tile
    #[wasm_bindgen(js_name = addSignal)]
    pub fn add_signal(&mut self) {
        self.apply(Action::AddSignalToActiveTile);
    }

    /// Clear the active tile
    #[wasm_bindgen(js_name = clearTile)]
    pub fn clear_tile(&mut self) {
        self.apply(Action::ClearActiveTile);
    }

    #[wasm_bindgen(getter, js_name = activeTile)]
    pub fn active_tile(&self) -> Option<String> {
        self.state
            .tiles()
            .active_tile()
            .map(|tile| tile.as_str().to_string())
    }

    #[wasm_bindgen(getter, js_name = selectedSignal)]
    pub fn selected_signal(&self) -> Option<String> {
        self.state.tiles().selected_signal().map(str::to_string)
    }

    /// Render spec for one tile as a plain object
    #[wasm_bindgen(js_name = renderTile)]
    pub fn render_tile(&mut self, id: &str) -> Result<JsValue, JsValue> {
        let tile = parse_tile(id)?;
        let (state, spec) = self.state.render_tile(tile);
        self.state = state;
        to_js(&spec)
    }

    /// Classified signals of the current dataset
    #[wasm_bindgen(js_name = signalList)]
    pub fn signal_list(&self) -> Result<JsValue, JsValue> {
        to_js(&self.state.signal_list())
    }

    #[wasm_bindgen(js_name = tileStatus)]
    pub fn tile_status(&self, id: &str) -> Result<String, JsValue> {
        Ok(self.state.tile_status_text(parse_tile(id)?))
    }

    /// `{ enabled, label }` for the plot button
    #[wasm_bindgen(js_name = plotButton)]
    pub fn plot_button(&self) -> Result<JsValue, JsValue> {
        let button = self.state.plot_button();
        let result = Object::new();
        Reflect::set(&result, &"enabled".into(), &button.enabled.into())?;
        Reflect::set(&result, &"label".into(), &button.label.into())?;
        Ok(result.into())
    }

    #[wasm_bindgen(js_name = clearButtonEnabled)]
    pub fn clear_button_enabled(&self) -> bool {
        self.state.clear_button_enabled()
    }

    /// Axis values of the current dataset, if any
    #[wasm_bindgen(js_name = axisValues)]
    pub fn axis_values(&self) -> Option<Float64Array> {
        self.state
            .dataset()
            .map(|ds| Float64Array::from(ds.axis_values()))
    }

    /// Current dataset in its JSON transport form
    #[wasm_bindgen(js_name = datasetJson)]
    pub fn dataset_json(&self) -> Result<Option<String>, JsValue> {
        self.state
            .dataset()
            .map(|ds| ds.to_json())
            .transpose()
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Tile configuration as JSON, for persisting across page loads
    #[wasm_bindgen(js_name = tilesJson)]
    pub fn tiles_json(&self) -> Result<String, JsValue> {
        serde_json_string(self.state.tiles())
    }
}

impl WaveDashSession {
    fn apply(&mut self, action: Action) {
        self.state = self.state.dispatch(action);
    }
}

fn parse_tile(id: &str) -> Result<TileId, JsValue> {
    id.parse::<TileId>()
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn serde_json_string<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
