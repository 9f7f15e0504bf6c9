//! Upload pipeline
//!
//! Validates an upload request, decodes the base64 payload and hands the
//! bytes to a decoder factory. Rejections happen before any decoding.

use crate::config::WaveDashConfig;
use crate::decoder::DecoderFactory;
use crate::normalizer::parse_bytes;
use crate::types::{UploadError, WaveformDataset};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// File payload as delivered by the browser upload widget
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Data URL (`data:<mime>;base64,<payload>`) or bare base64
    pub contents: Option<String>,
    pub filename: Option<String>,
}

impl UploadRequest {
    pub fn new(contents: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
            filename: Some(filename.into()),
        }
    }

    /// Build a request from raw file bytes, encoding them the way a
    /// browser would.
    pub fn from_bytes(bytes: &[u8], filename: impl Into<String>) -> Self {
        Self::new(
            format!("data:application/octet-stream;base64,{}", STANDARD.encode(bytes)),
            filename,
        )
    }
}

/// Accepted upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub dataset: WaveformDataset,
    pub filename: String,
    pub size_bytes: usize,
}

impl UploadOutcome {
    /// Success line shown under the upload widget
    pub fn feedback(&self) -> String {
        format!(
            "✓ Uploaded: {} ({})",
            self.filename,
            format_size(self.size_bytes)
        )
    }
}

/// Failure line shown under the upload widget
pub fn error_feedback(error: &UploadError) -> String {
    format!("✗ Error: {}", error)
}

/// Human readable size: `N B`, `x.y KB` or `x.y MB`
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    match bytes {
        n if n < KB => format!("{} B", n),
        n if n < MB => format!("{:.1} KB", n as f64 / KB as f64),
        n => format!("{:.1} MB", n as f64 / MB as f64),
    }
}

/// Strip an optional data URL prefix and decode the base64 payload
pub fn decode_payload(contents: &str) -> Result<Vec<u8>, UploadError> {
    let payload = match contents.split_once(',') {
        Some((header, payload)) if header.ends_with(";base64") => payload,
        Some(_) => {
            return Err(UploadError::Rejected(
                "Uploaded data is not base64 encoded".to_string(),
            ))
        }
        None => contents,
    };

    STANDARD
        .decode(payload.trim())
        .map_err(|e| UploadError::Rejected(format!("Invalid file encoding: {}", e)))
}

/// Validate, decode and normalize one upload
#[instrument(skip_all, fields(filename = request.filename.as_deref().unwrap_or("")))]
pub fn parse_upload(
    request: &UploadRequest,
    settings: &WaveDashConfig,
    factory: &dyn DecoderFactory,
) -> Result<UploadOutcome, UploadError> {
    let result = validate_and_parse(request, settings, factory);
    match &result {
        Ok(outcome) => info!(
            size = outcome.size_bytes,
            signals = outcome.dataset.signals().len(),
            "Upload accepted"
        ),
        Err(e) => warn!(error = %e, "Upload failed"),
    }
    result
}

fn validate_and_parse(
    request: &UploadRequest,
    settings: &WaveDashConfig,
    factory: &dyn DecoderFactory,
) -> Result<UploadOutcome, UploadError> {
    let contents = request
        .contents
        .as_deref()
        .ok_or_else(|| UploadError::Rejected("No file uploaded".to_string()))?;
    let filename = request
        .filename
        .as_deref()
        .ok_or_else(|| UploadError::Rejected("No filename provided".to_string()))?;

    if !settings.accepts_filename(filename) {
        return Err(UploadError::Rejected(format!(
            "Please upload a {} file",
            settings.accepted_extension
        )));
    }

    let bytes = decode_payload(contents)?;
    if bytes.is_empty() {
        return Err(UploadError::Rejected("Uploaded file is empty".to_string()));
    }

    let dataset = parse_bytes(&bytes, factory)?;
    Ok(UploadOutcome {
        dataset,
        filename: filename.to_string(),
        size_bytes: bytes.len(),
    })
}
