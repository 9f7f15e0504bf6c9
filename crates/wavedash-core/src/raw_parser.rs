//! SPICE3/ngspice raw file decoder
//!
//! Reads both ASCII and binary raw files from memory with auto-detection.
//! A file may hold several consecutive plots; each one is exposed as a step.

use crate::decoder::{DecoderFactory, RawDecoder};
use crate::types::{DecodeError, PlotInfo, StepId, VectorData, UNKNOWN_METADATA};
use byteorder::{LittleEndian, ReadBytesExt};
use num_complex::Complex64;
use std::io::{BufRead, Cursor, Read};
use tracing::{debug, info, instrument};

/// Raw file data section type
#[derive(Debug, Clone, Copy, PartialEq)]
enum RawFormat {
    Binary,
    Ascii,
}

/// Parsed header information for one plot
#[derive(Debug, Default)]
struct RawHeader {
    title: String,
    date: String,
    plotname: String,
    num_variables: usize,
    num_points: usize,
    names: Vec<String>,
    is_complex: bool,
}

/// One plot of a raw file
#[derive(Debug)]
struct RawPlot {
    header: RawHeader,
    vectors: Vec<VectorData>,
}

impl RawPlot {
    fn vector(&self, name: &str) -> Option<&VectorData> {
        self.header
            .names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.vectors.get(i))
    }
}

/// A fully decoded SPICE3/ngspice raw file
#[derive(Debug)]
pub struct SpiceRawFile {
    plots: Vec<RawPlot>,
}

impl SpiceRawFile {
    /// Decode a raw file held in memory
    #[instrument(skip_all, fields(bytes = bytes.len()))]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Format("File is empty".into()));
        }

        let mut reader = Cursor::new(bytes);
        let mut plots = Vec::new();

        while skip_blank(&mut reader)? {
            let (header, format) = parse_header(&mut reader)?;
            debug!(
                plot = %header.plotname,
                format = ?format,
                variables = header.num_variables,
                points = header.num_points,
                complex = header.is_complex,
                "raw plot header"
            );

            let remaining = bytes.len().saturating_sub(reader.position() as usize);
            let vectors = match format {
                RawFormat::Binary => parse_binary_data(&mut reader, &header, remaining)?,
                RawFormat::Ascii => parse_ascii_data(&mut reader, &header, remaining)?,
            };
            plots.push(RawPlot { header, vectors });
        }

        if plots.is_empty() {
            return Err(DecodeError::Format("No plots found in raw file".into()));
        }

        info!(plots = plots.len(), "Raw file decoded");
        Ok(Self { plots })
    }

    /// Number of plots (steps) in the file
    pub fn plot_count(&self) -> usize {
        self.plots.len()
    }

    fn plot(&self, step: StepId) -> Result<&RawPlot, DecodeError> {
        self.plots
            .get(step.0)
            .ok_or(DecodeError::StepOutOfRange(step))
    }
}

impl RawDecoder for SpiceRawFile {
    fn trace_names(&self) -> Vec<String> {
        self.plots
            .first()
            .map(|p| p.header.names.clone())
            .unwrap_or_default()
    }

    fn steps(&self) -> Vec<StepId> {
        (0..self.plots.len()).map(StepId).collect()
    }

    fn axis(&self, step: StepId) -> Result<Vec<f64>, DecodeError> {
        let plot = self.plot(step)?;
        plot.vectors
            .first()
            .cloned()
            .map(VectorData::into_real_parts)
            .ok_or_else(|| DecodeError::Format("Plot has no variables".into()))
    }

    fn trace_values(&self, name: &str, step: StepId) -> Result<VectorData, DecodeError> {
        self.plot(step)?
            .vector(name)
            .cloned()
            .ok_or_else(|| DecodeError::TraceNotFound(name.to_string()))
    }

    fn plot_info(&self) -> PlotInfo {
        let header = match self.plots.first() {
            Some(plot) => &plot.header,
            None => return PlotInfo::default(),
        };
        PlotInfo {
            title: or_unknown(&header.title),
            date: or_unknown(&header.date),
            plot_name: or_unknown(&header.plotname),
        }
    }
}

/// Opens [`SpiceRawFile`] decoders
#[derive(Debug, Clone, Copy, Default)]
pub struct SpiceRawDecoderFactory;

impl DecoderFactory for SpiceRawDecoderFactory {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn RawDecoder>, DecodeError> {
        Ok(Box::new(SpiceRawFile::from_bytes(bytes)?))
    }
}

fn or_unknown(s: &str) -> String {
    if s.is_empty() {
        UNKNOWN_METADATA.to_string()
    } else {
        s.to_string()
    }
}

/// Skip whitespace between plots. Returns false at end of input.
fn skip_blank(reader: &mut Cursor<&[u8]>) -> Result<bool, DecodeError> {
    loop {
        let next = reader.fill_buf()?.first().copied();
        match next {
            None => return Ok(false),
            Some(b) if b.is_ascii_whitespace() => reader.consume(1),
            Some(_) => return Ok(true),
        }
    }
}

fn parse_header<R: BufRead>(reader: &mut R) -> Result<(RawHeader, RawFormat), DecodeError> {
    let mut header = RawHeader::default();
    let mut line = String::new();
    let mut in_variables = false;

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            break;
        }

        let trimmed = line.trim();

        // Check for data section markers
        if trimmed == "Binary:" || trimmed == "Values:" {
            let format = if trimmed == "Binary:" {
                RawFormat::Binary
            } else {
                RawFormat::Ascii
            };
            if header.names.len() != header.num_variables {
                return Err(DecodeError::Parse(format!(
                    "Header declares {} variables, found {}",
                    header.num_variables,
                    header.names.len()
                )));
            }
            if header.num_variables == 0 {
                return Err(DecodeError::Format("Plot has no variables".into()));
            }
            return Ok((header, format));
        }

        // Parse header fields
        if let Some(value) = trimmed.strip_prefix("Title:") {
            header.title = value.trim().to_string();
            in_variables = false;
        } else if let Some(value) = trimmed.strip_prefix("Date:") {
            header.date = value.trim().to_string();
            in_variables = false;
        } else if let Some(value) = trimmed.strip_prefix("Plotname:") {
            header.plotname = value.trim().to_string();
            in_variables = false;
        } else if let Some(value) = trimmed.strip_prefix("Flags:") {
            header.is_complex = value.split_whitespace().any(|f| f == "complex");
            in_variables = false;
        } else if let Some(value) = trimmed.strip_prefix("No. Variables:") {
            header.num_variables = parse_count(value, "No. Variables")?;
            in_variables = false;
        } else if let Some(value) = trimmed.strip_prefix("No. Points:") {
            header.num_points = parse_count(value, "No. Points")?;
            in_variables = false;
        } else if trimmed.starts_with("Variables:") {
            in_variables = true;
        } else if in_variables && !trimmed.is_empty() {
            // Variable line: "index name type [params]"
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            if parts.len() < 3 {
                return Err(DecodeError::Parse(format!(
                    "Malformed variable line: {}",
                    trimmed
                )));
            }
            header.names.push(parts[1].to_string());
            if header.names.len() >= header.num_variables {
                in_variables = false;
            }
        }
    }

    Err(DecodeError::Parse(
        "No data section found in raw file".to_string(),
    ))
}

fn parse_count(value: &str, field: &str) -> Result<usize, DecodeError> {
    value
        .trim()
        .parse()
        .map_err(|_| DecodeError::Parse(format!("Invalid {}: {}", field, value.trim())))
}

fn with_capacities<T>(count: usize, capacity: usize) -> Vec<Vec<T>> {
    (0..count).map(|_| Vec::with_capacity(capacity)).collect()
}

/// `remaining` is the number of unread bytes after the `Binary:` marker
fn parse_binary_data<R: Read>(
    reader: &mut R,
    header: &RawHeader,
    remaining: usize,
) -> Result<Vec<VectorData>, DecodeError> {
    let num_vars = header.num_variables;
    let num_points = header.num_points;

    // Complex data: every value is 16 bytes (two f64)
    let value_size = if header.is_complex { 16 } else { 8 };
    let needed = num_vars
        .checked_mul(num_points)
        .and_then(|values| values.checked_mul(value_size));
    match needed {
        Some(needed) if needed <= remaining => {}
        _ => {
            return Err(DecodeError::Format(format!(
                "Header declares {} points of {} variables, data section holds {} bytes",
                num_points, num_vars, remaining
            )))
        }
    }

    if header.is_complex {
        let mut vectors: Vec<Vec<Complex64>> = with_capacities(num_vars, num_points);

        for _point in 0..num_points {
            for vector in vectors.iter_mut() {
                let re = reader.read_f64::<LittleEndian>()?;
                let im = reader.read_f64::<LittleEndian>()?;
                vector.push(Complex64::new(re, im));
            }
        }

        Ok(vectors.into_iter().map(VectorData::Complex).collect())
    } else {
        let mut vectors: Vec<Vec<f64>> = with_capacities(num_vars, num_points);

        for _point in 0..num_points {
            for vector in vectors.iter_mut() {
                vector.push(reader.read_f64::<LittleEndian>()?);
            }
        }

        Ok(vectors.into_iter().map(VectorData::Real).collect())
    }
}

/// Next non-empty line, trimmed
fn next_value_line<R: BufRead>(reader: &mut R, line: &mut String) -> Result<(), DecodeError> {
    loop {
        line.clear();
        if reader.read_line(line)? == 0 {
            return Err(DecodeError::Parse(
                "Unexpected end of ASCII data".to_string(),
            ));
        }
        if !line.trim().is_empty() {
            return Ok(());
        }
    }
}

fn parse_ascii_data<R: BufRead>(
    reader: &mut R,
    header: &RawHeader,
    remaining: usize,
) -> Result<Vec<VectorData>, DecodeError> {
    let num_vars = header.num_variables;
    let num_points = header.num_points;

    // Every value takes at least two bytes, so the declared point count is
    // only trusted up to what the remaining text can hold.
    let capacity = num_points.min(remaining / (2 * num_vars.max(1)));

    let mut real: Vec<Vec<f64>> = Vec::new();
    let mut complex: Vec<Vec<Complex64>> = Vec::new();
    if header.is_complex {
        complex = with_capacities(num_vars, capacity);
    } else {
        real = with_capacities(num_vars, capacity);
    }

    let mut line = String::new();
    for point in 0..num_points {
        for var_idx in 0..num_vars {
            next_value_line(reader, &mut line)?;
            let parts: Vec<&str> = line.split_whitespace().collect();

            // First variable of a point is prefixed with the point index
            let token = if var_idx == 0 {
                match parts.as_slice() {
                    [_index, value, ..] => *value,
                    _ => {
                        return Err(DecodeError::Parse(format!(
                            "Missing point index at point {}",
                            point
                        )))
                    }
                }
            } else {
                parts.last().copied().unwrap_or_default()
            };

            if header.is_complex {
                let (re, im) = parse_complex_value(token)?;
                complex[var_idx].push(Complex64::new(re, im));
            } else {
                real[var_idx].push(parse_real_value(token)?);
            }
        }
    }

    if header.is_complex {
        Ok(complex.into_iter().map(VectorData::Complex).collect())
    } else {
        Ok(real.into_iter().map(VectorData::Real).collect())
    }
}

fn parse_real_value(s: &str) -> Result<f64, DecodeError> {
    s.trim()
        .parse()
        .map_err(|_| DecodeError::Parse(format!("Invalid value: {}", s)))
}

fn parse_complex_value(s: &str) -> Result<(f64, f64), DecodeError> {
    // Handle formats: "1.0,2.0" or "(1.0,2.0)" or a bare real
    let s = s.trim_matches(|c| c == '(' || c == ')');

    match s.find(',') {
        Some(pos) => Ok((parse_real_value(&s[..pos])?, parse_real_value(&s[pos + 1..])?)),
        None => Ok((parse_real_value(s)?, 0.0)),
    }
}
