//! Signal classification by SPICE naming convention

use serde::{Deserialize, Serialize};

/// Semantic type of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Voltage,
    Current,
    Power,
    Unknown,
}

impl SignalType {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalType::Voltage => "voltage",
            SignalType::Current => "current",
            SignalType::Power => "power",
            SignalType::Unknown => "unknown",
        }
    }

    /// Y-axis label for a tile showing only this type
    pub fn unit_label(self) -> &'static str {
        match self {
            SignalType::Voltage => "Voltage (V)",
            SignalType::Current => "Current (A)",
            SignalType::Power => "Power (W)",
            SignalType::Unknown => "Amplitude",
        }
    }

    /// Badge color used in the signal list
    pub fn badge_color(self) -> &'static str {
        match self {
            SignalType::Voltage => "#28a745",
            SignalType::Current => "#dc3545",
            SignalType::Power => "#ffc107",
            SignalType::Unknown => "#6c757d",
        }
    }
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a signal by its `v(`, `i(` or `p(` prefix, ignoring case.
pub fn classify(name: &str) -> SignalType {
    match name.as_bytes() {
        [kind, b'(', ..] => match kind.to_ascii_lowercase() {
            b'v' => SignalType::Voltage,
            b'i' => SignalType::Current,
            b'p' => SignalType::Power,
            _ => SignalType::Unknown,
        },
        _ => SignalType::Unknown,
    }
}

/// Node or device inside the parentheses, e.g. `out` for `V(out)`.
/// Names without parentheses are returned whole.
pub fn node_name(name: &str) -> &str {
    name.find('(')
        .and_then(|open| {
            let inner = &name[open + 1..];
            inner.find(')').map(|close| &inner[..close])
        })
        .unwrap_or(name)
}

/// Display information for one entry of the signal list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalInfo {
    pub name: String,
    pub signal_type: SignalType,
    pub node: String,
}

pub fn signal_info<'a, I>(names: I) -> Vec<SignalInfo>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .map(|name| SignalInfo {
            name: name.to_string(),
            signal_type: classify(name),
            node: node_name(name).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_case_insensitive() {
        assert_eq!(classify("v(out)"), SignalType::Voltage);
        assert_eq!(classify("V(OUT)"), SignalType::Voltage);
        assert_eq!(classify("I(R1)"), SignalType::Current);
        assert_eq!(classify("i(vdd)"), SignalType::Current);
        assert_eq!(classify("P(load)"), SignalType::Power);
        assert_eq!(classify("x(foo)"), SignalType::Unknown);
    }

    #[test]
    fn test_classify_needs_parenthesis() {
        assert_eq!(classify("vout"), SignalType::Unknown);
        assert_eq!(classify("time"), SignalType::Unknown);
        assert_eq!(classify("v"), SignalType::Unknown);
        assert_eq!(classify(""), SignalType::Unknown);
        assert_eq!(classify("é(x)"), SignalType::Unknown);
    }

    #[test]
    fn test_node_name() {
        assert_eq!(node_name("V(out)"), "out");
        assert_eq!(node_name("I(R1)"), "R1");
        assert_eq!(node_name("frequency"), "frequency");
        assert_eq!(node_name("v(broken"), "v(broken");
    }

    #[test]
    fn test_signal_info() {
        let info = signal_info(["V(out)", "I(R1)"]);
        assert_eq!(info[0].signal_type, SignalType::Voltage);
        assert_eq!(info[1].node, "R1");
        assert_eq!(SignalType::Current.unit_label(), "Current (A)");
    }
}
