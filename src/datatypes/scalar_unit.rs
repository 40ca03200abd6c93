//! Scalar-unit parsing and normalisation (`10 GB`, `2 m`, `1.5 GHz`).
//!
//! Values are normalised into the family's default unit before any constraint
//! comparison: bytes for sizes, milliseconds for times, gigahertz for
//! frequencies and bits per second for bitrates.

use crate::issues::{IssueCode, ValidationIssue};
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;

static SCALAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([0-9]+(?:\.[0-9]*)?(?:[eE][+-]?[0-9]+)?|\.[0-9]+)\s*([A-Za-z]+)\s*$")
        .expect("BUG: scalar-unit regex must compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarUnitKind {
    Size,
    Time,
    Frequency,
    Bitrate,
}

const SIZE_UNITS: &[(&str, f64)] = &[
    ("B", 1.0),
    ("kB", 1_000.0),
    ("KiB", 1_024.0),
    ("MB", 1_000_000.0),
    ("MiB", 1_048_576.0),
    ("GB", 1_000_000_000.0),
    ("GiB", 1_073_741_824.0),
    ("TB", 1_000_000_000_000.0),
    ("TiB", 1_099_511_627_776.0),
];

const TIME_UNITS: &[(&str, f64)] = &[
    ("d", 86_400.0),
    ("h", 3_600.0),
    ("m", 60.0),
    ("s", 1.0),
    ("ms", 0.001),
    ("us", 0.000_001),
    ("ns", 0.000_000_001),
];

const FREQUENCY_UNITS: &[(&str, f64)] = &[
    ("Hz", 1.0),
    ("kHz", 1_000.0),
    ("MHz", 1_000_000.0),
    ("GHz", 1_000_000_000.0),
];

const BITRATE_UNITS: &[(&str, f64)] = &[
    ("bps", 1.0),
    ("Kbps", 1_000.0),
    ("Kibps", 1_024.0),
    ("Mbps", 1_000_000.0),
    ("Mibps", 1_048_576.0),
    ("Gbps", 1_000_000_000.0),
    ("Gibps", 1_073_741_824.0),
    ("Tbps", 1_000_000_000_000.0),
    ("Tibps", 1_099_511_627_776.0),
    ("Bps", 8.0),
    ("KBps", 8_000.0),
    ("KiBps", 8_192.0),
    ("MBps", 8_000_000.0),
    ("MiBps", 8_388_608.0),
    ("GBps", 8_000_000_000.0),
    ("GiBps", 8_589_934_592.0),
    ("TBps", 8_000_000_000_000.0),
    ("TiBps", 8_796_093_022_208.0),
];

impl ScalarUnitKind {
    /// Maps a TOSCA property type name to its scalar-unit family.
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        match type_name {
            "scalar-unit.size" => Some(Self::Size),
            "scalar-unit.time" => Some(Self::Time),
            "scalar-unit.frequency" => Some(Self::Frequency),
            "scalar-unit.bitrate" => Some(Self::Bitrate),
            _ => None,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            Self::Size => "scalar-unit.size",
            Self::Time => "scalar-unit.time",
            Self::Frequency => "scalar-unit.frequency",
            Self::Bitrate => "scalar-unit.bitrate",
        }
    }

    fn units(self) -> &'static [(&'static str, f64)] {
        match self {
            Self::Size => SIZE_UNITS,
            Self::Time => TIME_UNITS,
            Self::Frequency => FREQUENCY_UNITS,
            Self::Bitrate => BITRATE_UNITS,
        }
    }

    /// The unit every value of this family is normalised into.
    pub fn default_unit(self) -> &'static str {
        match self {
            Self::Size => "B",
            Self::Time => "ms",
            Self::Frequency => "GHz",
            Self::Bitrate => "bps",
        }
    }

    fn factor(self, unit: &str) -> Option<f64> {
        self.units().iter().find(|(u, _)| *u == unit).map(|(_, f)| *f)
    }

    /// Resolves a unit spelling. Exact matches win; otherwise a unique
    /// case-insensitive match is accepted (with a warning).
    fn canonical_unit(self, unit: &str) -> Option<&'static str> {
        let units = self.units();
        if let Some((u, _)) = units.iter().find(|(u, _)| *u == unit) {
            return Some(u);
        }
        let mut matches = units.iter().filter(|(u, _)| u.eq_ignore_ascii_case(unit));
        match (matches.next(), matches.next()) {
            (Some((u, _)), None) => {
                log::warn!(
                    "unit \"{}\" does not follow scalar-unit spelling; using \"{}\"",
                    unit,
                    u
                );
                Some(u)
            }
            _ => None,
        }
    }
}

/// A parsed scalar-unit value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarUnit {
    pub kind: ScalarUnitKind,
    pub magnitude: f64,
    pub unit: &'static str,
}

impl ScalarUnit {
    pub fn parse(kind: ScalarUnitKind, text: &str) -> Result<Self, ValidationIssue> {
        let invalid = || {
            ValidationIssue::new(
                IssueCode::InvalidScalarUnit,
                format!("\"{}\" is not a valid scalar-unit value of type \"{}\".", text, kind.type_name()),
            )
        };
        let caps = SCALAR_RE.captures(text).ok_or_else(invalid)?;
        let magnitude: f64 = caps[1].parse().map_err(|_| invalid())?;
        let unit = kind.canonical_unit(&caps[2]).ok_or_else(invalid)?;
        Ok(Self { kind, magnitude, unit })
    }

    /// The magnitude expressed in `unit` (which must belong to the same family).
    pub fn in_unit(&self, unit: &str) -> Option<f64> {
        let from = self.kind.factor(self.unit)?;
        let to = self.kind.factor(unit)?;
        Some(self.magnitude * from / to)
    }

    /// The magnitude in the family's default unit.
    pub fn normalized(&self) -> f64 {
        // Both units come from the family table, so the lookup cannot miss.
        self.in_unit(self.kind.default_unit()).unwrap_or(self.magnitude)
    }
}

/// Normalises a scalar-unit property value into the family's default unit.
///
/// Plain numbers are taken to already be in the default unit.
pub fn normalize(kind: ScalarUnitKind, value: &Value) -> Result<f64, ValidationIssue> {
    match value {
        Value::String(s) => ScalarUnit::parse(kind, s).map(|su| su.normalized()),
        Value::Int(_) | Value::Float(_) => Ok(value.as_f64().unwrap_or_default()),
        other => Err(ValidationIssue::new(
            IssueCode::InvalidScalarUnit,
            format!("\"{}\" is not a valid scalar-unit value of type \"{}\".", other, kind.type_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ScalarUnitKind::Size, "10 GB", 10_000_000_000.0)]
    #[case(ScalarUnitKind::Size, "1 KiB", 1_024.0)]
    #[case(ScalarUnitKind::Size, "512MB", 512_000_000.0)]
    #[case(ScalarUnitKind::Size, "10 gb", 10_000_000_000.0)] // case-insensitive fallback
    #[case(ScalarUnitKind::Time, "2 m", 120_000.0)]
    #[case(ScalarUnitKind::Time, "1.5 s", 1_500.0)]
    #[case(ScalarUnitKind::Frequency, "800 MHz", 0.8)]
    #[case(ScalarUnitKind::Bitrate, "1 KBps", 8_000.0)]
    #[case(ScalarUnitKind::Bitrate, "1 Kbps", 1_000.0)]
    fn test_normalization(#[case] kind: ScalarUnitKind, #[case] text: &str, #[case] expected: f64) {
        let got = normalize(kind, &Value::from(text)).unwrap();
        assert!((got - expected).abs() < 1e-9, "{} -> {}", text, got);
    }

    #[rstest]
    #[case(ScalarUnitKind::Size, "ten GB")]
    #[case(ScalarUnitKind::Size, "10 parsecs")]
    #[case(ScalarUnitKind::Size, "10")]
    #[case(ScalarUnitKind::Time, "5 GHz")]
    #[case(ScalarUnitKind::Bitrate, "1 kbps")] // ambiguous between Kbps and KBps once case is ignored
    fn test_invalid_scalars(#[case] kind: ScalarUnitKind, #[case] text: &str) {
        let err = ScalarUnit::parse(kind, text).unwrap_err();
        assert_eq!(err.code, IssueCode::InvalidScalarUnit);
    }

    #[test]
    fn test_unit_conversion() {
        let su = ScalarUnit::parse(ScalarUnitKind::Size, "2 GiB").unwrap();
        assert_eq!(su.in_unit("MiB"), Some(2048.0));
        assert_eq!(su.in_unit("parsec"), None);
    }
}
