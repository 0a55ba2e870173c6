//! Calculation payload helpers and the calculation variant selector.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde_json::{Value, json};

use crate::error::{ClientError, ClientResult};

/// Server-defined calculation variants, selected by endpoint path segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CalculationKind {
    /// National Pension Scheme returns.
    Nps,
    /// Index fund returns.
    Index,
}

impl CalculationKind {
    /// Every variant the backend exposes.
    #[must_use]
    pub const fn all() -> [Self; 2] {
        [Self::Nps, Self::Index]
    }

    /// Lower-case identifier used in paths and history records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nps => "nps",
            Self::Index => "index",
        }
    }

    /// Endpoint path below the API prefix.
    #[must_use]
    pub fn endpoint_path(self) -> String {
        format!("/returns:{}", self.as_str())
    }
}

impl Display for CalculationKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for CalculationKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nps" => Ok(Self::Nps),
            "index" => Ok(Self::Index),
            other => Err(format!("unknown calculation type '{other}' (expected nps or index)")),
        }
    }
}

/// Template document the payload editor starts with.
#[must_use]
pub fn default_payload() -> Value {
    json!({
        "age": 29,
        "wage": 50000,
        "inflation": 5.5,
        "q": [{"fixed": 0, "start": "2023-07-01 00:00:00", "end": "2023-07-31 23:59:59"}],
        "p": [{"extra": 25, "start": "2023-10-01 08:00:00", "end": "2023-12-31 19:59:59"}],
        "k": [{"start": "2023-01-01 00:00:00", "end": "2023-12-31 23:59:59"}],
        "transactions": [
            {"date": "2023-02-28 15:49:20", "amount": 375},
            {"date": "2023-07-01 21:59:00", "amount": 620},
            {"date": "2023-10-12 20:15:30", "amount": 250}
        ]
    })
}

/// The default template, pretty-printed with two-space indentation.
#[must_use]
pub fn default_payload_text() -> String {
    pretty_json(&default_payload())
}

/// Parse editor content. The document is opaque and forwarded unchanged.
///
/// # Errors
///
/// Returns [`ClientError::InvalidJson`] when the text is not a JSON document.
pub fn parse_payload(text: &str) -> ClientResult<Value> {
    serde_json::from_str(text).map_err(|source| ClientError::InvalidJson { source })
}

/// Pretty-print a JSON value; falls back to compact output if pretty printing fails.
#[must_use]
pub fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in CalculationKind::all() {
            assert_eq!(kind.as_str().parse::<CalculationKind>(), Ok(kind));
        }
        assert_eq!("NPS".parse::<CalculationKind>(), Ok(CalculationKind::Nps));
        assert!("bonds".parse::<CalculationKind>().is_err());
    }

    #[test]
    fn endpoint_path_uses_colon_syntax() {
        assert_eq!(CalculationKind::Nps.endpoint_path(), "/returns:nps");
        assert_eq!(CalculationKind::Index.endpoint_path(), "/returns:index");
    }

    #[test]
    fn default_template_parses_back() -> ClientResult<()> {
        let parsed = parse_payload(&default_payload_text())?;
        assert_eq!(parsed, default_payload());
        assert_eq!(parsed["transactions"].as_array().map(Vec::len), Some(3));
        Ok(())
    }

    #[test]
    fn parse_payload_rejects_malformed_text() {
        assert!(matches!(
            parse_payload("{\"age\": 29,"),
            Err(ClientError::InvalidJson { .. })
        ));
        assert!(parse_payload("").is_err());
    }

    #[test]
    fn parse_payload_keeps_unknown_fields() -> ClientResult<()> {
        let parsed = parse_payload(r#"{"age": 40, "extra": [1, 2]}"#)?;
        assert_eq!(parsed["extra"], json!([1, 2]));
        Ok(())
    }
}
