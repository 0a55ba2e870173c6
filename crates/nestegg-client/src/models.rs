//! Wire types exchanged with the calculation API.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Email/password pair collected from the auth forms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Credentials {
    /// Account email address.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Build a credential pair.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Form body for the login endpoint; the backend expects `username`, not `email`.
#[derive(Debug, Serialize)]
pub(crate) struct LoginForm<'a> {
    pub(crate) username: &'a str,
    pub(crate) password: &'a str,
}

impl<'a> From<&'a Credentials> for LoginForm<'a> {
    fn from(credentials: &'a Credentials) -> Self {
        Self {
            username: &credentials.email,
            password: &credentials.password,
        }
    }
}

/// Successful login response.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    /// Bearer token to persist.
    pub access_token: String,
    /// Refresh token, when the backend issues one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token type (always `bearer` in practice).
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Error document returned by the API for non-success statuses.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ErrorBody {
    /// Either a message or a list of structured validation issues.
    #[serde(default)]
    pub detail: Option<ErrorDetail>,
}

/// Payload of the `detail` field.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    /// Plain message.
    Message(String),
    /// Structured request validation failures.
    Validation(Vec<ValidationIssue>),
    /// Anything else the server chose to send.
    Other(Value),
}

impl ErrorDetail {
    /// Render the detail as one readable line.
    ///
    /// Validation issues are joined as `<loc joined by '.'>: <msg>` separated by `, `.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Message(message) => message.clone(),
            Self::Validation(issues) => issues
                .iter()
                .map(ValidationIssue::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            Self::Other(value) => value.to_string(),
        }
    }
}

/// One entry of a structured validation failure.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ValidationIssue {
    /// Location path of the offending field.
    #[serde(default)]
    pub loc: Vec<LocSegment>,
    /// Validation message.
    pub msg: String,
}

impl Display for ValidationIssue {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let path = self
            .loc
            .iter()
            .map(LocSegment::to_string)
            .collect::<Vec<_>>()
            .join(".");
        write!(formatter, "{path}: {}", self.msg)
    }
}

/// Location segment: a field name or an array index.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LocSegment {
    /// Object key.
    Key(String),
    /// Array index.
    Index(i64),
}

impl Display for LocSegment {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => formatter.write_str(key),
            Self::Index(index) => write!(formatter, "{index}"),
        }
    }
}

/// One persisted calculation, as returned by the history endpoint.
///
/// Only `investment_type` is strict. An odd `id` or `created_at` degrades that record alone.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CalculationRecord {
    /// Server-side identifier, kept as sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Creation timestamp; `None` when absent or unparseable.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Calculation variant that produced the record.
    pub investment_type: String,
    /// Original request document.
    #[serde(default)]
    pub payload: Value,
    /// Computed result document.
    #[serde(default)]
    pub result: Value,
}

impl CalculationRecord {
    /// `result.totalTransactionAmount`, when present and numeric.
    #[must_use]
    pub fn total_transaction_amount(&self) -> Option<f64> {
        self.result
            .get("totalTransactionAmount")
            .and_then(Value::as_f64)
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let parsed = raw.as_str().and_then(parse_timestamp);
    if parsed.is_none() && !raw.is_null() {
        tracing::debug!(created_at = %raw, "unrecognised record timestamp");
    }
    Ok(parsed)
}

/// Parse a timestamp in RFC 3339, naive ISO-8601 or date-only form. Naive values are UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}
