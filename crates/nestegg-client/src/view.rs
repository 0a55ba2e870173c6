//! Plain-data view model the front end renders.
//!
//! # Design
//! - No I/O here: every field is a value a renderer can draw and a test can compare.
//! - Exactly one alert is visible at a time; raising a new one replaces the old.
//! - History rows are derived from the record cache in one step so row `i` always
//!   describes cached record `i`.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::models::CalculationRecord;
use crate::payload::default_payload_text;

/// Placeholder shown while the history request is in flight.
pub const HISTORY_LOADING: &str = "Loading...";
/// Placeholder shown when the user has no stored calculations.
pub const HISTORY_EMPTY: &str = "No calculations found.";
/// Placeholder shown when the history request failed.
pub const HISTORY_FAILED: &str = "Failed to load history.";
/// Date text for a record whose timestamp could not be read.
pub const CREATED_UNKNOWN: &str = "unknown";
/// Currency prefix for totals.
pub const CURRENCY_PREFIX: &str = "₹";

/// Top-level panel selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    /// Login/register forms.
    Auth,
    /// Calculator and history, with the logout control.
    Home,
}

/// Which auth form is visible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthTab {
    /// Login form.
    #[default]
    Login,
    /// Registration form.
    Register,
}

impl AuthTab {
    /// Stable lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
        }
    }
}

/// Visual tone of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertLevel {
    /// Positive confirmation.
    Success,
    /// Failure of any kind.
    Danger,
}

/// Transient notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    /// Count of notifications raised so far, including this one.
    pub serial: u64,
    /// Tone of the notification.
    pub level: AlertLevel,
    /// Text shown to the user.
    pub message: String,
    /// When the notification was raised.
    pub raised_at: Instant,
    /// How long it stays visible.
    pub ttl: Duration,
}

impl Alert {
    /// Whether the notification should have been dismissed by `now`.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) >= self.ttl
    }
}

/// Badge colour for an investment type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BadgeTone {
    /// Used for `nps`.
    Success,
    /// Used for every other type.
    Warning,
}

/// Investment-type badge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Badge {
    /// Upper-cased type name.
    pub label: String,
    /// Badge colour.
    pub tone: BadgeTone,
}

impl Badge {
    /// Badge for a record's `investment_type`.
    #[must_use]
    pub fn for_type(investment_type: &str) -> Self {
        let tone = if investment_type == "nps" {
            BadgeTone::Success
        } else {
            BadgeTone::Warning
        };
        Self {
            label: investment_type.to_uppercase(),
            tone,
        }
    }
}

/// One rendered history row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryRow {
    /// Position of the record in the cache; the "view" action key.
    pub index: usize,
    /// Local date and time of creation.
    pub created: String,
    /// Investment-type badge.
    pub badge: Badge,
    /// Total transaction amount with currency prefix.
    pub total: String,
}

impl HistoryRow {
    /// Render a cached record at `index` using the given time zone.
    #[must_use]
    pub fn from_record<Tz: TimeZone>(index: usize, record: &CalculationRecord, zone: &Tz) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            index,
            created: record
                .created_at
                .as_ref()
                .map_or_else(|| CREATED_UNKNOWN.to_string(), |ts| format_created(ts, zone)),
            badge: Badge::for_type(&record.investment_type),
            total: format_total(record.total_transaction_amount()),
        }
    }
}

/// History panel state; re-entered fresh on every fetch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HistoryView {
    /// Request in flight (also the initial state).
    #[default]
    Loading,
    /// No records.
    Empty,
    /// One row per cached record.
    Populated(Vec<HistoryRow>),
    /// The request failed.
    Failed,
}

impl HistoryView {
    /// Build the panel from a freshly fetched record list.
    #[must_use]
    pub fn from_records(records: &[CalculationRecord]) -> Self {
        if records.is_empty() {
            return Self::Empty;
        }
        Self::Populated(
            records
                .iter()
                .enumerate()
                .map(|(index, record)| HistoryRow::from_record(index, record, &Local))
                .collect(),
        )
    }

    /// Placeholder text for the non-populated states.
    #[must_use]
    pub const fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Loading => Some(HISTORY_LOADING),
            Self::Empty => Some(HISTORY_EMPTY),
            Self::Failed => Some(HISTORY_FAILED),
            Self::Populated(_) => None,
        }
    }
}

/// Detail modal contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetailModal {
    /// Position of the record being shown.
    pub index: usize,
    /// Pretty-printed original payload.
    pub payload: String,
    /// Pretty-printed result.
    pub result: String,
}

/// Everything the front end draws.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewState {
    /// Visible top-level panel.
    pub screen: Screen,
    /// Visible auth form.
    pub auth_tab: AuthTab,
    /// Current notification, if any.
    pub alert: Option<Alert>,
    /// Text of the payload editor.
    pub payload_editor: String,
    /// Pretty-printed result of the last calculation, once one succeeded.
    pub result_panel: Option<String>,
    /// History table.
    pub history: HistoryView,
    /// Open detail modal.
    pub modal: Option<DetailModal>,
    alerts_raised: u64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            screen: Screen::Auth,
            auth_tab: AuthTab::Login,
            alert: None,
            payload_editor: default_payload_text(),
            result_panel: None,
            history: HistoryView::Loading,
            modal: None,
            alerts_raised: 0,
        }
    }
}

impl ViewState {
    /// Whether the logout control is visible.
    #[must_use]
    pub fn logout_visible(&self) -> bool {
        self.screen == Screen::Home
    }

    /// Total notifications raised since the view was created.
    #[must_use]
    pub const fn alerts_raised(&self) -> u64 {
        self.alerts_raised
    }

    /// Raise a notification, replacing any visible one.
    pub fn show_alert(&mut self, level: AlertLevel, message: impl Into<String>, ttl: Duration) {
        self.alerts_raised += 1;
        self.alert = Some(Alert {
            serial: self.alerts_raised,
            level,
            message: message.into(),
            raised_at: Instant::now(),
            ttl,
        });
    }

    /// Hide the visible notification.
    pub fn hide_alert(&mut self) {
        self.alert = None;
    }

    /// Auto-dismiss the notification once its lifetime has elapsed.
    pub fn expire_alert(&mut self, now: Instant) {
        if self.alert.as_ref().is_some_and(|alert| alert.is_expired(now)) {
            self.alert = None;
        }
    }

    /// Switch the auth form; any visible notification is cleared.
    pub fn switch_tab(&mut self, tab: AuthTab) {
        self.hide_alert();
        self.auth_tab = tab;
    }
}

/// Format a creation timestamp as local `YYYY-MM-DD HH:MM`.
#[must_use]
pub fn format_created<Tz: TimeZone>(created_at: &DateTime<Utc>, zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    created_at
        .with_timezone(zone)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Format a total with the currency prefix; absent amounts render as zero.
#[must_use]
pub fn format_total(amount: Option<f64>) -> String {
    let amount = amount.filter(|value| value.is_finite()).unwrap_or(0.0);
    format!("{CURRENCY_PREFIX}{}", format_amount(amount))
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{amount:.0}")
    } else {
        format!("{amount}")
    }
}
