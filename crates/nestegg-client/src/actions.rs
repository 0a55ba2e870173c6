//! Typed user actions dispatched into [`crate::App`].

use crate::models::Credentials;
use crate::payload::CalculationKind;
use crate::view::AuthTab;

/// Everything a front end can ask the application to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Initial page load: read the persisted session and pick the screen.
    Load,
    /// Toggle between the login and registration forms.
    SwitchTab(AuthTab),
    /// Submit the registration form.
    Register(Credentials),
    /// Submit the login form.
    Login(Credentials),
    /// Sign out and forget the token.
    Logout,
    /// Replace the payload editor content.
    EditPayload(String),
    /// Parse the editor content and submit it to the given variant.
    SubmitCalculation(CalculationKind),
    /// Re-fetch the history table.
    RefreshHistory,
    /// Open the detail modal for the cached record at this position.
    ViewDetails(usize),
    /// Close the detail modal.
    CloseDetails,
    /// Hide the visible notification.
    DismissAlert,
}

impl Action {
    /// Stable name used in tracing spans.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::SwitchTab(_) => "switch_tab",
            Self::Register(_) => "register",
            Self::Login(_) => "login",
            Self::Logout => "logout",
            Self::EditPayload(_) => "edit_payload",
            Self::SubmitCalculation(_) => "submit_calculation",
            Self::RefreshHistory => "refresh_history",
            Self::ViewDetails(_) => "view_details",
            Self::CloseDetails => "close_details",
            Self::DismissAlert => "dismiss_alert",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_variants() {
        let cases = [
            (Action::Load, "load"),
            (Action::SwitchTab(AuthTab::Register), "switch_tab"),
            (Action::Register(Credentials::new("a", "b")), "register"),
            (Action::Login(Credentials::new("a", "b")), "login"),
            (Action::Logout, "logout"),
            (Action::EditPayload(String::new()), "edit_payload"),
            (
                Action::SubmitCalculation(CalculationKind::Index),
                "submit_calculation",
            ),
            (Action::RefreshHistory, "refresh_history"),
            (Action::ViewDetails(2), "view_details"),
            (Action::CloseDetails, "close_details"),
            (Action::DismissAlert, "dismiss_alert"),
        ];
        for (action, label) in cases {
            assert_eq!(action.label(), label);
        }
    }
}
