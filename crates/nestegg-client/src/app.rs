//! Application controller: session state, view switching and the user-facing flows.
//!
//! # Design
//! - All mutable state lives in one [`AppState`] behind a mutex that is never held across an
//!   `.await`; flows read what they need, release the lock, call the API, then re-lock to apply.
//! - Each flow turns API outcomes into view changes. Only storage and URL problems escape
//!   [`App::dispatch`] as errors.
//! - A 401 from an authenticated call logs out and raises one notification; callers see
//!   [`ClientError::Unauthorized`] and stay silent. A 401 for a superseded request, or for a
//!   token that has since been replaced in the store, leaves the session alone.
//! - Results are applied only while their request ticket is still the latest for the resource.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::Instrument;

use crate::actions::Action;
use crate::api::{ApiClient, Authorized};
use crate::error::{ClientError, ClientResult};
use crate::models::{CalculationRecord, Credentials};
use crate::payload::{CalculationKind, parse_payload, pretty_json};
use crate::sequencing::{RequestSequencer, Resource, Ticket};
use crate::session::{Session, TokenStore};
use crate::view::{AlertLevel, AuthTab, DetailModal, HistoryView, Screen, ViewState};

/// Notification raised when an authenticated call is rejected.
pub const SESSION_EXPIRED: &str = "Session expired. Please log in again.";
/// Notification raised when a request never completed.
pub const NETWORK_ERROR: &str = "Network error.";
/// Notification raised after a successful registration.
pub const REGISTERED: &str = "Registration successful! Please log in.";
/// Fallback when registration fails without a server detail.
pub const REGISTRATION_FAILED: &str = "Registration failed";
/// Fallback when login fails without a server detail.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
/// Notification raised when the payload editor does not hold valid JSON.
pub const INVALID_JSON: &str = "Invalid JSON format in the input box.";
/// Notification raised when a calculation request fails outside the server's control.
pub const CALCULATION_FAILED: &str = "Failed to calculate.";

/// Mutable application state.
#[derive(Debug, Default)]
struct AppState {
    session: Session,
    records: Vec<CalculationRecord>,
    view: ViewState,
}

struct Inner {
    api: ApiClient,
    store: Arc<dyn TokenStore>,
    sequencer: RequestSequencer,
    alert_ttl: Duration,
    state: Mutex<AppState>,
}

/// Cloneable handle to the application; clones share state.
#[derive(Clone)]
pub struct App {
    inner: Arc<Inner>,
}

impl App {
    /// Build an application over an API client and a token store.
    #[must_use]
    pub fn new(api: ApiClient, store: Arc<dyn TokenStore>) -> Self {
        let alert_ttl = api.config().alert_ttl;
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                sequencer: RequestSequencer::new(),
                alert_ttl,
                state: Mutex::new(AppState::default()),
            }),
        }
    }

    /// Snapshot of the view model.
    #[must_use]
    pub fn view(&self) -> ViewState {
        self.with_state(|state| state.view.clone())
    }

    /// Snapshot of the cached session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.with_state(|state| state.session.clone())
    }

    /// Snapshot of the cached history records, in server order.
    #[must_use]
    pub fn records(&self) -> Vec<CalculationRecord> {
        self.with_state(|state| state.records.clone())
    }

    /// Run one user action.
    ///
    /// # Errors
    ///
    /// Returns an error only for local infrastructure failures (session storage, endpoint
    /// URLs). Everything the user should see is reported through the view's alert.
    pub async fn dispatch(&self, action: Action) -> ClientResult<()> {
        let span = tracing::info_span!("action", name = action.label());
        async move {
            match action {
                Action::Load => self.check_auth_status().await,
                Action::SwitchTab(tab) => {
                    self.switch_tab(tab);
                    Ok(())
                }
                Action::Register(credentials) => self.register(credentials).await,
                Action::Login(credentials) => self.login(credentials).await,
                Action::Logout => self.logout(),
                Action::EditPayload(text) => {
                    self.edit_payload(text);
                    Ok(())
                }
                Action::SubmitCalculation(kind) => self.submit_calculation(kind).await,
                Action::RefreshHistory => self.fetch_history().await,
                Action::ViewDetails(index) => {
                    self.view_details(index);
                    Ok(())
                }
                Action::CloseDetails => {
                    self.with_state(|state| state.view.modal = None);
                    Ok(())
                }
                Action::DismissAlert => {
                    self.with_state(|state| state.view.hide_alert());
                    Ok(())
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Re-read the persisted token, pick the screen and, when signed in, load history.
    ///
    /// # Errors
    ///
    /// Returns an error if the token store cannot be read.
    pub async fn check_auth_status(&self) -> ClientResult<()> {
        if self.restore_session()? {
            self.fetch_history().await?;
        }
        Ok(())
    }

    /// Forget the token and fall back to the auth screen.
    ///
    /// # Errors
    ///
    /// Returns an error if the token store cannot be cleared.
    pub fn logout(&self) -> ClientResult<()> {
        self.inner.store.clear()?;
        tracing::info!("signed out");
        self.restore_session().map(|_| ())
    }

    /// Toggle the visible auth form; clears any notification.
    pub fn switch_tab(&self, tab: AuthTab) {
        self.with_state(|state| state.view.switch_tab(tab));
    }

    /// Replace the payload editor content.
    pub fn edit_payload(&self, text: String) {
        self.with_state(|state| state.view.payload_editor = text);
    }

    /// Auto-dismiss the notification if its lifetime has elapsed.
    pub fn expire_alert(&self, now: Instant) {
        self.with_state(|state| state.view.expire_alert(now));
    }

    /// Register an account.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure failures.
    pub async fn register(&self, credentials: Credentials) -> ClientResult<()> {
        match self.inner.api.register(&credentials).await {
            Ok(()) => {
                tracing::info!(email = %credentials.email, "registered account");
                let ttl = self.inner.alert_ttl;
                self.with_state(|state| {
                    state.view.switch_tab(AuthTab::Login);
                    state.view.show_alert(AlertLevel::Success, REGISTERED, ttl);
                });
            }
            Err(ClientError::Server { detail, .. }) => {
                self.alert(
                    AlertLevel::Danger,
                    detail.unwrap_or_else(|| REGISTRATION_FAILED.to_string()),
                );
            }
            Err(err) if err.is_infrastructure() => return Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "registration request failed");
                self.alert(AlertLevel::Danger, NETWORK_ERROR);
            }
        }
        Ok(())
    }

    /// Sign in, persist the token and reload the view.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be persisted or the session re-read.
    pub async fn login(&self, credentials: Credentials) -> ClientResult<()> {
        let ticket = self.inner.sequencer.issue(Resource::Session);
        let outcome = self.inner.api.login(&credentials).await;
        if self.is_stale(&ticket) {
            return Ok(());
        }
        match outcome {
            Ok(token) => {
                self.inner.store.save(&token.access_token)?;
                tracing::info!(email = %credentials.email, "signed in");
                self.with_state(|state| state.view.hide_alert());
                self.check_auth_status().await
            }
            Err(ClientError::Server { detail, .. }) => {
                self.alert(
                    AlertLevel::Danger,
                    detail.unwrap_or_else(|| INVALID_CREDENTIALS.to_string()),
                );
                Ok(())
            }
            Err(err) if err.is_infrastructure() => Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "login request failed");
                self.alert(AlertLevel::Danger, NETWORK_ERROR);
                Ok(())
            }
        }
    }

    /// Parse the payload editor and submit it to `kind`'s endpoint.
    ///
    /// Invalid JSON is reported without any network call.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure failures.
    pub async fn submit_calculation(&self, kind: CalculationKind) -> ClientResult<()> {
        let text = self.with_state(|state| state.view.payload_editor.clone());
        let payload = match parse_payload(&text) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::debug!(error = %err, "payload editor holds invalid JSON");
                self.alert(AlertLevel::Danger, INVALID_JSON);
                return Ok(());
            }
        };

        let ticket = self.inner.sequencer.issue(Resource::Calculation);
        let token = self.token()?;
        let outcome = self
            .fetch_with_auth(
                &ticket,
                token.as_deref(),
                self.inner.api.calculate(kind, &payload, token.as_deref()),
            )
            .await;
        if self.is_stale(&ticket) {
            return Ok(());
        }

        match outcome {
            Ok(result) => {
                let ttl = self.inner.alert_ttl;
                let label = kind.as_str().to_uppercase();
                let message = format!("Calculation for {label} successful!");
                self.with_state(|state| {
                    state.view.show_alert(AlertLevel::Success, message, ttl);
                    state.view.result_panel = Some(pretty_json(&result));
                });
                self.fetch_history().await
            }
            Err(ClientError::Unauthorized) => Ok(()),
            Err(ClientError::Server { status, detail }) => {
                let message = detail
                    .unwrap_or_else(|| format!("Calculation failed (status {})", status.as_u16()));
                self.alert(AlertLevel::Danger, message);
                Ok(())
            }
            Err(err) if err.is_infrastructure() => Err(err),
            Err(err) => {
                tracing::warn!(error = %err, kind = %kind, "calculation request failed");
                self.alert(AlertLevel::Danger, CALCULATION_FAILED);
                Ok(())
            }
        }
    }

    /// Fetch the record list and rebuild the history table from it.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure failures.
    pub async fn fetch_history(&self) -> ClientResult<()> {
        let ticket = self.inner.sequencer.issue(Resource::History);
        self.with_state(|state| state.view.history = HistoryView::Loading);
        let token = self.token()?;
        let outcome = self
            .fetch_with_auth(
                &ticket,
                token.as_deref(),
                self.inner.api.history(token.as_deref()),
            )
            .await;
        if self.is_stale(&ticket) {
            return Ok(());
        }

        match outcome {
            Ok(records) => {
                tracing::debug!(count = records.len(), "history loaded");
                self.with_state(|state| {
                    state.view.history = HistoryView::from_records(&records);
                    state.records = records;
                });
                Ok(())
            }
            Err(ClientError::Unauthorized) => Ok(()),
            Err(err) if err.is_infrastructure() => Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "history request failed");
                self.with_state(|state| state.view.history = HistoryView::Failed);
                Ok(())
            }
        }
    }

    /// Open the detail modal for the cached record at `index`.
    ///
    /// Returns `false`, leaving the view untouched, when no such record is cached.
    pub fn view_details(&self, index: usize) -> bool {
        self.with_state(|state| {
            let Some(record) = state.records.get(index) else {
                return false;
            };
            state.view.modal = Some(DetailModal {
                index,
                payload: pretty_json(&record.payload),
                result: pretty_json(&record.result),
            });
            true
        })
    }

    /// Await an authenticated call sent with `token` under `ticket`.
    ///
    /// A 401 forces logout and raises the expiry notification, but only while the ticket is
    /// current and `token` is still the stored one.
    async fn fetch_with_auth<T, F>(
        &self,
        ticket: &Ticket,
        token: Option<&str>,
        call: F,
    ) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<Authorized<T>>>,
    {
        match call.await? {
            Authorized::Ok(value) => Ok(value),
            Authorized::Expired => {
                if self.is_stale(ticket) {
                    return Err(ClientError::Unauthorized);
                }
                let stored = Session::from_stored(self.inner.store.load()?);
                if stored.token() != token {
                    tracing::debug!("rejected token was already replaced; keeping session");
                    return Err(ClientError::Unauthorized);
                }
                tracing::warn!("session rejected by server; signing out");
                self.logout()?;
                self.alert(AlertLevel::Danger, SESSION_EXPIRED);
                Err(ClientError::Unauthorized)
            }
        }
    }

    /// Load the persisted token into the cached session and pick the screen, without touching
    /// history. Returns whether a usable token was found.
    ///
    /// # Errors
    ///
    /// Returns an error if the token store cannot be read.
    pub fn restore_session(&self) -> ClientResult<bool> {
        let session = Session::from_stored(self.inner.store.load()?);
        let authenticated = session.is_authenticated();
        self.with_state(|state| {
            state.session = session;
            state.view.screen = if authenticated {
                Screen::Home
            } else {
                Screen::Auth
            };
        });
        Ok(authenticated)
    }

    /// Bearer token for the next request: the cached session, else the persisted store.
    fn token(&self) -> ClientResult<Option<String>> {
        if let Some(token) = self.with_state(|state| state.session.token.clone()) {
            return Ok(Some(token));
        }
        Ok(Session::from_stored(self.inner.store.load()?).token)
    }

    fn alert(&self, level: AlertLevel, message: impl Into<String>) {
        let ttl = self.inner.alert_ttl;
        self.with_state(|state| state.view.show_alert(level, message, ttl));
    }

    fn is_stale(&self, ticket: &Ticket) -> bool {
        let stale = !self.inner.sequencer.is_current(ticket);
        if stale {
            tracing::debug!(
                resource = ticket.resource().as_str(),
                sequence = ticket.sequence(),
                "dropping superseded response"
            );
        }
        stale
    }

    fn with_state<R>(&self, apply: impl FnOnce(&mut AppState) -> R) -> R {
        let mut guard = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        apply(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::MemoryTokenStore;
    use url::Url;

    fn offline_app(store: Arc<MemoryTokenStore>) -> anyhow::Result<App> {
        let config = ClientConfig::new(Url::parse("http://127.0.0.1:9")?);
        Ok(App::new(ApiClient::new(config)?, store))
    }

    #[tokio::test]
    async fn load_without_token_shows_auth() -> anyhow::Result<()> {
        let app = offline_app(Arc::new(MemoryTokenStore::new()))?;
        app.dispatch(Action::Load).await?;
        let view = app.view();
        assert_eq!(view.screen, Screen::Auth);
        assert!(!view.logout_visible());
        assert!(!app.session().is_authenticated());
        Ok(())
    }

    #[tokio::test]
    async fn invalid_json_alerts_without_network() -> anyhow::Result<()> {
        let app = offline_app(Arc::new(MemoryTokenStore::with_token("T")))?;
        app.dispatch(Action::EditPayload("{not json".into())).await?;
        app.dispatch(Action::SubmitCalculation(CalculationKind::Nps))
            .await?;
        let view = app.view();
        let alert = view.alert.as_ref().map(|alert| alert.message.as_str());
        assert_eq!(alert, Some(INVALID_JSON));
        assert_eq!(view.alerts_raised(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn view_details_out_of_range_is_noop() -> anyhow::Result<()> {
        let app = offline_app(Arc::new(MemoryTokenStore::new()))?;
        let before = app.view();
        assert!(!app.view_details(0));
        app.dispatch(Action::ViewDetails(usize::MAX)).await?;
        assert_eq!(app.view(), before);
        Ok(())
    }

    #[tokio::test]
    async fn logout_clears_store() -> anyhow::Result<()> {
        let store = Arc::new(MemoryTokenStore::with_token("T"));
        let app = offline_app(Arc::clone(&store))?;
        app.dispatch(Action::Logout).await?;
        assert_eq!(store.load()?, None);
        assert_eq!(app.view().screen, Screen::Auth);
        Ok(())
    }

    #[tokio::test]
    async fn dismiss_and_tab_switch_hide_alerts() -> anyhow::Result<()> {
        let app = offline_app(Arc::new(MemoryTokenStore::new()))?;
        app.alert(AlertLevel::Danger, "boom");
        app.dispatch(Action::DismissAlert).await?;
        assert!(app.view().alert.is_none());

        app.alert(AlertLevel::Danger, "boom");
        app.dispatch(Action::SwitchTab(AuthTab::Register)).await?;
        let view = app.view();
        assert!(view.alert.is_none());
        assert_eq!(view.auth_tab, AuthTab::Register);
        Ok(())
    }

    #[tokio::test]
    async fn network_failure_on_register_is_reported() -> anyhow::Result<()> {
        let app = offline_app(Arc::new(MemoryTokenStore::new()))?;
        app.dispatch(Action::Register(Credentials::new("a@b.com", "x")))
            .await?;
        let alert = app.view().alert;
        assert_eq!(alert.map(|alert| alert.message), Some(NETWORK_ERROR.to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn network_failure_on_login_is_reported() -> anyhow::Result<()> {
        let store = Arc::new(MemoryTokenStore::new());
        let app = offline_app(Arc::clone(&store))?;
        app.dispatch(Action::Login(Credentials::new("a@b.com", "x")))
            .await?;
        let view = app.view();
        let alert = view.alert.as_ref();
        assert_eq!(alert.map(|alert| alert.level), Some(AlertLevel::Danger));
        assert_eq!(alert.map(|alert| alert.message.as_str()), Some(NETWORK_ERROR));
        assert_eq!(view.alerts_raised(), 1);
        assert_eq!(view.screen, Screen::Auth);
        assert_eq!(store.load()?, None);
        Ok(())
    }
}
