#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Client core for the Nestegg retirement-returns calculator.
//!
//! Layout:
//! - `app.rs`: the controller; owns session, record cache and view model, runs each flow
//! - `actions.rs`: typed user actions fed to [`App::dispatch`]
//! - `api.rs`: HTTP transport for register/login/calculate/history
//! - `session.rs`: persisted token store and cached session
//! - `view.rs`: plain-data view model (screens, alerts, history table, modal)
//! - `sequencing.rs`: per-resource request tickets guarding against stale responses
//! - `payload.rs`, `models.rs`: request/response documents
//! - `config.rs`: endpoint and storage configuration

pub mod actions;
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod payload;
pub mod sequencing;
pub mod session;
pub mod view;

pub use actions::Action;
pub use api::{ApiClient, Authorized};
pub use app::App;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use models::{CalculationRecord, Credentials, ErrorDetail, TokenResponse};
pub use payload::CalculationKind;
pub use session::{FileTokenStore, MemoryTokenStore, Session, TokenStore};
pub use view::{AlertLevel, AuthTab, HistoryView, Screen, ViewState};
