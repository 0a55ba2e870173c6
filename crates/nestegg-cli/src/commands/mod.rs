//! Command handlers grouped by concern.

pub(crate) mod auth;
pub(crate) mod calc;
pub(crate) mod history;
pub(crate) mod shell;
