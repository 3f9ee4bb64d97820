//! Recapito contact form service.
//!
//! A standalone HTTP service around one configurable contact form:
//! renders fields from settings, validates submissions with a honeypot
//! plus time-delay anti-spam scheme, stores accepted messages, and sends
//! notification/auto-reply email.
//!
//! This library exposes the internals for integration testing. The entry
//! point for running the server is the `recapito` binary.

pub mod config;
pub mod db;
pub mod error;
pub mod form;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod settings;
pub mod state;

pub use config::Config;
pub use settings::FormSettings;
pub use state::AppState;
