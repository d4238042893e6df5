//! certkeeper API service.
//!
//! Exposes the certificate lifecycle over HTTP: apply, poll, download, renew,
//! rename and delete certificates, publish DNS validation records and list
//! the ones still outstanding. See [`config::CertkeeperApiConfig`] for
//! configuration options.

pub mod config;
pub mod reload;
pub mod server;

pub use context::ApiContext;

pub(crate) mod context;
pub(crate) mod error;
pub(crate) mod handlers;
