//! Switchyard library exports for the binary and integration tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod cookies;
pub mod error;
pub mod form;
pub mod rate_limit;
pub mod redirect;
