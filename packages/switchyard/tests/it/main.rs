//! Integration tests for the Switchyard API.
//!
//! These tests use the `clients` library to interact with a test Switchyard
//! server, ensuring that the API works as expected from a client's perspective.

mod api;

pub use helpers::*;
