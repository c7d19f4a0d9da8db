//! Switchyard API types and clients.

pub mod v1;
