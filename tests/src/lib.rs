//! Shared helpers for the provisioner's end-to-end tests.

pub mod fixtures;
pub mod mocks;
pub mod setup;
