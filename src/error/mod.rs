//! Error handling using `thiserror` and `anyhow`.
//!
//! This module provides domain-level error types that aggregate the
//! module errors, and operational helpers for context and reporting.

pub mod domain;
pub mod operational;

pub use {
    domain::{AudioError, PreferencesError, Result},
    operational::{ErrorReporter, ResultExt},
};
