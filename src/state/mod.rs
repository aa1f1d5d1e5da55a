//! Process-wide application state.
//!
//! This module holds the live settings and audio workers shared across the
//! application, with a broadcast channel announcing changes.

pub mod app_state;

pub use app_state::{AppState, AppStateEvent, HotkeyState};
