//! Medicine reminder engine.
//!
//! Turns a medicine's dosing rule into concrete dose events and walks each
//! event through its reminder lifecycle (pending, sent, taken or missed,
//! with snooze re-arming a pending dose at a later time).

pub mod core;
pub mod db;
pub mod error;
pub mod models;
pub mod output;

pub use error::{Error, Result};
