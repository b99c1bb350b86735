//! Core application module
//!
//! This module contains:
//! - Session runtime executing coordinator effects
//! - JSON scripts replayed by the command line driver

pub mod app;
pub mod script;
