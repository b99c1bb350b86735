//! Capture session management module
//!
//! This module contains:
//! - Pointer gesture tracking
//! - Session state and its UI projection
//! - Message and effect types
//! - The capture coordinator

pub mod coordinator;
pub mod messages;
pub mod pointer;
pub mod state;
