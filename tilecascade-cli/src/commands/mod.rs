//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`fetch`] - Load a view from a tile server
//! - [`simulate`] - Scripted pan/zoom against a synthetic source

pub mod common;
pub mod fetch;
pub mod simulate;
