//! # x7-remote — X7 camera command-line client
//!
//! Stands in for the camera app's visual shell: loads a TOML config,
//! seeds a local settings store from it, runs one `x7-core` session and
//! prints the events it publishes.

pub mod config;
pub mod report;
