//! Command line and configuration handling

pub mod args;
pub mod config;
