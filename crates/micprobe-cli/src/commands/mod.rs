//! CLI command implementations.

pub mod common;
pub mod config;
pub mod devices;
pub mod generate;
pub mod process;
pub mod record;
