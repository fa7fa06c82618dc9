//! CLI command implementations.

pub mod analyze;
pub mod common;
pub mod config;
pub mod filter;
pub mod generate;
pub mod run;
pub mod spectrum;
