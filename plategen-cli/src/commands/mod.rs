//! CLI command implementations.

pub mod common;
pub mod config;
pub mod generate;
pub mod inspect;
