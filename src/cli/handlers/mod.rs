// src/cli/handlers/mod.rs

// One module per CLI command.

pub mod commons;
pub mod info;
pub mod launch;
pub mod list;
pub mod resolve;
