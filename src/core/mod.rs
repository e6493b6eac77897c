// src/core/mod.rs

pub mod candidates;
pub mod catalog_loader;
pub mod parameters;
pub mod paths;
pub mod program;
pub mod resolver;
