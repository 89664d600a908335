//! Headless scenario configuration and execution.

pub mod config;
pub mod runner;
