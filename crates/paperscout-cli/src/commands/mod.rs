//! Command implementations

pub mod config;
pub mod paper;
pub mod search;
