//! Core domain types and logic.

pub mod error;
pub mod frame;
pub mod stats;
pub mod model;
pub mod config;
pub mod config_validation;
pub mod features;
pub mod universe;
pub mod walk_forward;
pub mod portfolio;
pub mod backtest;
pub mod metrics;
pub mod robustness;
pub mod pipeline;
