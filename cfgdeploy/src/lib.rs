//! cfgdeploy library
//!
//! Detects whether local configuration differs from the last deployed
//! version and, when it does, publishes a new version and follows its
//! phased rollout.

pub mod app;
pub mod config;
pub mod content;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod render;
pub mod store;
pub mod utils;
