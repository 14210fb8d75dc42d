//! Deployment module

pub mod orchestrator;
pub mod poller;
pub mod state;
pub mod status;
