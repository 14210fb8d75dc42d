//! Wire models for the remote configuration store API

pub mod models;
