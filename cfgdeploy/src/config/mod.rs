//! Deploy configuration file

pub mod settings;

pub use settings::{DeployConfig, StoreSettings, DEFAULT_CONFIG_FILE};
