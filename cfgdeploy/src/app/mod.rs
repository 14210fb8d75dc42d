//! Command options and runners

pub mod options;
pub mod run;
