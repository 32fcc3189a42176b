//! Data structures shared by the managers and the CLI.

pub mod config;
pub mod location;
pub mod options;
pub mod record;
