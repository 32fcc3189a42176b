//! Password management for `simplib::passgen`.
//!
//! Lists, shows, sets, and removes the passwords simplib generates, across
//! the legacy flat-file layout and the simpkv key/value layout that is only
//! reachable through `puppet apply`.
//!
//! ## Modules
//! - `cli` - Command-line handlers
//! - `core` - Password managers, batch runner, option negotiation
//! - `models` - Configuration, options, and record structures
//! - `util` - System utilities (fs, prompts, puppet, generation)

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod util;
