//! Utility modules for filesystem, prompting, and puppet operations.

pub mod fs;
pub mod password;
pub mod privilege;
pub mod prompt;
pub mod puppet;
