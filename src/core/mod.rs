//! Password management engine.

pub mod batch;
pub mod environment;
pub mod error;
pub mod kv;
pub mod legacy;
pub mod names;
pub mod negotiator;
pub mod paths;
pub mod store;
