pub mod backend;
pub mod config;
pub mod error;
pub mod local_store;
pub mod telemetry;
pub mod workflows;
