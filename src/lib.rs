//! Rustle Facts - host inventory for rustle deployments
//!
//! This crate resolves facts about the running host (kernel, operating
//! system, networking, hardware and virtualization) on demand, merges in
//! external facts from fact directories, and renders the result as text,
//! JSON or YAML.

pub mod config;
pub mod facts;
pub mod output;
pub mod process;

pub use config::FactsConfig;
pub use facts::{Collection, Value};
