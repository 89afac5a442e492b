//! Tunnelpick Core Library
//!
//! This library provides core functionality for the tunnelpick system including:
//! - Configuration management
//! - Candidate server discovery
//! - Shared types and utilities

pub mod config;
pub mod discovery;
pub mod filter;

// Re-export commonly used types
pub use config::model::{
    Config, LoadApiSettings, ProbeSettings, SelectionMetric, Transport,
};
pub use discovery::{discover_candidates, parse_candidate_filename, CandidateSet};
pub use filter::compile_filter;
