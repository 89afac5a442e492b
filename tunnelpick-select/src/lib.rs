//! Tunnelpick Selection Library
//!
//! This library provides the server selection engine for tunnelpick including:
//! - Concurrent latency probing
//! - Remote load catalog fetching
//! - Ranking and rank-sum merging

pub mod select;

// Re-export commonly used types
pub use select::{
    choose_by_latency, choose_by_load, choose_by_rank_sum, rank_table, LatencyProber,
    LatencyResult, LoadFetcher, LoadResult, PingRunner, ProbeRunner, SelectionError,
    SelectionService, MAX_LATENCY_MS,
};
