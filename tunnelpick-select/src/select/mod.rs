pub mod load;
pub mod probe;
pub mod ranker;
pub mod service;
pub mod traits;

pub use load::{LoadFetcher, LoadResult};
pub use probe::{LatencyProber, LatencyResult, PingRunner, MAX_LATENCY_MS};
pub use ranker::{
    choose_by_latency, choose_by_load, choose_by_rank_sum, rank_table, SelectionError,
};
pub use service::SelectionService;
pub use traits::ProbeRunner;
