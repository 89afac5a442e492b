use super::load::LoadFetcher;
use super::probe::LatencyProber;
use super::ranker;
use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info, warn};
use tunnelpick_core::{CandidateSet, SelectionMetric};

/// 服务器选择服务
///
/// 按配置的指标调度延迟探测器和/或负载获取器，合并结果并选出
/// 唯一的最优服务器。
pub struct SelectionService {
    prober: LatencyProber,
    fetcher: LoadFetcher,
}

impl SelectionService {
    pub fn new(prober: LatencyProber, fetcher: LoadFetcher) -> Self {
        Self { prober, fetcher }
    }

    /// 为候选集选出一台服务器
    pub async fn select(
        &self,
        candidates: &CandidateSet,
        metric: SelectionMetric,
        filter: Option<&Regex>,
    ) -> Result<String> {
        info!(
            "Selecting from {} candidates using metric {:?}",
            candidates.len(),
            metric
        );

        let chosen = match metric {
            SelectionMetric::Latency => {
                let latency = self.prober.probe_all(candidates, filter).await;
                debug!("Latency results: {:?}", latency);
                ranker::choose_by_latency(&latency)?
            }
            SelectionMetric::Load => {
                // 仅按负载选择时负载数据是必需的，获取失败中止整个选择
                let load = self
                    .fetcher
                    .fetch(candidates, filter)
                    .await
                    .context("load data is required for the load metric")?;
                debug!("Load results: {:?}", load);
                ranker::choose_by_load(&load)?
            }
            SelectionMetric::LatencyThenLoad => {
                // 两个结果集相互独立，探测和拉取并行进行
                let (latency, load) = tokio::join!(
                    self.prober.probe_all(candidates, filter),
                    self.fetcher.fetch(candidates, filter),
                );
                debug!("Latency results: {:?}", latency);

                match load {
                    Ok(load) => {
                        debug!("Load results: {:?}", load);
                        ranker::choose_by_rank_sum(&latency, &load)?
                    }
                    Err(e) => {
                        // 延迟数据已经到手，剔除失败的数据源而不是中止
                        warn!(
                            "Load fetch failed, ranking by latency alone: {:#}",
                            e
                        );
                        ranker::choose_by_latency(&latency)?
                    }
                }
            }
        };

        info!("Selected server: {}", chosen);
        Ok(chosen)
    }
}
