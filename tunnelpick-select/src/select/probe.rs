use super::traits::ProbeRunner;
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, warn};
use tunnelpick_core::CandidateSet;

/// 每台主机的平均往返时间（毫秒）
pub type LatencyResult = BTreeMap<String, f64>;

/// 无法获得任何样本的主机使用的哨兵延迟
///
/// 哨兵值让不可达主机排在最后，而不是让整批探测失败；
/// 当它是唯一的候选时仍然会被选中。
pub const MAX_LATENCY_MS: f64 = 10_000.0;

// ping输出中的往返时间标记，例如 "64 bytes from ...: icmp_seq=1 ttl=53 time=23.4 ms"
#[allow(clippy::unwrap_used)]
static PING_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" time=(?P<time>\d+(?:\.\d+)?)").unwrap());

/// 从ping的逐行输出中提取往返时间样本（毫秒）
pub fn parse_ping_output(output: &str) -> Vec<f64> {
    output
        .lines()
        .filter_map(|line| PING_TIME.captures(line))
        .filter_map(|caps| caps.name("time"))
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

/// 基于系统ping子进程的探测实现
pub struct PingRunner {
    timeout_per_probe: Duration,
}

impl PingRunner {
    pub fn new(timeout_per_probe: Duration) -> Self {
        Self { timeout_per_probe }
    }
}

#[async_trait]
impl ProbeRunner for PingRunner {
    async fn probe(&self, host: &str, tries: u32) -> Result<Vec<f64>> {
        let count_flag = if cfg!(target_os = "windows") {
            "-n"
        } else {
            "-c"
        };

        // 整体预算由探测次数和单次超时决定，保证一台不可达主机
        // 不会拖住整个探测批次超过它自己的预算
        let budget = self.timeout_per_probe * tries + Duration::from_secs(1);

        // kill_on_drop: 选择被中断时不留下悬挂的ping子进程
        let output = Command::new("ping")
            .arg(count_flag)
            .arg(tries.to_string())
            .arg(host)
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(budget, output).await {
            Ok(result) => {
                let output =
                    result.with_context(|| format!("failed to launch ping for {host}"))?;
                let stdout = String::from_utf8_lossy(&output.stdout);
                Ok(parse_ping_output(&stdout))
            }
            Err(_) => {
                debug!("ping of {} exceeded its {:?} budget", host, budget);
                Ok(Vec::new())
            }
        }
    }
}

/// 延迟探测器
///
/// 对候选集中每台通过过滤的主机并发发起探测，等待全部完成后
/// 返回每台主机的平均往返时间。
pub struct LatencyProber {
    runner: Arc<dyn ProbeRunner>,
    tries: u32,
}

impl LatencyProber {
    pub fn new(runner: Arc<dyn ProbeRunner>, tries: u32) -> Self {
        Self { runner, tries }
    }

    /// 并发探测所有通过过滤的候选主机
    ///
    /// 每台主机一个任务，各任务恰好贡献一个结果条目；不匹配过滤
    /// 模式的主机完全不出现在结果中。单台主机的探测失败只会让该
    /// 主机降级为哨兵延迟，不会中止其它主机的探测。
    pub async fn probe_all(
        &self,
        candidates: &CandidateSet,
        filter: Option<&Regex>,
    ) -> LatencyResult {
        let mut tasks = Vec::new();

        for host in candidates {
            if let Some(re) = filter {
                if !re.is_match(host) {
                    debug!("Excluding {} from probing: does not match filter", host);
                    continue;
                }
            }

            let host_clone = host.clone();
            let runner = Arc::clone(&self.runner);
            let tries = self.tries;

            let task = tokio::spawn(async move {
                match runner.probe(&host_clone, tries).await {
                    Ok(samples) if !samples.is_empty() => {
                        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
                        debug!(
                            "Probed {}: {} samples, mean {:.2}ms",
                            host_clone,
                            samples.len(),
                            mean
                        );
                        mean
                    }
                    Ok(_) => {
                        warn!("No echo replies from {}, using sentinel latency", host_clone);
                        MAX_LATENCY_MS
                    }
                    Err(e) => {
                        warn!(
                            "Probe of {} failed: {:#}, using sentinel latency",
                            host_clone, e
                        );
                        MAX_LATENCY_MS
                    }
                }
            });

            tasks.push((host.clone(), task));
        }

        debug!("Waiting for {} probe tasks to complete", tasks.len());

        // 依次join所有任务并顺序装配结果，每个任务恰好一个条目，
        // 不需要共享可变的结果表
        let mut result = LatencyResult::new();
        for (host, task) in tasks {
            match task.await {
                Ok(mean) => {
                    result.insert(host, mean);
                }
                Err(e) => {
                    error!("Probe task for {} panicked: {}", host, e);
                    result.insert(host, MAX_LATENCY_MS);
                }
            }
        }

        result
    }
}
