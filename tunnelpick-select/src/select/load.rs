use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use tunnelpick_core::{CandidateSet, LoadApiSettings};

/// 每台服务器的负载百分比（0-100）
pub type LoadResult = BTreeMap<String, u8>;

/// 目录服务返回的单个服务器条目
///
/// 目录中还有其它字段，这里只关心标识和负载。
#[derive(Debug, Deserialize)]
pub struct CatalogServer {
    pub domain: String,
    pub load: u8,
}

/// 负载获取器
///
/// 从远端目录服务拉取服务器负载快照，过滤到调用方关心的候选集。
pub struct LoadFetcher {
    client: Client,
    url: String,
}

impl LoadFetcher {
    pub fn new(settings: &LoadApiSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .context("failed to create HTTP client for load catalog")?;

        Ok(Self {
            client,
            url: settings.url.clone(),
        })
    }

    /// 拉取负载快照并过滤
    ///
    /// 网络错误、非成功状态码或无法解析的响应体都作为错误向上传播，
    /// 绝不悄悄替换成数值负载——0会被错误地排成最优服务器。
    pub async fn fetch(
        &self,
        candidates: &CandidateSet,
        filter: Option<&Regex>,
    ) -> Result<LoadResult> {
        debug!("Fetching server load catalog from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("load catalog request to {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!(
                "load catalog at {} returned status {} {}",
                self.url,
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            );
        }

        let servers: Vec<CatalogServer> = response
            .json()
            .await
            .with_context(|| format!("malformed load catalog response from {}", self.url))?;

        debug!("Load catalog returned {} servers", servers.len());
        Ok(filter_catalog(servers, candidates, filter))
    }
}

/// 把目录快照过滤成调用方可用的负载结果
///
/// 目录可能包含远多于候选集的服务器；结果严格限制为既匹配过滤
/// 模式又在候选集中的条目，目录不会泄漏调用方没有提供的服务器。
pub fn filter_catalog(
    servers: Vec<CatalogServer>,
    candidates: &CandidateSet,
    filter: Option<&Regex>,
) -> LoadResult {
    let mut result = LoadResult::new();
    for server in servers {
        if !candidates.contains(&server.domain) {
            continue;
        }
        if let Some(re) = filter {
            if !re.is_match(&server.domain) {
                continue;
            }
        }
        result.insert(server.domain, server.load);
    }
    result
}
