use super::load::LoadResult;
use super::probe::LatencyResult;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// 服务器选择错误类型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// 过滤和指标收集之后没有剩下任何可选服务器
    #[error("no eligible servers remained after filtering and metric collection")]
    NoEligibleServer,
}

/// 延迟排名与负载排名之和
pub type RankTable = BTreeMap<String, usize>;

// 所有结果表都是BTreeMap，迭代顺序是服务器名的字典序；
// "最先遇到的最小值获胜"的并列打破因此是确定性的。
fn first_min<V: PartialOrd + Copy>(map: &BTreeMap<String, V>) -> Result<String, SelectionError> {
    let mut best: Option<(&String, V)> = None;
    for (id, &value) in map {
        let better = match best {
            None => true,
            Some((_, best_value)) => value < best_value,
        };
        if better {
            best = Some((id, value));
        }
    }
    best.map(|(id, _)| id.clone())
        .ok_or(SelectionError::NoEligibleServer)
}

/// 选出平均延迟最低的服务器
///
/// 并列时返回迭代顺序中最先遇到的（即名字字典序最小的）。
pub fn choose_by_latency(latency: &LatencyResult) -> Result<String, SelectionError> {
    let chosen = first_min(latency)?;
    debug!(
        "Lowest latency server: {} ({:.2}ms)",
        chosen, latency[&chosen]
    );
    Ok(chosen)
}

/// 选出负载百分比最低的服务器，并列规则同上
pub fn choose_by_load(load: &LoadResult) -> Result<String, SelectionError> {
    let chosen = first_min(load)?;
    debug!("Lowest load server: {} ({}%)", chosen, load[&chosen]);
    Ok(chosen)
}

/// 构建延迟+负载的排名和表
///
/// 先按延迟升序给每台服务器0起始的名次，再按负载升序把名次累加。
/// 只有同时出现在两个结果集中的服务器才参与排名；缺席一侧的服务器
/// 被排除出候选，而不是导致崩溃。
pub fn rank_table(latency: &LatencyResult, load: &LoadResult) -> RankTable {
    let mut scored: Vec<&String> = latency
        .keys()
        .filter(|id| load.contains_key(*id))
        .collect();

    let mut table = RankTable::new();

    // 稳定排序：值相同的服务器保持字典序
    scored.sort_by(|a, b| {
        latency[*a]
            .partial_cmp(&latency[*b])
            .unwrap_or(Ordering::Equal)
    });
    for (position, id) in scored.iter().enumerate() {
        table.insert((*id).clone(), position);
    }

    scored.sort_by_key(|id| load[*id]);
    for (position, id) in scored.iter().enumerate() {
        if let Some(rank) = table.get_mut(*id) {
            *rank += position;
        }
    }

    table
}

/// 按排名和选出综合最优的服务器
pub fn choose_by_rank_sum(
    latency: &LatencyResult,
    load: &LoadResult,
) -> Result<String, SelectionError> {
    let table = rank_table(latency, load);
    debug!("Combined rank table: {:?}", table);
    first_min(&table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latency(entries: &[(&str, f64)]) -> LatencyResult {
        entries
            .iter()
            .map(|(id, v)| (id.to_string(), *v))
            .collect()
    }

    fn load(entries: &[(&str, u8)]) -> LoadResult {
        entries
            .iter()
            .map(|(id, v)| (id.to_string(), *v))
            .collect()
    }

    #[test]
    fn test_choose_by_latency_returns_minimum() {
        let result = latency(&[("s1", 30.0), ("s2", 15.0), ("s3", 45.0)]);
        assert_eq!(choose_by_latency(&result).unwrap(), "s2");
    }

    #[test]
    fn test_choose_by_latency_tie_is_first_in_order() {
        let result = latency(&[("b.example.com", 10.0), ("a.example.com", 10.0)]);
        // BTreeMap迭代是字典序，最先遇到的最小值是a
        assert_eq!(choose_by_latency(&result).unwrap(), "a.example.com");
    }

    #[test]
    fn test_choose_by_load_returns_minimum() {
        let result = load(&[("s1", 80), ("s2", 12), ("s3", 55)]);
        assert_eq!(choose_by_load(&result).unwrap(), "s2");
    }

    #[test]
    fn test_empty_results_are_no_eligible_server() {
        assert_eq!(
            choose_by_latency(&LatencyResult::new()),
            Err(SelectionError::NoEligibleServer)
        );
        assert_eq!(
            choose_by_load(&LoadResult::new()),
            Err(SelectionError::NoEligibleServer)
        );
        assert_eq!(
            choose_by_rank_sum(&LatencyResult::new(), &LoadResult::new()),
            Err(SelectionError::NoEligibleServer)
        );
    }

    #[test]
    fn test_rank_sum_merge_with_tie() {
        // 延迟名次 {C:0, A:1, B:2}；负载名次 {B:0, A:1, C:2}；
        // 合计 {A:2, B:2, C:2} 全部并列，取迭代顺序中的第一个
        let lat = latency(&[("A", 10.0), ("B", 20.0), ("C", 5.0)]);
        let ld = load(&[("A", 50), ("B", 10), ("C", 90)]);

        let table = rank_table(&lat, &ld);
        assert_eq!(table.get("A"), Some(&2));
        assert_eq!(table.get("B"), Some(&2));
        assert_eq!(table.get("C"), Some(&2));

        assert_eq!(choose_by_rank_sum(&lat, &ld).unwrap(), "A");
    }

    #[test]
    fn test_rank_sum_prefers_clear_winner() {
        let lat = latency(&[("A", 10.0), ("B", 20.0), ("C", 30.0)]);
        let ld = load(&[("A", 5), ("B", 60), ("C", 90)]);
        // A在两个排序中都是第一
        assert_eq!(choose_by_rank_sum(&lat, &ld).unwrap(), "A");
    }

    #[test]
    fn test_rank_sum_excludes_servers_absent_from_one_side() {
        let lat = latency(&[("A", 10.0), ("B", 20.0), ("only-latency", 1.0)]);
        let ld = load(&[("A", 50), ("B", 10), ("only-load", 1)]);

        let table = rank_table(&lat, &ld);
        assert!(!table.contains_key("only-latency"));
        assert!(!table.contains_key("only-load"));

        // only-latency延迟最低但缺负载数据，不参与候选
        let chosen = choose_by_rank_sum(&lat, &ld).unwrap();
        assert!(chosen == "A" || chosen == "B");
    }

    #[test]
    fn test_rank_sum_disjoint_results_is_no_eligible_server() {
        let lat = latency(&[("A", 10.0)]);
        let ld = load(&[("B", 10)]);
        assert_eq!(
            choose_by_rank_sum(&lat, &ld),
            Err(SelectionError::NoEligibleServer)
        );
    }
}
