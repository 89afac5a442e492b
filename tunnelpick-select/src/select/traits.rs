use anyhow::Result;
use async_trait::async_trait;

/// 探测提供者接口
///
/// 这个trait把"获取某台主机的单次往返时间样本"与具体的子进程调用分离，
/// 允许测试注入确定性的假实现，不发起真实的网络调用
#[async_trait]
pub trait ProbeRunner: Send + Sync {
    /// 对主机发起`tries`次回显探测，返回获得的往返时间样本（毫秒）
    ///
    /// 超时或无响应的单次探测不贡献样本；返回空Vec是合法结果。
    /// Err表示探测本身无法发起（例如找不到ping命令）。
    async fn probe(&self, host: &str, tries: u32) -> Result<Vec<f64>>;
}
