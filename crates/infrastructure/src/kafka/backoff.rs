//! 生产者连接退避策略

use std::time::Duration;

/// 首次重试前的基础等待
const BASE_DELAY: Duration = Duration::from_millis(100);

/// 等待时间硬上限
const CEILING: Duration = Duration::from_millis(25_000);

/// 第 `retries` 次重试（从 0 计）前的等待时间：`min(上限, 基值 * e^n)`
///
/// 指数增长但有硬上限。连接重试无限进行：没有可达的事件日志，
/// 进程无法服务任何请求，宁可阻塞在启动阶段。
pub fn connect_backoff(retries: u32) -> Duration {
    BASE_DELAY.mul_f64((retries as f64).exp()).min(CEILING)
}
