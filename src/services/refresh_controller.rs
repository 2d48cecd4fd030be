// ==========================================
// 停机申报引擎 - 工单列表轮询刷新
// ==========================================
// 职责: 按固定间隔拉取工单列表, 发布最新快照
// 约束:
// - 同一时刻最多一个定时器; 重复 start 先停旧定时器
// - stop / Drop 后不再发布任何结果（在途请求结果丢弃）
// - 拉取失败保留上一份快照
// - 在途计数按定时器代次隔离; 旧代次挂起的拉取不阻塞新定时器
// ==========================================

use crate::domain::declaration::DowntimeDeclaration;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// 轮询数据源
#[async_trait]
pub trait RefreshSource: Send + Sync {
    async fn fetch(&self) -> anyhow::Result<Vec<DowntimeDeclaration>>;
}

/// 上一次拉取尚未完成时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// 跳过本次触发
    #[default]
    Skip,
    /// 并发发起新的拉取
    Allow,
}

impl OverlapPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Some(OverlapPolicy::Skip),
            "allow" => Some(OverlapPolicy::Allow),
            _ => None,
        }
    }
}

/// 已发布的工单列表快照
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshSnapshot {
    pub declarations: Vec<DowntimeDeclaration>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub sequence: u64,
}

/// 定时器与在途拉取共享的状态
struct Shared {
    source: Arc<dyn RefreshSource>,
    enabled: AtomicBool,
    // stop / start 时递增, 旧代次的拉取结果不再发布
    generation: AtomicU64,
    sequence: AtomicU64,
    publisher: watch::Sender<RefreshSnapshot>,
}

impl Shared {
    fn publish(&self, declarations: Vec<DowntimeDeclaration>) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.publisher.send_replace(RefreshSnapshot {
            declarations,
            fetched_at: Some(Utc::now()),
            sequence,
        });
        sequence
    }

    async fn fetch(&self, fetch_timeout: Option<Duration>) -> anyhow::Result<Vec<DowntimeDeclaration>> {
        match fetch_timeout {
            None => self.source.fetch().await,
            Some(limit) => match tokio::time::timeout(limit, self.source.fetch()).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!(
                    "工单列表拉取超时 ({}ms)",
                    limit.as_millis()
                )),
            },
        }
    }

    async fn fetch_and_publish(&self, generation: u64, fetch_timeout: Option<Duration>) {
        let result = self.fetch(fetch_timeout).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "轮询已停止, 丢弃在途结果");
            return;
        }

        match result {
            Ok(declarations) => {
                let count = declarations.len();
                let sequence = self.publish(declarations);
                tracing::debug!(count, sequence, "工单列表已刷新");
            }
            Err(e) => {
                tracing::warn!(error = %e, "工单列表刷新失败, 保留上一份快照");
            }
        }
    }
}

/// 在途拉取计数; 拉取结束、超时或 panic 时随 drop 归还
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct RefreshController {
    shared: Arc<Shared>,
    interval: Duration,
    policy: OverlapPolicy,
    fetch_timeout: Option<Duration>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshController {
    pub fn new(source: Arc<dyn RefreshSource>, interval: Duration, policy: OverlapPolicy) -> Self {
        let (publisher, _) = watch::channel(RefreshSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                source,
                enabled: AtomicBool::new(true),
                generation: AtomicU64::new(0),
                sequence: AtomicU64::new(0),
                publisher,
            }),
            interval,
            policy,
            fetch_timeout: None,
            timer: Mutex::new(None),
        }
    }

    /// 单次拉取超时; 超时按拉取失败处理
    pub fn with_fetch_timeout(mut self, limit: Duration) -> Self {
        self.fetch_timeout = Some(limit);
        self
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// 订阅快照更新
    pub fn subscribe(&self) -> watch::Receiver<RefreshSnapshot> {
        self.shared.publisher.subscribe()
    }

    /// 最近一次发布的快照
    pub fn latest(&self) -> RefreshSnapshot {
        self.shared.publisher.borrow().clone()
    }

    /// 启动定时刷新（首次触发在一个周期之后）
    ///
    /// 必须在 tokio 运行时内调用
    pub fn start(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(old) = timer.take() {
            old.abort();
        }
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let shared = Arc::clone(&self.shared);
        let period = self.interval;
        let policy = self.policy;
        let fetch_timeout = self.fetch_timeout;
        let in_flight = Arc::new(AtomicUsize::new(0));

        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !shared.enabled.load(Ordering::SeqCst) {
                    continue;
                }
                if policy == OverlapPolicy::Skip && in_flight.load(Ordering::SeqCst) > 0 {
                    tracing::debug!("上一次刷新尚未完成, 跳过本次触发");
                    continue;
                }
                let guard = InFlightGuard::enter(&in_flight);
                let task_shared = Arc::clone(&shared);
                tokio::spawn(async move {
                    let _guard = guard;
                    task_shared.fetch_and_publish(generation, fetch_timeout).await;
                });
            }
        }));

        tracing::info!(interval_ms = period.as_millis() as u64, ?policy, "工单轮询已启动");
    }

    /// 停止定时刷新; 在途拉取允许完成但结果丢弃
    pub fn stop(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(handle) = timer.take() {
            handle.abort();
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            tracing::info!("工单轮询已停止");
        }
    }

    pub fn is_running(&self) -> bool {
        let timer = self.timer.lock().unwrap_or_else(|p| p.into_inner());
        timer.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// 暂停 / 恢复自动刷新（定时器保留）
    pub fn set_auto_refresh(&self, enabled: bool) {
        self.shared.enabled.store(enabled, Ordering::SeqCst);
        tracing::debug!(enabled, "自动刷新开关变更");
    }

    pub fn is_auto_refresh_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    /// 立即拉取并发布, 不受自动刷新开关影响
    pub async fn refresh_now(&self) -> anyhow::Result<RefreshSnapshot> {
        let declarations = self.shared.fetch(self.fetch_timeout).await?;
        self.shared.publish(declarations);
        Ok(self.latest())
    }
}

impl Drop for RefreshController {
    fn drop(&mut self) {
        let timer = match self.timer.get_mut() {
            Ok(timer) => timer,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = timer.take() {
            handle.abort();
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptySource;

    #[async_trait]
    impl RefreshSource for EmptySource {
        async fn fetch(&self) -> anyhow::Result<Vec<DowntimeDeclaration>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_overlap_policy_parse() {
        assert_eq!(OverlapPolicy::parse("SKIP"), Some(OverlapPolicy::Skip));
        assert_eq!(OverlapPolicy::parse(" allow "), Some(OverlapPolicy::Allow));
        assert_eq!(OverlapPolicy::parse("queue"), None);
        assert_eq!(OverlapPolicy::default(), OverlapPolicy::Skip);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_keeps_single_timer() {
        let controller = RefreshController::new(
            Arc::new(EmptySource),
            Duration::from_secs(30),
            OverlapPolicy::Skip,
        );
        controller.start();
        controller.start();
        assert!(controller.is_running());

        controller.stop();
        tokio::task::yield_now().await;
        assert!(!controller.is_running());
    }

    #[tokio::test]
    async fn test_refresh_now_increments_sequence() {
        let controller = RefreshController::new(
            Arc::new(EmptySource),
            Duration::from_secs(30),
            OverlapPolicy::Skip,
        );
        let first = controller.refresh_now().await.expect("refresh");
        let second = controller.refresh_now().await.expect("refresh");
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert!(second.fetched_at.is_some());
    }

    #[test]
    fn test_in_flight_guard_releases_on_drop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let first = InFlightGuard::enter(&counter);
        let second = InFlightGuard::enter(&counter);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        drop(first);
        drop(second);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
