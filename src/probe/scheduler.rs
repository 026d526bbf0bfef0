//! 轮询调度器模块
//!
//! 按固定间隔对所有端点并发发起探测，并在总运行时长结束后停止

use crate::config::{Config, EndpointSpec};
use crate::probe::executor::{execute, Prober};
use crate::sink::ResultSink;
use anyhow::{bail, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// 调度器状态，`Stopped` 为终态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// 尚未启动
    Idle,
    /// 运行中
    Running,
    /// 已停止
    Stopped,
}

/// 一次运行的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// 触发的轮次
    pub ticks: u64,
    /// 发起的探测数
    pub probes_launched: u64,
}

/// 轮询调度器
///
/// 每一轮为每个端点启动一个独立任务，任务句柄不保留：调度器不等待
/// 本轮探测完成就可以进入下一轮，探测耗时超过间隔时多轮探测会重叠，
/// 也没有背压。停止只影响后续轮次，进行中的探测不会被中断。
pub struct PollScheduler {
    /// 端点列表，只读共享
    endpoints: Arc<[EndpointSpec]>,
    /// 探测间隔
    interval: Duration,
    /// 总运行时长
    run_duration: Duration,
    /// 探测器
    prober: Arc<dyn Prober>,
    /// 结果输出
    sink: Arc<dyn ResultSink>,
    /// 调度器状态
    state: RwLock<SchedulerState>,
    /// 已触发轮次
    ticks: Arc<AtomicU64>,
    /// 已发起探测数
    probes_launched: Arc<AtomicU64>,
}

impl PollScheduler {
    /// 创建新的调度器
    ///
    /// # 参数
    /// * `endpoints` - 端点列表
    /// * `interval` - 探测间隔
    /// * `run_duration` - 总运行时长
    /// * `prober` - 探测器
    /// * `sink` - 结果输出
    pub fn new(
        endpoints: Vec<EndpointSpec>,
        interval: Duration,
        run_duration: Duration,
        prober: Arc<dyn Prober>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            endpoints: endpoints.into(),
            interval,
            run_duration,
            prober,
            sink,
            state: RwLock::new(SchedulerState::Idle),
            ticks: Arc::new(AtomicU64::new(0)),
            probes_launched: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 按配置中的时间策略创建调度器
    pub fn from_config(config: &Config, prober: Arc<dyn Prober>, sink: Arc<dyn ResultSink>) -> Self {
        Self::new(
            config.endpoints.clone(),
            config.timings.interval(),
            config.timings.run_duration(),
            prober,
            sink,
        )
    }

    /// 当前状态
    pub async fn state(&self) -> SchedulerState {
        *self.state.read().await
    }

    /// 端点数量
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// 当前统计
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            ticks: self.ticks.load(Ordering::SeqCst),
            probes_launched: self.probes_launched.load(Ordering::SeqCst),
        }
    }

    /// 运行调度器直到总运行时长结束
    ///
    /// 返回时后续轮次已停止，但最后一轮中的探测可能仍在进行。
    pub async fn run(&self) -> Result<RunSummary> {
        {
            let mut state = self.state.write().await;
            if *state != SchedulerState::Idle {
                bail!("调度器只能启动一次，当前状态: {:?}", *state);
            }
            if self.interval.is_zero() {
                bail!("探测间隔必须大于0");
            }
            *state = SchedulerState::Running;
        }

        info!(
            "启动轮询调度器，端点数量: {}，间隔: {:?}，运行时长: {:?}",
            self.endpoints.len(),
            self.interval,
            self.run_duration
        );

        let (stop_tx, stop_rx) = oneshot::channel();
        let dispatcher = tokio::spawn(Self::dispatch_loop(
            Arc::clone(&self.endpoints),
            self.interval,
            Arc::clone(&self.prober),
            Arc::clone(&self.sink),
            Arc::clone(&self.ticks),
            Arc::clone(&self.probes_launched),
            stop_rx,
        ));

        tokio::time::sleep(self.run_duration).await;

        debug!("运行时长已到，发送停止信号");
        let _ = stop_tx.send(());
        if let Err(e) = dispatcher.await {
            error!("调度循环异常退出: {}", e);
        }

        *self.state.write().await = SchedulerState::Stopped;

        let summary = self.summary();
        info!(
            "轮询调度器已停止，共 {} 轮，发起 {} 次探测",
            summary.ticks, summary.probes_launched
        );
        Ok(summary)
    }

    /// 调度循环：每轮输出分隔行并为每个端点启动探测任务
    async fn dispatch_loop(
        endpoints: Arc<[EndpointSpec]>,
        period: Duration,
        prober: Arc<dyn Prober>,
        sink: Arc<dyn ResultSink>,
        ticks: Arc<AtomicU64>,
        probes_launched: Arc<AtomicU64>,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        // 与 ticker 一致：第一轮在一个间隔之后触发
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = &mut stop_rx => break,
                _ = ticker.tick() => {
                    let tick = ticks.fetch_add(1, Ordering::SeqCst) + 1;
                    sink.tick_started(tick);

                    for index in 0..endpoints.len() {
                        Self::spawn_probe(
                            Arc::clone(&endpoints),
                            index,
                            Arc::clone(&prober),
                            Arc::clone(&sink),
                        );
                        probes_launched.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        }

        debug!("调度循环已退出");
    }

    /// 启动一个不等待完成的探测任务
    ///
    /// 任务句柄直接丢弃，停止调度后已启动的探测仍会完成并输出。
    fn spawn_probe(
        endpoints: Arc<[EndpointSpec]>,
        index: usize,
        prober: Arc<dyn Prober>,
        sink: Arc<dyn ResultSink>,
    ) {
        tokio::spawn(async move {
            let line = execute(prober.as_ref(), sink.as_ref(), &endpoints[index]).await;
            sink.display(&line);
        });
    }
}
