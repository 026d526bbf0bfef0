//! 轮询调度器测试
//!
//! 在暂停的时钟下验证轮次数量、并发扇出和停止行为

use async_trait::async_trait;
use latency_monitor::config::EndpointSpec;
use latency_monitor::probe::{PollScheduler, ProbeResult, Prober, SchedulerState};
use latency_monitor::sink::ResultSink;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 固定耗时的探测器
struct DelayProber {
    delay: Duration,
    completed: AtomicU64,
}

impl DelayProber {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            completed: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl Prober for DelayProber {
    async fn probe(&self, endpoint: &EndpointSpec) -> ProbeResult {
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        ProbeResult::success(endpoint.name.clone(), 200, self.delay)
    }
}

#[derive(Default)]
struct RecordingSink {
    ticks: Mutex<Vec<u64>>,
    logged: Mutex<Vec<String>>,
    displayed: Mutex<Vec<String>>,
}

impl ResultSink for RecordingSink {
    fn tick_started(&self, tick: u64) {
        self.ticks.lock().unwrap().push(tick);
    }

    fn log_result(&self, result: &ProbeResult) {
        self.logged.lock().unwrap().push(result.log_line());
    }

    fn display(&self, line: &str) {
        self.displayed.lock().unwrap().push(line.to_string());
    }

    fn lifecycle(&self, _message: &str) {}
}

fn endpoints(count: usize) -> Vec<EndpointSpec> {
    (0..count)
        .map(|i| EndpointSpec::new(format!("ep{i}"), "GET", format!("http://localhost/{i}")))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_ticks_follow_interval_and_fan_out_per_endpoint() {
    let prober = DelayProber::new(Duration::from_millis(10));
    let sink = Arc::new(RecordingSink::default());
    let scheduler = PollScheduler::new(
        endpoints(3),
        Duration::from_secs(1),
        Duration::from_secs(5),
        prober.clone(),
        sink.clone(),
    );

    let summary = scheduler.run().await.unwrap();

    assert!(
        (4..=5).contains(&summary.ticks),
        "unexpected tick count {}",
        summary.ticks
    );
    assert_eq!(summary.probes_launched, summary.ticks * 3);
    assert_eq!(scheduler.state().await, SchedulerState::Stopped);

    let ticks = sink.ticks.lock().unwrap().clone();
    assert_eq!(ticks, (1..=summary.ticks).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn test_slow_probes_do_not_block_ticks() {
    // 探测耗时是间隔的三倍
    let prober = DelayProber::new(Duration::from_secs(3));
    let sink = Arc::new(RecordingSink::default());
    let scheduler = PollScheduler::new(
        endpoints(2),
        Duration::from_secs(1),
        Duration::from_secs(5),
        prober.clone(),
        sink.clone(),
    );

    let summary = scheduler.run().await.unwrap();

    assert!(summary.ticks >= 4);
    assert_eq!(summary.probes_launched, summary.ticks * 2);
    // 停止时仍有探测在进行
    assert!(prober.completed.load(Ordering::SeqCst) < summary.probes_launched);

    // 进行中的探测不会被中断，最终全部完成并输出
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(
        prober.completed.load(Ordering::SeqCst),
        summary.probes_launched
    );
    assert_eq!(
        sink.displayed.lock().unwrap().len() as u64,
        summary.probes_launched
    );
    assert_eq!(
        sink.logged.lock().unwrap().len() as u64,
        summary.probes_launched
    );
}

#[tokio::test(start_paused = true)]
async fn test_no_ticks_after_stop() {
    let prober = DelayProber::new(Duration::from_millis(1));
    let sink = Arc::new(RecordingSink::default());
    let scheduler = PollScheduler::new(
        endpoints(1),
        Duration::from_secs(1),
        Duration::from_secs(3),
        prober.clone(),
        sink.clone(),
    );

    let summary = scheduler.run().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(sink.ticks.lock().unwrap().len() as u64, summary.ticks);
    assert_eq!(scheduler.summary(), summary);
}

#[tokio::test(start_paused = true)]
async fn test_zero_endpoints_still_ticks() {
    let prober = DelayProber::new(Duration::from_millis(1));
    let sink = Arc::new(RecordingSink::default());
    let scheduler = PollScheduler::new(
        Vec::new(),
        Duration::from_secs(1),
        Duration::from_secs(3),
        prober.clone(),
        sink.clone(),
    );

    let summary = scheduler.run().await.unwrap();

    assert!(summary.ticks >= 2);
    assert_eq!(summary.probes_launched, 0);
    assert!(sink.displayed.lock().unwrap().is_empty());
}
