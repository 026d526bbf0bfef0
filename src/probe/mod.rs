//! 探测模块
//!
//! 提供失败分类、单次HTTP探测和周期调度功能

pub mod classifier;
pub mod executor;
pub mod result;
pub mod scheduler;

// 重新导出主要类型
pub use classifier::{classify, Classification, FailureCategory, FaultKind, TransportFault};
pub use executor::{execute, HttpProber, PreparedRequest, ProbeError, ProbeTimeouts, Prober, Target};
pub use result::{format_elapsed, ProbeOutcome, ProbeResult};
pub use scheduler::{PollScheduler, RunSummary, SchedulerState};
