//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责并发调度和流程编排，不处理单篇论文的细节。
//!
//! ## 模块划分
//!
//! ### `app` - 应用主结构
//! - 初始化凭证池、论文源、PDF 缓存和日报输出
//! - 按主题执行 检索 → 预处理 → 总结 → 投递
//! - 每日定时运行
//!
//! ### `batch_scheduler` - 分批调度
//! - 把论文切成连续批次，批次之间有硬屏障和冷却时间
//!
//! ### `parallel_runner` - 单批并行
//! - Semaphore 限制并发，每篇论文一个任务
//!
//! ### `serial_summarizer` - 串行总结
//! - 失败时轮换凭证，同一篇论文不设重试上限
//!
//! ### `aggregator` - 结果汇总
//! - 合并结果并按评分稳定排序
//!
//! ## 层次关系
//!
//! ```text
//! app (处理 Vec<Topic>)
//!     ↓
//! batch_scheduler / serial_summarizer (处理 Vec<Paper>)
//!     ↓
//! parallel_runner (处理一批 Paper)
//!     ↓
//! services::SummaryService (处理单篇 Paper)
//!     ↓
//! infrastructure::CredentialPool (凭证)
//! ```

pub mod aggregator;
pub mod app;
pub mod batch_scheduler;
pub mod parallel_runner;
pub mod serial_summarizer;

// 重新导出主要类型
pub use aggregator::merge_and_sort;
pub use app::{next_run_after, parse_schedule_time, App, SummarizerMode};
pub use batch_scheduler::{partition, BatchScheduler};
pub use parallel_runner::ParallelRunner;
pub use serial_summarizer::{SerialMode, SerialSummarizer};
