//! # arXiv Digest
//!
//! 每天检索 arXiv 新论文，用多个 API 密钥并行总结、评分，并按评分生成日报
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（API 凭证），只暴露能力
//! - `CredentialPool` - 每个密钥一个客户端，按下标取模分配
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单篇论文
//! - `SummaryService` - 总结 + 评分，带重试
//! - `PdfCache` / `PdfTextExtractor` - 下载 PDF 和提取全文
//! - `DigestWriter` / `SmtpSink` - 写日报文件或发送邮件
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一篇论文"进入总结前的准备流程
//! - `PaperFlow` - 下载 PDF → 提取全文
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_scheduler` - 分批并行，批间冷却
//! - `orchestrator/serial_summarizer` - 串行模式，失败时轮换凭证
//! - `orchestrator/app` - 按主题执行并定时运行
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

/// 单元测试与集成测试共用的假服务
pub mod test_support;

// 重新导出常用类型
pub use clients::{ArxivClient, GenerationService, LlmClient, PaperSource};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{ClientHandle, CredentialPool};
pub use models::{Paper, ReportEntry, SummaryResult, Topic};
pub use orchestrator::{merge_and_sort, App, BatchScheduler, ParallelRunner, SerialSummarizer};
pub use services::{DigestSink, SummaryService};
pub use workflow::{PaperCtx, PaperFlow};
