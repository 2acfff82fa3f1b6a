//! 应用主结构 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：凭证池、论文源、PDF 缓存、日报输出
//! 2. **按主题处理**：检索 → 预处理 → 总结 → 投递，单个主题失败不影响其他主题
//! 3. **定时运行**：调试模式执行一次，否则每天在固定时间执行

use chrono::{Local, NaiveDateTime, NaiveTime, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::clients::{fetch_window, ArxivClient, GenerationService, LlmClient, PaperSource};
use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError};
use crate::infrastructure::CredentialPool;
use crate::models::{load_topics, Paper, ReportEntry, Topic};
use crate::orchestrator::batch_scheduler::BatchScheduler;
use crate::orchestrator::parallel_runner::ParallelRunner;
use crate::orchestrator::serial_summarizer::{SerialMode, SerialSummarizer};
use crate::services::{DigestSink, DigestWriter, PdfCache, PdfTextExtractor, SmtpSink, SummaryService};
use crate::utils::logging::{log_startup, print_topic_stats};
use crate::workflow::PaperFlow;

/// 总结模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarizerMode {
    /// 分批并行，参数为每批论文数
    BatchParallel(usize),
    /// 全部论文一次并行
    Parallel,
    /// 串行，失败时轮换凭证
    Serial,
}

impl SummarizerMode {
    pub fn from_config(config: &Config) -> Self {
        if !config.use_parallel {
            return SummarizerMode::Serial;
        }
        match config.effective_batch_size() {
            Some(size) => SummarizerMode::BatchParallel(size),
            None => SummarizerMode::Parallel,
        }
    }

    fn describe(&self) -> String {
        match self {
            SummarizerMode::BatchParallel(size) => format!("分批并行模式 (每批 {} 篇)", size),
            SummarizerMode::Parallel => "并行模式".to_string(),
            SummarizerMode::Serial => "串行模式".to_string(),
        }
    }
}

pub struct App {
    config: Config,
    pool: Arc<CredentialPool>,
    service: Arc<SummaryService>,
    source: Arc<dyn PaperSource>,
    flow: PaperFlow,
    sink: Arc<dyn DigestSink>,
}

impl App {
    /// 初始化应用
    ///
    /// 没有任何可用凭证时返回 `ConfigError::NoCredentials`，不会开始任何任务。
    pub async fn initialize(config: Config) -> AppResult<Self> {
        let base_url = config.llm_api_base_url.clone();
        let pool = CredentialPool::initialize(&config.llm_api_keys, |index, key| {
            let client = LlmClient::new(index, key, &base_url)?;
            Ok(Arc::new(client) as Arc<dyn GenerationService>)
        })?;
        info!("✓ 共初始化 {} 个API客户端", pool.size());

        let source = ArxivClient::new(config.arxiv_max_results)?;

        let cache = if config.download_pdfs {
            let cache = PdfCache::open(
                &config.pdf_base_dir,
                &config.pdf_db_file,
                config.organize_by_date,
            )
            .await?;
            Some(Arc::new(cache))
        } else {
            None
        };
        let flow = PaperFlow::new(
            cache,
            Arc::new(PdfTextExtractor::new(config.pdf_max_chars)),
            config.full_text_analysis,
        );

        let sink = build_sink(&config)?;

        Ok(Self::with_parts(config, pool, Arc::new(source), flow, sink))
    }

    /// 用已构建好的组件创建应用
    pub fn with_parts(
        config: Config,
        pool: CredentialPool,
        source: Arc<dyn PaperSource>,
        flow: PaperFlow,
        sink: Arc<dyn DigestSink>,
    ) -> Self {
        let service = Arc::new(SummaryService::new(&config));
        Self {
            config,
            pool: Arc::new(pool),
            service,
            source,
            flow,
            sink,
        }
    }

    pub fn mode(&self) -> SummarizerMode {
        SummarizerMode::from_config(&self.config)
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> AppResult<()> {
        log_startup(
            ParallelRunner::new(self.pool.clone(), self.service.clone(), self.config.max_workers)
                .max_workers(),
            &self.mode().describe(),
        );

        if self.config.debug_mode {
            info!("🔧 调试模式：立即执行一次任务");
            return self.run_task().await;
        }

        let at = parse_schedule_time(&self.config.schedule_time)?;
        loop {
            let now = Local::now().naive_local();
            let next = next_run_after(now, at);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!("⏰ 下次运行时间: {}", next.format("%Y-%m-%d %H:%M"));
            tokio::time::sleep(wait).await;

            if let Err(e) = self.run_task().await {
                error!("❌ 定时任务执行失败: {}", e);
            }
        }
    }

    /// 处理所有主题
    pub async fn run_task(&self) -> AppResult<()> {
        let topics = load_topics(Path::new(&self.config.topics_file)).await?;
        info!("📚 共 {} 个主题待处理", topics.len());

        for topic in &topics {
            if let Err(e) = self.process_topic(topic).await {
                error!("❌ 处理主题 {} 时出错: {}", topic.name, e);
            }
        }
        Ok(())
    }

    /// 检索、预处理、总结并投递一个主题的日报
    pub async fn process_topic(&self, topic: &Topic) -> AppResult<Vec<ReportEntry>> {
        let started = Instant::now();
        info!("🔍 正在检索主题: {} ({})", topic.name, topic.query);

        let (since, until) = fetch_window(Utc::now(), self.config.days_back);
        let papers = self.source.fetch(&topic.query, since, until).await?;
        if papers.is_empty() {
            warn!("主题 {} 没有找到新论文", topic.name);
            return Ok(Vec::new());
        }
        info!("✓ 主题 {} 找到 {} 篇论文", topic.name, papers.len());

        let papers = self.flow.prepare_all(papers).await;
        let entries = self.summarize(papers).await?;

        self.sink.deliver(topic, &entries).await?;
        print_topic_stats(&topic.name, entries.len(), started.elapsed());
        Ok(entries)
    }

    /// 按配置的模式总结论文
    pub async fn summarize(&self, papers: Vec<Paper>) -> AppResult<Vec<ReportEntry>> {
        match self.mode() {
            SummarizerMode::BatchParallel(size) => self.scheduler(Some(size)).run(papers).await,
            SummarizerMode::Parallel => self.scheduler(None).run(papers).await,
            SummarizerMode::Serial => {
                let mut serial = SerialSummarizer::new(
                    self.pool.clone(),
                    self.service.clone(),
                    SerialMode::from_config(&self.config),
                )
                .with_rotation_delay(self.config.serial_rotation_delay);
                Ok(serial.generate_daily_report(papers).await)
            }
        }
    }

    fn scheduler(&self, batch_size: Option<usize>) -> BatchScheduler {
        let runner = ParallelRunner::new(self.pool.clone(), self.service.clone(), self.config.max_workers);
        BatchScheduler::new(runner, batch_size, self.config.batch_cooldown)
    }
}

/// 配置了邮件时通过 SMTP 投递，否则写入日报文件
pub fn build_sink(config: &Config) -> AppResult<Arc<dyn DigestSink>> {
    match &config.email {
        Some(email) => {
            info!("📧 日报将通过邮件发送给 {} 位收件人", email.receiver_emails.len());
            Ok(Arc::new(SmtpSink::new(email, &config.llm_model_name)?))
        }
        None => {
            info!("📁 未配置邮件，日报写入目录: {}", config.digest_output_dir);
            Ok(Arc::new(DigestWriter::new(&config.digest_output_dir, &config.llm_model_name)))
        }
    }
}

/// 解析 `HH:MM` 格式的运行时间
pub fn parse_schedule_time(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| {
        AppError::Config(ConfigError::EnvVarParseFailed {
            var_name: "SCHEDULE_TIME".to_string(),
            value: value.to_string(),
            expected_type: "HH:MM".to_string(),
        })
    })
}

/// `now` 之后的下一个运行时刻，恰好等于 `at` 时推到第二天
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}
