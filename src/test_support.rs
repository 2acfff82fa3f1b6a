//! 测试用的假服务：生成服务、论文源、文本提取和日报投递

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use std::path::Path;

use crate::clients::{ChunkStream, GenerationService, PaperSource};
use crate::error::{AppError, AppResult, SourceError};
use crate::models::{Paper, ReportEntry, Topic};
use crate::services::{DigestSink, TextExtractor};

pub fn sample_paper(id: &str) -> Paper {
    Paper::new(
        id,
        format!("paper-{}", id),
        vec!["Alice".to_string()],
        format!("abstract of {}", id),
        format!("https://arxiv.org/pdf/{}", id),
        None,
    )
}

/// 标题形如 `paper-<评分>` 的论文，便于断言排序
pub fn rated_paper(id: &str, rating: u32) -> Paper {
    Paper::new(
        id,
        format!("paper-{}", rating),
        vec!["Bob".to_string()],
        "abstract",
        format!("https://arxiv.org/pdf/{}", id),
        None,
    )
}

/// 预设的一次响应
#[derive(Debug, Clone)]
pub enum Reply {
    Chunks(Vec<String>),
    Error(String),
    /// 先输出一段内容再中断
    BrokenStream(String),
    Delayed(Duration, String),
}

impl Reply {
    pub fn text(s: &str) -> Self {
        Reply::Chunks(vec![s.to_string()])
    }
}

/// 按顺序返回预设响应的生成服务，用完后一直返回错误
pub struct ScriptedService {
    replies: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
}

impl ScriptedService {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn fake_error(message: &str) -> AppError {
    AppError::llm_api_failed(
        "fake-model",
        std::io::Error::new(std::io::ErrorKind::Other, message.to_string()),
    )
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn stream_generate(&self, _model: &str, _prompt: &str) -> AppResult<ChunkStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match reply {
            Some(Reply::Chunks(chunks)) => {
                Ok(futures::stream::iter(chunks.into_iter().map(Ok)).boxed())
            }
            Some(Reply::Error(message)) => Err(fake_error(&message)),
            Some(Reply::BrokenStream(text)) => Ok(futures::stream::iter(vec![
                Ok(text),
                Err(fake_error("stream broken")),
            ])
            .boxed()),
            Some(Reply::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(futures::stream::iter(vec![Ok(text)]).boxed())
            }
            None => Err(fake_error("no scripted reply left")),
        }
    }
}

/// 并发统计，可在多个假服务之间共享
#[derive(Default)]
pub struct ConcurrencyStats {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    total: AtomicUsize,
}

impl ConcurrencyStats {
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

/// 从提示词中的标题 `paper-<评分>` 读出评分并原样返回的服务
pub struct EchoRatingService {
    pub id: usize,
    delay: Duration,
    stats: Arc<ConcurrencyStats>,
    seen: Arc<Mutex<Vec<(usize, String)>>>,
}

impl EchoRatingService {
    pub fn new(
        id: usize,
        delay: Duration,
        stats: Arc<ConcurrencyStats>,
        seen: Arc<Mutex<Vec<(usize, String)>>>,
    ) -> Self {
        Self {
            id,
            delay,
            stats,
            seen,
        }
    }
}

/// 构建一组共享统计的回声服务
pub fn echo_pool(
    size: usize,
    delay: Duration,
) -> (
    Vec<Arc<dyn GenerationService>>,
    Arc<ConcurrencyStats>,
    Arc<Mutex<Vec<(usize, String)>>>,
) {
    let stats = Arc::new(ConcurrencyStats::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let services = (0..size)
        .map(|id| {
            Arc::new(EchoRatingService::new(id, delay, stats.clone(), seen.clone()))
                as Arc<dyn GenerationService>
        })
        .collect();
    (services, stats, seen)
}

#[async_trait]
impl GenerationService for EchoRatingService {
    async fn stream_generate(&self, _model: &str, prompt: &str) -> AppResult<ChunkStream> {
        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.stats.total.fetch_add(1, Ordering::SeqCst);

        let title = prompt
            .lines()
            .find_map(|line| line.strip_prefix("标题："))
            .unwrap_or_default()
            .to_string();
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((self.id, title.clone()));

        tokio::time::sleep(self.delay).await;
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);

        let rating = title.strip_prefix("paper-").unwrap_or("50");
        let text = format!("1. 主要研究目标: {}\n6. 论文评分: {}", title, rating);
        Ok(futures::stream::iter(vec![Ok(text)]).boxed())
    }
}

/// 返回预设论文的论文源，查询为 "broken" 时返回错误
pub struct FakeSource {
    pub papers: Vec<Paper>,
}

#[async_trait]
impl PaperSource for FakeSource {
    async fn fetch(&self, query: &str, _since: DateTime<Utc>, _until: DateTime<Utc>) -> AppResult<Vec<Paper>> {
        if query == "broken" {
            return Err(AppError::Source(SourceError::BadStatus {
                endpoint: "fake".to_string(),
                status: 503,
            }));
        }
        Ok(self.papers.clone())
    }
}

/// 从不产出全文的提取器
pub struct NoExtractor;

#[async_trait]
impl TextExtractor for NoExtractor {
    async fn extract(&self, _path: &Path) -> Option<String> {
        None
    }
}

/// 记录每次投递的主题名和条目
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<(String, Vec<ReportEntry>)>>,
}

impl RecordingSink {
    pub fn delivered(&self) -> Vec<(String, Vec<ReportEntry>)> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DigestSink for RecordingSink {
    async fn deliver(&self, topic: &Topic, entries: &[ReportEntry]) -> AppResult<()> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((topic.name.clone(), entries.to_vec()));
        Ok(())
    }
}
