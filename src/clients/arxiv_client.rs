//! arXiv API 客户端
//!
//! 按提交时间倒序检索论文，解析 Atom 返回结果，并在遇到时间窗口外的论文时停止。

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, SourceError};
use crate::models::Paper;

const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";
/// 每页请求的条数
const PAGE_SIZE: usize = 100;
/// 翻页间隔，arXiv 要求连续请求之间至少间隔 3 秒
const PAGE_DELAY: Duration = Duration::from_secs(3);

/// 论文源
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// 检索 `[since, until]` 内发布的论文，按发布时间倒序
    async fn fetch(
        &self,
        query: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<Paper>>;
}

/// 计算检索时间窗口：`days_back` 天前的 0 点（UTC）到当前时刻
pub fn fetch_window(now: DateTime<Utc>, days_back: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let since = (now - ChronoDuration::days(days_back))
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc();
    (since, now)
}

#[derive(Clone)]
pub struct ArxivClient {
    http: Client,
    base: String,
    max_results: usize,
}

impl ArxivClient {
    pub fn new(max_results: usize) -> AppResult<Self> {
        Self::with_base(ARXIV_API_URL, max_results)
    }

    pub fn with_base(base: &str, max_results: usize) -> AppResult<Self> {
        let http = Client::builder()
            .user_agent("arxiv-digest/0.1")
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::source_request_failed(base, e))?;

        Ok(Self {
            http,
            base: base.to_string(),
            max_results,
        })
    }

    async fn fetch_page(&self, query: &str, start: usize, page_size: usize) -> AppResult<String> {
        debug!("请求 arXiv: query={} start={} size={}", query, start, page_size);

        let resp = self
            .http
            .get(&self.base)
            .query(&[("search_query", query)])
            .query(&[("start", start), ("max_results", page_size)])
            .query(&[("sortBy", "submittedDate"), ("sortOrder", "descending")])
            .header(ACCEPT, "application/atom+xml, application/xml;q=0.9")
            .send()
            .await
            .map_err(|e| AppError::source_request_failed(&self.base, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::BadStatus {
                endpoint: self.base.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        resp.text()
            .await
            .map_err(|e| AppError::source_request_failed(&self.base, e))
    }
}

#[async_trait]
impl PaperSource for ArxivClient {
    async fn fetch(
        &self,
        query: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<Paper>> {
        info!("🔍 检索 arXiv: {} ({} ~ {})", query, since, until);

        let mut papers = Vec::new();
        let mut start = 0;

        while start < self.max_results {
            let page_size = (self.max_results - start).min(PAGE_SIZE);
            let xml = self.fetch_page(query, start, page_size).await?;
            let entries = parse_atom_feed(&xml)?;
            let fetched = entries.len();

            let (mut selected, left_window) = take_within_window(entries, since, until);
            for paper in &selected {
                debug!("找到论文 {}: {}", papers.len() + 1, paper.title);
            }
            papers.append(&mut selected);

            if left_window || fetched < page_size {
                break;
            }
            start += page_size;
            tokio::time::sleep(PAGE_DELAY).await;
        }

        info!("✓ 共找到 {} 篇论文", papers.len());
        Ok(papers)
    }
}

/// Atom 中的一条记录
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub published_at: DateTime<Utc>,
    pub paper: Paper,
}

/// 按顺序取出窗口内的论文，遇到第一条窗口外的记录即停止
///
/// 返回 (窗口内论文, 是否已越过窗口)
pub fn take_within_window(
    entries: Vec<FeedEntry>,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> (Vec<Paper>, bool) {
    let mut papers = Vec::new();
    for entry in entries {
        if entry.published_at < since || entry.published_at > until {
            return (papers, true);
        }
        papers.push(entry.paper);
    }
    (papers, false)
}

#[derive(Default)]
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    pdf_url: Option<String>,
}

impl EntryBuilder {
    fn build(self) -> AppResult<FeedEntry> {
        let published_at = DateTime::parse_from_rfc3339(self.published.trim())
            .map_err(|e| SourceError::FeedParseFailed {
                message: format!("无法解析发布时间 '{}': {}", self.published, e),
            })?
            .with_timezone(&Utc);

        let arxiv_id = self
            .id
            .trim()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        if arxiv_id.is_empty() {
            return Err(SourceError::FeedParseFailed {
                message: "记录缺少 id".to_string(),
            }
            .into());
        }

        let pdf_url = self
            .pdf_url
            .unwrap_or_else(|| format!("https://arxiv.org/pdf/{}", arxiv_id));

        let paper = Paper::new(
            arxiv_id,
            collapse_whitespace(&self.title),
            self.authors,
            collapse_whitespace(&self.summary),
            pdf_url,
            Some(published_at.date_naive()),
        );

        Ok(FeedEntry {
            published_at,
            paper,
        })
    }
}

#[derive(Clone, Copy)]
enum TextTarget {
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
}

/// 解析 arXiv 返回的 Atom 文档
pub fn parse_atom_feed(xml: &str) -> AppResult<Vec<FeedEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<EntryBuilder> = None;
    let mut target: Option<TextTarget> = None;
    let mut text = String::new();

    loop {
        let event = reader.read_event().map_err(|e| SourceError::FeedParseFailed {
            message: format!("位置 {}: {}", reader.buffer_position(), e),
        })?;

        match event {
            Event::Start(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"entry" => current = Some(EntryBuilder::default()),
                    b"link" => {
                        if let Some(entry) = current.as_mut() {
                            read_pdf_link(&e, entry);
                        }
                    }
                    tag if current.is_some() => {
                        target = match tag {
                            b"id" => Some(TextTarget::Id),
                            b"title" => Some(TextTarget::Title),
                            b"summary" => Some(TextTarget::Summary),
                            b"published" => Some(TextTarget::Published),
                            b"name" => Some(TextTarget::AuthorName),
                            _ => None,
                        };
                        text.clear();
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"link" {
                    if let Some(entry) = current.as_mut() {
                        read_pdf_link(&e, entry);
                    }
                }
            }
            Event::Text(t) => {
                if target.is_some() {
                    let unescaped = t.unescape().map_err(|e| SourceError::FeedParseFailed {
                        message: e.to_string(),
                    })?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(t) => {
                if target.is_some() {
                    text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::End(e) => {
                let name = e.local_name();
                if name.as_ref() == b"entry" {
                    if let Some(entry) = current.take() {
                        entries.push(entry.build()?);
                    }
                    target = None;
                } else if let (Some(entry), Some(t)) = (current.as_mut(), target.take()) {
                    let value = std::mem::take(&mut text);
                    match t {
                        TextTarget::Id => entry.id = value,
                        TextTarget::Title => entry.title = value,
                        TextTarget::Summary => entry.summary = value,
                        TextTarget::Published => entry.published = value,
                        TextTarget::AuthorName => entry.authors.push(collapse_whitespace(&value)),
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

fn read_pdf_link(e: &BytesStart<'_>, entry: &mut EntryBuilder) {
    let mut href = None;
    let mut is_pdf = false;
    for attr in e.attributes().flatten() {
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_default();
        match attr.key.as_ref() {
            b"href" => href = Some(value),
            b"title" => is_pdf |= value == "pdf",
            b"type" => is_pdf |= value == "application/pdf",
            _ => {}
        }
    }
    if is_pdf {
        entry.pdf_url = href;
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
