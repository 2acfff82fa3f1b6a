//! 论文总结服务 - 业务能力层
//!
//! 只负责"用指定凭证总结一篇论文"，不关心批次和并发。
//! 失败会被转换为评分 50 的占位结果，从不向调用方抛出。

use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};
use crate::infrastructure::ClientHandle;
use crate::models::{Paper, SummaryResult};
use crate::services::prompt::build_prompt;
use crate::services::rating::extract_rating;
use crate::utils::truncate_text;

/// 单篇论文的最大尝试次数
pub const MAX_ATTEMPTS: usize = 3;

/// 响应为空时的占位文本
pub const EMPTY_RESPONSE_MESSAGE: &str = "API响应为空，请稍后重试。";

/// 一次调用的结果
enum Attempt {
    Success(String),
    Empty,
    Failed(AppError),
}

/// 论文总结服务
#[derive(Debug, Clone)]
pub struct SummaryService {
    model_name: String,
    full_text_analysis: bool,
    max_attempts: usize,
    retry_cooldown: Duration,
    request_timeout: Option<Duration>,
}

impl SummaryService {
    pub fn new(config: &Config) -> Self {
        Self {
            model_name: config.llm_model_name.clone(),
            full_text_analysis: config.full_text_analysis,
            max_attempts: MAX_ATTEMPTS,
            retry_cooldown: config.retry_cooldown,
            request_timeout: config.request_timeout,
        }
    }

    pub fn with_retry_cooldown(mut self, retry_cooldown: Duration) -> Self {
        self.retry_cooldown = retry_cooldown;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Option<Duration>) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 用指定凭证总结一篇论文
    ///
    /// 最多尝试 3 次，每次失败（调用出错或响应为空）后等待冷却时间，
    /// 仍使用同一个凭证重试。全部失败时返回评分为 50 的占位结果。
    /// 整个过程占用该凭证的通道。
    pub async fn summarize(&self, paper: &Paper, handle: &ClientHandle) -> SummaryResult {
        let _lane = handle.acquire().await;
        self.summarize_in_lane(paper, handle).await
    }

    /// 同 `summarize`，调用方须已持有 `handle.acquire()` 返回的通道
    pub async fn summarize_in_lane(&self, paper: &Paper, handle: &ClientHandle) -> SummaryResult {
        let (kind, prompt) = build_prompt(paper, self.full_text_analysis);
        let worker = handle.index();
        debug!("[凭证 {}] 使用 {:?} 提示词: {}", worker, kind, truncate_text(&paper.title, 30));

        for attempt in 1..=self.max_attempts {
            let is_last = attempt == self.max_attempts;

            match self.attempt(handle, &prompt).await {
                Attempt::Success(response) => {
                    let rating = extract_rating(&response);
                    info!(
                        "[凭证 {}] ✓ 成功总结论文: {}... (评分 {})",
                        worker,
                        truncate_text(&paper.title, 30),
                        rating
                    );
                    return SummaryResult::new(response, rating);
                }
                Attempt::Empty if is_last => {
                    warn!("[凭证 {}] API响应为空，已达到最大尝试次数", worker);
                    return SummaryResult::placeholder(EMPTY_RESPONSE_MESSAGE);
                }
                Attempt::Empty => {
                    warn!("[凭证 {}] API响应为空，重试 ({}/{})...", worker, attempt, self.max_attempts);
                }
                Attempt::Failed(e) if is_last => {
                    warn!("[凭证 {}] 总结失败: {}", worker, e);
                    return SummaryResult::placeholder(format!("总结失败: {}", e));
                }
                Attempt::Failed(e) => {
                    warn!("[凭证 {}] 总结失败: {}，重试 ({}/{})...", worker, e, attempt, self.max_attempts);
                }
            }

            tokio::time::sleep(self.retry_cooldown).await;
        }

        // max_attempts 为 0 时才会走到这里
        SummaryResult::placeholder(EMPTY_RESPONSE_MESSAGE)
    }

    /// 调用一次生成服务并拼接流式响应，不做重试
    ///
    /// 串行模式直接使用此方法，自行决定如何切换凭证。
    pub async fn generate_once(&self, handle: &ClientHandle, prompt: &str) -> AppResult<String> {
        let _lane = handle.acquire().await;
        self.generate_in_lane(handle, prompt).await
    }

    async fn generate_in_lane(&self, handle: &ClientHandle, prompt: &str) -> AppResult<String> {
        let call = collect_response(handle, &self.model_name, prompt);
        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                AppError::Llm(LlmError::Timeout {
                    model: self.model_name.clone(),
                    seconds: limit.as_secs(),
                })
            })?,
            None => call.await,
        }
    }

    pub fn full_text_analysis(&self) -> bool {
        self.full_text_analysis
    }

    async fn attempt(&self, handle: &ClientHandle, prompt: &str) -> Attempt {
        match self.generate_in_lane(handle, prompt).await {
            Ok(response) if response.trim().is_empty() => Attempt::Empty,
            Ok(response) => Attempt::Success(response),
            Err(e) => Attempt::Failed(e),
        }
    }
}

async fn collect_response(handle: &ClientHandle, model: &str, prompt: &str) -> AppResult<String> {
    let mut stream = handle.service().stream_generate(model, prompt).await?;
    let mut response = String::new();
    while let Some(chunk) = stream.next().await {
        response.push_str(&chunk?);
    }
    Ok(response)
}
