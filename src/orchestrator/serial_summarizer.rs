//! 串行总结 - 编排层
//!
//! 并行模式关闭时使用：一次只总结一篇论文，失败时切换到下一个凭证。

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::infrastructure::CredentialPool;
use crate::config::Config;
use crate::models::{Paper, ReportEntry, SummaryResult, DEFAULT_RATING};
use crate::orchestrator::aggregator::merge_and_sort;
use crate::services::{build_prompt, build_summary_prompt, extract_rating, SummaryService};
use crate::utils::truncate_text;

/// 串行模式的提示词和结果排列方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialMode {
    /// 7 部分提示词，按评分从高到低排列
    Rated,
    /// 5 部分提示词，不评分，保持输入顺序
    SummaryOnly,
}

impl SerialMode {
    pub fn from_config(config: &Config) -> Self {
        if config.serial_rating {
            SerialMode::Rated
        } else {
            SerialMode::SummaryOnly
        }
    }
}

/// 串行总结器
///
/// 持有一个轮换游标：调用出错或响应为空时游标前移（到末尾后回到开头），
/// 并用新凭证重试同一篇论文。
///
/// 注意：与并行模式的 3 次上限不同，这里对同一篇论文**没有重试上限**。
/// 所有凭证持续失败时会一直轮换下去，可通过 `with_rotation_delay`
/// 在每次切换后暂停，降低请求频率。
pub struct SerialSummarizer {
    pool: Arc<CredentialPool>,
    service: Arc<SummaryService>,
    mode: SerialMode,
    rotation_delay: Duration,
    cursor: usize,
}

impl SerialSummarizer {
    pub fn new(pool: Arc<CredentialPool>, service: Arc<SummaryService>, mode: SerialMode) -> Self {
        Self {
            pool,
            service,
            mode,
            rotation_delay: Duration::ZERO,
            cursor: 0,
        }
    }

    pub fn with_rotation_delay(mut self, rotation_delay: Duration) -> Self {
        self.rotation_delay = rotation_delay;
        self
    }

    /// 当前使用的凭证下标
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub async fn generate_daily_report(&mut self, papers: Vec<Paper>) -> Vec<ReportEntry> {
        let total = papers.len();
        let mut results = Vec::with_capacity(total);

        for (i, paper) in papers.into_iter().enumerate() {
            info!("📄 [{}/{}] 正在总结: {}", i + 1, total, truncate_text(&paper.title, 40));
            let result = self.summarize_until_success(&paper).await;
            results.push((paper, result));
        }

        match self.mode {
            SerialMode::Rated => merge_and_sort(results),
            SerialMode::SummaryOnly => results
                .into_iter()
                .map(|(paper, result)| ReportEntry::from_parts(paper, result))
                .collect(),
        }
    }

    async fn summarize_until_success(&mut self, paper: &Paper) -> SummaryResult {
        let prompt = match self.mode {
            SerialMode::Rated => build_prompt(paper, self.service.full_text_analysis()).1,
            SerialMode::SummaryOnly => build_summary_prompt(paper),
        };

        loop {
            let handle = self.pool.client_at(self.cursor);
            match self.service.generate_once(handle, &prompt).await {
                Ok(response) if !response.trim().is_empty() => {
                    let rating = match self.mode {
                        SerialMode::Rated => extract_rating(&response),
                        SerialMode::SummaryOnly => DEFAULT_RATING,
                    };
                    return SummaryResult::new(response, rating);
                }
                Ok(_) => warn!("[凭证 {}] API响应为空，切换凭证", handle.index()),
                Err(e) => warn!("[凭证 {}] 总结失败: {}，切换凭证", handle.index(), e),
            }

            self.cursor = (self.cursor + 1) % self.pool.size();
            if !self.rotation_delay.is_zero() {
                tokio::time::sleep(self.rotation_delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::GenerationService;
    use crate::test_support::{echo_pool, rated_paper, Reply, ScriptedService};

    fn service() -> Arc<SummaryService> {
        Arc::new(SummaryService::new(&Config::default()))
    }

    #[tokio::test]
    async fn test_rotates_on_error_and_empty() {
        let erroring = Arc::new(ScriptedService::new(vec![Reply::Error("quota".into())]));
        let empty = Arc::new(ScriptedService::new(vec![Reply::text("   ")]));
        let working = Arc::new(ScriptedService::new(vec![
            Reply::text("6. 论文评分: 60"),
            Reply::text("6. 论文评分: 70"),
        ]));
        let services: Vec<Arc<dyn GenerationService>> = vec![
            erroring.clone() as Arc<dyn GenerationService>,
            empty.clone() as Arc<dyn GenerationService>,
            working.clone() as Arc<dyn GenerationService>,
        ];
        let pool = Arc::new(CredentialPool::from_services(services).unwrap());

        let mut summarizer = SerialSummarizer::new(pool, service(), SerialMode::SummaryOnly);
        let entries = summarizer
            .generate_daily_report(vec![rated_paper("a", 1), rated_paper("b", 2)])
            .await;

        assert_eq!(erroring.calls(), 1);
        assert_eq!(empty.calls(), 1);
        // 成功后游标保持不动，第二篇继续使用同一个凭证
        assert_eq!(working.calls(), 2);
        assert_eq!(summarizer.cursor(), 2);
        assert_eq!(entries[0].arxiv_id, "a");
        assert_eq!(entries[1].arxiv_id, "b");
    }

    #[tokio::test]
    async fn test_summary_only_mode_skips_rating() {
        let (services, _, seen) = echo_pool(1, Duration::ZERO);
        let pool = Arc::new(CredentialPool::from_services(services).unwrap());

        let mut summarizer = SerialSummarizer::new(pool, service(), SerialMode::SummaryOnly);
        let entries = summarizer
            .generate_daily_report(vec![rated_paper("a", 30), rated_paper("b", 95)])
            .await;

        // 不排序，评分固定为默认值
        let ids: Vec<&str> = entries.iter().map(|e| e.arxiv_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(entries.iter().all(|e| e.rating == DEFAULT_RATING));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_mode_from_config() {
        let mut config = Config::default();
        assert_eq!(SerialMode::from_config(&config), SerialMode::Rated);
        config.serial_rating = false;
        assert_eq!(SerialMode::from_config(&config), SerialMode::SummaryOnly);
    }

    #[tokio::test]
    async fn test_retries_same_paper_past_parallel_limit() {
        // 同一篇论文失败 4 次仍会继续重试，游标回绕到开头
        let first = Arc::new(ScriptedService::new(vec![
            Reply::Error("1".into()),
            Reply::Error("3".into()),
            Reply::text("6. 论文评分: 88"),
        ]));
        let second = Arc::new(ScriptedService::new(vec![
            Reply::Error("2".into()),
            Reply::Error("4".into()),
        ]));
        let services: Vec<Arc<dyn GenerationService>> = vec![
            first.clone() as Arc<dyn GenerationService>,
            second.clone() as Arc<dyn GenerationService>,
        ];
        let pool = Arc::new(CredentialPool::from_services(services).unwrap());

        let mut summarizer = SerialSummarizer::new(pool, service(), SerialMode::Rated)
            .with_rotation_delay(Duration::from_millis(1));
        let entries = summarizer.generate_daily_report(vec![rated_paper("a", 1)]).await;

        assert_eq!(first.calls(), 3);
        assert_eq!(second.calls(), 2);
        assert_eq!(summarizer.cursor(), 0);
        assert_eq!(entries[0].rating, 88);
    }

    #[tokio::test]
    async fn test_rated_mode_sorts_descending() {
        let (services, _, _) = echo_pool(2, Duration::ZERO);
        let pool = Arc::new(CredentialPool::from_services(services).unwrap());

        let mut summarizer = SerialSummarizer::new(pool, service(), SerialMode::Rated);
        let entries = summarizer
            .generate_daily_report(vec![rated_paper("a", 30), rated_paper("b", 95), rated_paper("c", 60)])
            .await;

        let ratings: Vec<u32> = entries.iter().map(|e| e.rating).collect();
        assert_eq!(ratings, vec![95, 60, 30]);
    }
}
