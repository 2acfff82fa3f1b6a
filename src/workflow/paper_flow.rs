//! 论文预处理流程 - 流程层
//!
//! 流程顺序：
//! 1. 查找 / 下载 PDF
//! 2. 开启全文分析时提取全文
//!
//! 任何一步失败都只会让对应字段为空，论文仍然会进入总结。

use std::sync::Arc;
use tracing::{debug, info};

use crate::models::Paper;
use crate::services::{PdfCache, TextExtractor};
use crate::utils::truncate_text;

pub struct PaperFlow {
    /// 不下载 PDF 时为 None
    cache: Option<Arc<PdfCache>>,
    extractor: Arc<dyn TextExtractor>,
    full_text_analysis: bool,
}

impl PaperFlow {
    pub fn new(
        cache: Option<Arc<PdfCache>>,
        extractor: Arc<dyn TextExtractor>,
        full_text_analysis: bool,
    ) -> Self {
        Self {
            cache,
            extractor,
            full_text_analysis,
        }
    }

    /// 为一篇论文附加 PDF 路径和全文
    pub async fn prepare(&self, paper: Paper) -> Paper {
        let Some(cache) = &self.cache else {
            return paper;
        };

        let pdf_path = cache
            .download(&paper.pdf_url, &paper.arxiv_id, paper.published)
            .await;

        let full_text = match (&pdf_path, self.full_text_analysis) {
            (Some(path), true) => self.extractor.extract(path).await,
            _ => None,
        };

        debug!(
            "预处理 {}: pdf={} 全文={}",
            truncate_text(&paper.title, 30),
            pdf_path.is_some(),
            full_text.as_ref().map(|t| t.chars().count()).unwrap_or(0)
        );

        paper.with_pdf_path(pdf_path).with_full_text(full_text)
    }

    /// 依次预处理所有论文
    pub async fn prepare_all(&self, papers: Vec<Paper>) -> Vec<Paper> {
        if self.cache.is_none() {
            return papers;
        }

        info!("📥 开始下载 {} 篇论文的PDF...", papers.len());
        let mut prepared = Vec::with_capacity(papers.len());
        for paper in papers {
            prepared.push(self.prepare(paper).await);
        }

        let with_pdf = prepared.iter().filter(|p| p.pdf_path.is_some()).count();
        let with_text = prepared.iter().filter(|p| p.full_text.is_some()).count();
        info!("✓ PDF {}/{}，全文 {}/{}", with_pdf, prepared.len(), with_text, prepared.len());
        prepared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_paper;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::path::Path;
    use std::time::Duration;

    struct FixedExtractor(&'static str);

    #[async_trait]
    impl TextExtractor for FixedExtractor {
        async fn extract(&self, _path: &Path) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    async fn cache_with_file(dir: &Path, arxiv_id: &str, date: NaiveDate) -> Arc<PdfCache> {
        let cache = PdfCache::open(dir.join("papers"), dir.join("papers/db.json"), true)
            .await
            .unwrap()
            .with_backoff_base(Duration::ZERO);
        let folder = cache.date_folder(Some(date));
        tokio::fs::create_dir_all(&folder).await.unwrap();
        tokio::fs::write(folder.join(format!("{}.pdf", arxiv_id)), b"%PDF").await.unwrap();
        Arc::new(cache)
    }

    #[tokio::test]
    async fn test_prepare_attaches_path_and_text() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let cache = cache_with_file(dir.path(), "p1", date).await;

        let flow = PaperFlow::new(Some(cache), Arc::new(FixedExtractor("全文内容")), true);
        let mut paper = sample_paper("p1");
        paper.published = Some(date);

        let prepared = flow.prepare(paper).await;
        assert!(prepared.pdf_path.is_some());
        assert_eq!(prepared.full_text.as_deref(), Some("全文内容"));
    }

    #[tokio::test]
    async fn test_prepare_skips_extraction_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let cache = cache_with_file(dir.path(), "p1", date).await;

        let flow = PaperFlow::new(Some(cache), Arc::new(FixedExtractor("全文内容")), false);
        let mut paper = sample_paper("p1");
        paper.published = Some(date);

        let prepared = flow.prepare(paper).await;
        assert!(prepared.pdf_path.is_some());
        assert!(prepared.full_text.is_none());
    }

    #[tokio::test]
    async fn test_prepare_all_without_cache_is_identity() {
        let flow = PaperFlow::new(None, Arc::new(FixedExtractor("x")), true);
        let papers = vec![sample_paper("a"), sample_paper("b")];
        assert_eq!(flow.prepare_all(papers.clone()).await, papers);
    }
}
