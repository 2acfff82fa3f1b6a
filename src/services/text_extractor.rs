//! PDF 文本提取

use async_trait::async_trait;
use std::path::Path;
use tokio::task;
use tracing::{debug, warn};

/// 提取结果少于该字符数时视为失败
pub const MIN_EXTRACTED_CHARS: usize = 100;

/// 文本提取器，失败时返回 None
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Option<String>;
}

/// 基于 pdf-extract 的提取器
#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor {
    max_chars: Option<usize>,
}

impl PdfTextExtractor {
    /// `max_chars` 为 0 时不截断
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: (max_chars > 0).then_some(max_chars),
        }
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, path: &Path) -> Option<String> {
        let owned = path.to_path_buf();
        // pdf-extract 遇到损坏的文件可能 panic，放到阻塞线程里隔离
        let text = match task::spawn_blocking(move || pdf_extract::extract_text(&owned)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("PDF 文本提取失败 {}: {:?}", path.display(), e);
                return None;
            }
            Err(e) => {
                warn!("PDF 文本提取任务异常 {}: {}", path.display(), e);
                return None;
            }
        };

        let cleaned = clean_extracted(&text, self.max_chars);
        match &cleaned {
            Some(t) => debug!("提取全文 {} 字符: {}", t.chars().count(), path.display()),
            None => warn!("提取的文本太短，可能提取失败: {}", path.display()),
        }
        cleaned
    }
}

/// 过短的结果视为失败，过长的按字符截断
pub fn clean_extracted(text: &str, max_chars: Option<usize>) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_EXTRACTED_CHARS {
        return None;
    }
    Some(match max_chars {
        Some(limit) => trimmed.chars().take(limit).collect(),
        None => trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_rejects_short_text() {
        assert_eq!(clean_extracted("   short   ", None), None);
        assert_eq!(clean_extracted(&"a".repeat(99), None), None);
        assert!(clean_extracted(&"a".repeat(100), None).is_some());
    }

    #[test]
    fn test_clean_truncates_by_chars() {
        let text = "论".repeat(300);
        let cleaned = clean_extracted(&text, Some(150)).unwrap();
        assert_eq!(cleaned.chars().count(), 150);
    }

    #[tokio::test]
    async fn test_extract_missing_file_is_none() {
        let extractor = PdfTextExtractor::new(0);
        let dir = tempfile::tempdir().unwrap();
        assert!(extractor.extract(&dir.path().join("missing.pdf")).await.is_none());
    }

    #[tokio::test]
    async fn test_extract_garbage_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        tokio::fs::write(&path, b"this is not a pdf").await.unwrap();
        assert!(PdfTextExtractor::new(0).extract(&path).await.is_none());
    }
}
