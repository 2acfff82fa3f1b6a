use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 无法得到评分时使用的默认分数
pub const DEFAULT_RATING: u32 = 50;

/// 一篇论文
///
/// 由论文源产生，核心流程只读不改；`pdf_path` 和 `full_text`
/// 由 PDF 预处理步骤通过 `with_*` 生成新的记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub pdf_url: String,
    #[serde(default)]
    pub published: Option<NaiveDate>,
    pub arxiv_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<PathBuf>,
}

impl Paper {
    pub fn new(
        arxiv_id: impl Into<String>,
        title: impl Into<String>,
        authors: Vec<String>,
        abstract_text: impl Into<String>,
        pdf_url: impl Into<String>,
        published: Option<NaiveDate>,
    ) -> Self {
        Self {
            title: title.into(),
            authors,
            abstract_text: abstract_text.into(),
            pdf_url: pdf_url.into(),
            published,
            arxiv_id: arxiv_id.into(),
            full_text: None,
            pdf_path: None,
        }
    }

    pub fn with_pdf_path(self, pdf_path: Option<PathBuf>) -> Self {
        Self { pdf_path, ..self }
    }

    pub fn with_full_text(self, full_text: Option<String>) -> Self {
        Self { full_text, ..self }
    }

    /// 发布日期（YYYY-MM-DD），缺失时为 "N/A"
    pub fn published_label(&self) -> String {
        self.published
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "N/A".to_string())
    }
}

/// 单篇论文的总结结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResult {
    pub summary_text: String,
    /// 1-100
    pub rating: u32,
    /// 是否为失败后的占位结果
    pub degraded: bool,
}

impl SummaryResult {
    pub fn new(summary_text: impl Into<String>, rating: u32) -> Self {
        Self {
            summary_text: summary_text.into(),
            rating,
            degraded: false,
        }
    }

    /// 总结失败时的占位结果
    pub fn placeholder(summary_text: impl Into<String>) -> Self {
        Self {
            summary_text: summary_text.into(),
            rating: DEFAULT_RATING,
            degraded: true,
        }
    }
}

/// 日报中的一条记录：论文信息 + 总结结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub title: String,
    pub authors: Vec<String>,
    pub arxiv_id: String,
    pub pdf_url: String,
    pub published: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub summary: String,
    pub rating: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<PathBuf>,
}

impl ReportEntry {
    pub fn from_parts(paper: Paper, result: SummaryResult) -> Self {
        let published = paper.published_label();
        Self {
            title: paper.title,
            authors: paper.authors,
            arxiv_id: paper.arxiv_id,
            pdf_url: paper.pdf_url,
            published,
            abstract_text: paper.abstract_text,
            summary: result.summary_text,
            rating: result.rating,
            pdf_path: paper.pdf_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_entry_defaults_missing_date() {
        let paper = Paper::new("2401.00001v1", "标题", vec!["张三".into()], "摘要", "https://arxiv.org/pdf/2401.00001v1", None);
        let entry = ReportEntry::from_parts(paper, SummaryResult::new("总结", 88));

        assert_eq!(entry.published, "N/A");
        assert_eq!(entry.rating, 88);
        assert_eq!(entry.summary, "总结");
        assert!(entry.pdf_path.is_none());
    }

    #[test]
    fn test_report_entry_keeps_pdf_path() {
        let paper = Paper::new(
            "2401.00002v1",
            "标题",
            vec![],
            "摘要",
            "https://arxiv.org/pdf/2401.00002v1",
            NaiveDate::from_ymd_opt(2024, 1, 2),
        )
        .with_pdf_path(Some(PathBuf::from("papers/2024/01/02/2401.00002v1.pdf")));

        let entry = ReportEntry::from_parts(paper, SummaryResult::placeholder("总结失败: 超时"));
        assert_eq!(entry.published, "2024-01-02");
        assert_eq!(entry.rating, DEFAULT_RATING);
        assert_eq!(
            entry.pdf_path.as_deref(),
            Some(std::path::Path::new("papers/2024/01/02/2401.00002v1.pdf"))
        );
    }

    #[test]
    fn test_report_entry_serializes_abstract_field() {
        let paper = Paper::new("id", "t", vec![], "摘要内容", "u", None);
        let entry = ReportEntry::from_parts(paper, SummaryResult::new("s", 1));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["abstract"], "摘要内容");
        assert!(json.get("pdf_path").is_none());
    }
}
