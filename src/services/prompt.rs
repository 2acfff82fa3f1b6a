//! 论文总结提示词

use crate::models::Paper;

/// 全文少于等于该字符数时视为不可用，退回摘要提示词
pub const MIN_FULL_TEXT_CHARS: usize = 200;

/// 每个部分的字数上限
const SECTION_CHAR_LIMIT: usize = 200;

/// 不评分的提示词每个部分的字数上限
const SUMMARY_SECTION_CHAR_LIMIT: usize = 100;

/// 使用的提示词模板
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// 只基于摘要
    AbstractOnly,
    /// 摘要 + 全文
    FullText,
}

/// 根据配置和全文可用性选择模板
pub fn select_prompt_kind(paper: &Paper, full_text_analysis: bool) -> PromptKind {
    let has_full_text = paper
        .full_text
        .as_deref()
        .is_some_and(|text| text.chars().count() > MIN_FULL_TEXT_CHARS);

    if full_text_analysis && has_full_text {
        PromptKind::FullText
    } else {
        PromptKind::AbstractOnly
    }
}

/// 构建总结提示词
pub fn build_prompt(paper: &Paper, full_text_analysis: bool) -> (PromptKind, String) {
    let kind = select_prompt_kind(paper, full_text_analysis);
    let (title, authors, abstract_text) = paper_fields(paper);

    let (inputs, fields) = match (kind, paper.full_text.as_deref()) {
        (PromptKind::FullText, Some(full_text)) => (
            format!(
                "标题：{}\n作者：{}\n摘要：{}\n全文：{}",
                title, authors, abstract_text, full_text
            ),
            "标题、作者、摘要、全文",
        ),
        _ => (
            format!("标题：{}\n作者：{}\n摘要：{}", title, authors, abstract_text),
            "标题、作者、摘要",
        ),
    };

    let prompt = format!(
        r#"请扮演一位专业的科研助理。
你的任务是根据下面提供的论文信息（{fields}），用简洁、专业的中文进行总结和评分。

**输入信息:**
{inputs}

**输出要求:**
第一部分：请严格按照以下结构和编号进行总结，确保内容准确、精炼：

1.  主要研究目标: (论文试图解决的核心问题或达成的具体目标)
2.  关键方法: (论文采用的主要研究方法、技术路径或实验设计)
3.  主要创新点: (论文相比现有研究的新颖之处或独特贡献)
4.  主要结论: (论文得出的最重要研究结果、发现或核心观点)
5.  研究意义: (该研究的理论价值、潜在应用前景或对相关领域的贡献)

第二部分：请对论文进行评分（1-100分），并简要说明理由：

6.  论文评分: (1-100的整数，100分为最高，50分以上为合格，80分以上为优秀)
7.  评分理由: (从创新性、方法严谨性、结果可靠性和影响力等方面简要说明)

**格式与约束:**
*   语言：简体中文。
*   篇幅：每个部分的内容**严格限制在{limit}字以内**。
*   格式：**仅输出**编号和对应内容（例如："1. 主要研究目标: [内容]"），每个部分占一行。**不要包含任何**引言、结语、问候语或与要求格式无关的内容。直接从 "1. 主要研究目标: ..." 开始输出。
"#,
        fields = fields,
        inputs = inputs,
        limit = SECTION_CHAR_LIMIT,
    );

    (kind, prompt)
}

/// 只总结不评分的提示词（5 个部分，仅基于摘要）
pub fn build_summary_prompt(paper: &Paper) -> String {
    let (title, authors, abstract_text) = paper_fields(paper);
    format!(
        r#"请扮演一位专业的科研助理。
你的任务是根据下面提供的论文信息（标题、作者、摘要），用简洁、专业的中文进行总结。请注意，总结应**完全基于**提供的摘要内容。

**输入信息:**
标题：{title}
作者：{authors}
摘要：{abstract_text}

**输出要求:**
请严格按照以下结构和编号进行回答，确保内容准确、精炼：

1.  主要研究目标: (总结论文试图解决的核心问题或达成的具体目标)
2.  关键方法: (总结论文采用的主要研究方法、技术路径或实验设计)
3.  主要创新点: (总结论文相比现有研究的新颖之处或独特贡献)
4.  主要结论: (总结论文得出的最重要研究结果、发现或核心观点)
5.  研究意义: (总结该研究的理论价值、潜在应用前景或对相关领域的贡献)

**格式与约束:**
*   语言：简体中文。
*   篇幅：每个部分的内容**严格限制在{limit}字以内**。
*   格式：**仅输出**编号和对应内容（例如："1. 主要研究目标: [内容]"），每个部分占一行。**不要包含任何**引言、结语、问候语或与要求格式无关的内容。直接从 "1. 主要研究目标: ..." 开始输出。
"#,
        title = title,
        authors = authors,
        abstract_text = abstract_text,
        limit = SUMMARY_SECTION_CHAR_LIMIT,
    )
}

/// 标题、作者、摘要，缺失时为 "N/A"
fn paper_fields(paper: &Paper) -> (&str, String, &str) {
    let title = if paper.title.is_empty() { "N/A" } else { &paper.title };
    let authors = if paper.authors.is_empty() {
        "N/A".to_string()
    } else {
        paper.authors.join(", ")
    };
    let abstract_text = if paper.abstract_text.is_empty() {
        "N/A"
    } else {
        &paper.abstract_text
    };
    (title, authors, abstract_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper_with_full_text(len: usize) -> Paper {
        Paper::new("2401.00001v1", "Tiny Models", vec!["Alice".into(), "Bob".into()], "We study tiny models.", "u", None)
            .with_full_text(Some("字".repeat(len)))
    }

    #[test]
    fn test_short_full_text_uses_abstract_prompt() {
        let paper = paper_with_full_text(50);
        let (kind, prompt) = build_prompt(&paper, true);
        assert_eq!(kind, PromptKind::AbstractOnly);
        assert!(!prompt.contains("全文："));
    }

    #[test]
    fn test_long_full_text_uses_full_text_prompt() {
        let paper = paper_with_full_text(500);
        let (kind, prompt) = build_prompt(&paper, true);
        assert_eq!(kind, PromptKind::FullText);
        assert!(prompt.contains("全文："));
        assert!(prompt.contains("摘要：We study tiny models."));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert_eq!(select_prompt_kind(&paper_with_full_text(200), true), PromptKind::AbstractOnly);
        assert_eq!(select_prompt_kind(&paper_with_full_text(201), true), PromptKind::FullText);
    }

    #[test]
    fn test_full_text_analysis_disabled() {
        let paper = paper_with_full_text(500);
        assert_eq!(select_prompt_kind(&paper, false), PromptKind::AbstractOnly);
    }

    #[test]
    fn test_prompt_has_seven_sections() {
        let paper = paper_with_full_text(0);
        let (_, prompt) = build_prompt(&paper, false);
        for n in 1..=7 {
            assert!(prompt.contains(&format!("{}.  ", n)), "缺少第 {} 部分", n);
        }
        assert!(prompt.contains("6.  论文评分"));
        assert!(prompt.contains("作者：Alice, Bob"));
    }

    #[test]
    fn test_summary_prompt_has_no_rating() {
        let paper = paper_with_full_text(500);
        let prompt = build_summary_prompt(&paper);
        for n in 1..=5 {
            assert!(prompt.contains(&format!("{}.  ", n)), "缺少第 {} 部分", n);
        }
        assert!(!prompt.contains("论文评分"));
        assert!(!prompt.contains("全文："));
        assert!(prompt.contains("标题：Tiny Models"));
    }
}
