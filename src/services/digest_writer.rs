//! 日报输出服务 - 业务能力层
//!
//! 只负责"把一个主题的日报写出去"，不关心论文如何得到。

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, FileError};
use crate::models::{ReportEntry, Topic};

/// 日报投递
#[async_trait]
pub trait DigestSink: Send + Sync {
    async fn deliver(&self, topic: &Topic, entries: &[ReportEntry]) -> AppResult<()>;
}

/// 把日报写成文本和 JSON 文件
pub struct DigestWriter {
    output_dir: PathBuf,
    model_name: String,
}

impl DigestWriter {
    pub fn new(output_dir: impl Into<PathBuf>, model_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            model_name: model_name.into(),
        }
    }

    /// 日报文件路径（不含扩展名）
    pub fn digest_stem(&self, topic: &Topic, date: NaiveDate) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}", date.format("%Y-%m-%d"), file_safe(&topic.name)))
    }

    pub async fn write(&self, topic: &Topic, entries: &[ReportEntry], date: NaiveDate) -> AppResult<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AppError::file_write_failed(self.output_dir.display().to_string(), e))?;

        let stem = self.digest_stem(topic, date);
        let text_path = stem.with_extension("txt");
        let json_path = stem.with_extension("json");

        let text = render_text(topic, entries, date, &self.model_name);
        fs::write(&text_path, text)
            .await
            .map_err(|e| AppError::file_write_failed(text_path.display().to_string(), e))?;

        let json = serde_json::to_vec_pretty(entries).map_err(|source| {
            AppError::File(FileError::JsonFailed {
                path: json_path.display().to_string(),
                source,
            })
        })?;
        fs::write(&json_path, json)
            .await
            .map_err(|e| AppError::file_write_failed(json_path.display().to_string(), e))?;

        debug!("日报已写入: {}", text_path.display());
        Ok(text_path)
    }
}

#[async_trait]
impl DigestSink for DigestWriter {
    async fn deliver(&self, topic: &Topic, entries: &[ReportEntry]) -> AppResult<()> {
        if entries.is_empty() {
            info!("主题 {} 今日没有论文，跳过日报", topic.name);
            return Ok(());
        }
        let path = self.write(topic, entries, Local::now().date_naive()).await?;
        info!("📨 主题 {} 的日报已生成: {} ({} 篇)", topic.name, path.display(), entries.len());
        Ok(())
    }
}

/// 纯文本日报
pub fn render_text(topic: &Topic, entries: &[ReportEntry], date: NaiveDate, model_name: &str) -> String {
    let mut out = format!("arXiv论文日报 - {} - {}\n", topic.name, date.format("%Y-%m-%d"));
    if let Some(description) = &topic.description {
        out.push_str(description);
        out.push('\n');
    }
    out.push_str(&format!("共 {} 篇论文，按评分从高到低排列\n\n", entries.len()));

    for entry in entries {
        out.push_str(&format!("标题：{}\n", entry.title));
        out.push_str(&format!("作者：{}\n", entry.authors.join(", ")));
        out.push_str(&format!("arXiv ID：{}\n", entry.arxiv_id));
        out.push_str(&format!("发表日期：{}\n", entry.published));
        out.push_str(&format!("PDF链接：{}\n", entry.pdf_url));
        out.push_str(&format!("评分：{}\n", entry.rating));
        out.push_str(&format!("\n总结：\n{}\n", entry.summary.trim()));
        out.push_str(&format!("\n{}\n\n", "=".repeat(50)));
    }

    out.push_str(&format!("\n此日报由arXiv论文自动总结系统生成，使用模型 {} 总结。\n", model_name));
    out
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
