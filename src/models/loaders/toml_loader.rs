use crate::error::{AppError, AppResult, FileError};
use crate::models::topic::{Topic, TopicFile};
use std::path::Path;
use tokio::fs;

/// 解析主题 TOML 内容
pub fn parse_topics(content: &str, origin: &str) -> AppResult<Vec<Topic>> {
    let file: TopicFile = toml::from_str(content).map_err(|source| {
        AppError::File(FileError::TomlParseFailed {
            path: origin.to_string(),
            source,
        })
    })?;
    Ok(file.topics)
}

/// 从 TOML 文件加载订阅主题
///
/// 文件不存在或没有配置任何主题时，使用默认主题。
pub async fn load_topics(path: &Path) -> AppResult<Vec<Topic>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        tracing::warn!("主题文件 {} 不存在，使用默认主题", path.display());
        return Ok(vec![Topic::default()]);
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    let topics = parse_topics(&content, &path.display().to_string())?;
    if topics.is_empty() {
        tracing::warn!("主题文件 {} 中没有主题，使用默认主题", path.display());
        return Ok(vec![Topic::default()]);
    }

    for topic in &topics {
        tracing::info!("已加载主题: {} ({})", topic.name, topic.query);
    }
    Ok(topics)
}
