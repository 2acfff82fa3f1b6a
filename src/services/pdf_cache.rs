//! PDF 缓存 - 业务能力层
//!
//! 下载论文 PDF 到本地（按日期分目录），并用一个 JSON 索引记录 arXiv ID 到文件路径的映射。

use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

const DOWNLOAD_ATTEMPTS: usize = 3;
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PdfCache {
    http: reqwest::Client,
    base_dir: PathBuf,
    db_file: PathBuf,
    organize_by_date: bool,
    backoff_base: Duration,
    index: Mutex<HashMap<String, PathBuf>>,
}

impl PdfCache {
    /// 打开缓存目录并加载索引
    pub async fn open(
        base_dir: impl Into<PathBuf>,
        db_file: impl Into<PathBuf>,
        organize_by_date: bool,
    ) -> AppResult<Self> {
        let base_dir = base_dir.into();
        let db_file = db_file.into();

        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| AppError::file_write_failed(base_dir.display().to_string(), e))?;
        if let Some(parent) = db_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
        }

        let http = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent("arxiv-digest/0.1")
            .build()
            .map_err(|e| AppError::source_request_failed("pdf", e))?;

        let index = load_index(&db_file).await;
        info!("PDF文件将保存到: {} (已索引 {} 篇)", base_dir.display(), index.len());

        Ok(Self {
            http,
            base_dir,
            db_file,
            organize_by_date,
            backoff_base: Duration::from_secs(1),
            index: Mutex::new(index),
        })
    }

    /// 下载失败后的退避基数，第 n 次失败等待 `base * 2^(n-1)`
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// 查找已缓存的 PDF，文件已被删除时返回 None
    pub async fn lookup(&self, arxiv_id: &str) -> Option<PathBuf> {
        let index = self.index.lock().await;
        index
            .get(arxiv_id)
            .filter(|path| path.exists())
            .cloned()
    }

    /// 下载 PDF，已存在时直接返回本地路径
    pub async fn download(
        &self,
        pdf_url: &str,
        arxiv_id: &str,
        published: Option<NaiveDate>,
    ) -> Option<PathBuf> {
        if let Some(existing) = self.lookup(arxiv_id).await {
            debug!("索引中已有该论文: {}", existing.display());
            return Some(existing);
        }

        let folder = self.date_folder(published);
        if let Err(e) = fs::create_dir_all(&folder).await {
            warn!("创建目录失败 {}: {}", folder.display(), e);
            return None;
        }
        let file_path = folder.join(pdf_file_name(arxiv_id));

        if fs::try_exists(&file_path).await.unwrap_or(false) {
            debug!("文件已存在: {}", file_path.display());
            self.record(arxiv_id, &file_path).await;
            return Some(file_path);
        }

        for attempt in 1..=DOWNLOAD_ATTEMPTS {
            match self.fetch_to(pdf_url, &file_path).await {
                Ok(()) => {
                    info!("✓ 下载成功: {}", file_path.display());
                    self.record(arxiv_id, &file_path).await;
                    return Some(file_path);
                }
                Err(e) => {
                    warn!("下载失败 (尝试 {}/{}): {}", attempt, DOWNLOAD_ATTEMPTS, e);
                    if attempt < DOWNLOAD_ATTEMPTS {
                        tokio::time::sleep(self.backoff_base * 2u32.pow(attempt as u32 - 1)).await;
                    }
                }
            }
        }

        warn!("达到最大重试次数，放弃下载: {}", pdf_url);
        None
    }

    /// 论文所在的目录
    pub fn date_folder(&self, published: Option<NaiveDate>) -> PathBuf {
        if !self.organize_by_date {
            return self.base_dir.clone();
        }
        let date = published.unwrap_or_else(|| Local::now().date_naive());
        self.base_dir
            .join(date.format("%Y").to_string())
            .join(date.format("%m").to_string())
            .join(date.format("%d").to_string())
    }

    async fn fetch_to(&self, pdf_url: &str, file_path: &Path) -> AppResult<()> {
        debug!("正在下载: {} -> {}", pdf_url, file_path.display());

        let bytes = self
            .http
            .get(pdf_url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| AppError::source_request_failed(pdf_url, e))?
            .bytes()
            .await
            .map_err(|e| AppError::source_request_failed(pdf_url, e))?;

        // 先写临时文件，避免中断后留下不完整的 PDF
        let partial = file_path.with_extension("pdf.part");
        fs::write(&partial, &bytes)
            .await
            .map_err(|e| AppError::file_write_failed(partial.display().to_string(), e))?;
        fs::rename(&partial, file_path)
            .await
            .map_err(|e| AppError::file_write_failed(file_path.display().to_string(), e))?;
        Ok(())
    }

    async fn record(&self, arxiv_id: &str, file_path: &Path) {
        let mut index = self.index.lock().await;
        index.insert(arxiv_id.to_string(), file_path.to_path_buf());

        match serde_json::to_vec_pretty(&*index) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.db_file, json).await {
                    warn!("保存PDF索引失败: {}", e);
                }
            }
            Err(e) => warn!("序列化PDF索引失败: {}", e),
        }
    }
}

async fn load_index(db_file: &Path) -> HashMap<String, PathBuf> {
    let content = match fs::read(db_file).await {
        Ok(content) => content,
        Err(_) => return HashMap::new(),
    };
    serde_json::from_slice(&content).unwrap_or_else(|e| {
        warn!("加载PDF索引失败 {}: {}", db_file.display(), e);
        HashMap::new()
    })
}

fn pdf_file_name(arxiv_id: &str) -> String {
    format!("{}.pdf", arxiv_id.replace('/', "_"))
}
