use crate::error::{AppResult, ConfigError};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 支持的最大 API 密钥数量（GEMINI_API_KEY_1 ~ GEMINI_API_KEY_100）
const MAX_API_KEYS: usize = 100;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    /// 所有可用的 API 密钥，每个密钥对应一个客户端
    pub llm_api_keys: Vec<String>,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 是否在全文可用时使用全文提示词
    pub full_text_analysis: bool,
    // --- 并行处理配置 ---
    pub use_parallel: bool,
    pub use_batch_parallel: bool,
    /// 最大并发数，0 表示使用所有可用的 API 密钥
    pub max_workers: usize,
    /// 每批处理的论文数量，0 表示不分批
    pub batch_size: usize,
    /// 单篇论文重试前的等待时间
    pub retry_cooldown: Duration,
    /// 批次之间的等待时间
    pub batch_cooldown: Duration,
    /// 单次生成调用的超时时间，None 表示不限制
    pub request_timeout: Option<Duration>,
    /// 串行模式下切换 API 密钥后的等待时间
    pub serial_rotation_delay: Duration,
    /// 串行模式是否评分并排序，关闭时只做 5 部分总结
    pub serial_rating: bool,
    // --- arXiv 配置 ---
    pub days_back: i64,
    pub arxiv_max_results: usize,
    pub topics_file: String,
    // --- PDF 配置 ---
    pub download_pdfs: bool,
    pub pdf_base_dir: String,
    pub pdf_db_file: String,
    pub organize_by_date: bool,
    /// 全文最大字符数，0 表示不截断
    pub pdf_max_chars: usize,
    // --- 输出与调度 ---
    pub digest_output_dir: String,
    /// 配置了发件人和收件人时通过邮件发送日报，否则写文件
    pub email: Option<EmailConfig>,
    /// 每天运行的时间（HH:MM，本地时间）
    pub schedule_time: String,
    /// 调试模式：立即执行一次后退出
    pub debug_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_keys: Vec::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.0-flash".to_string(),
            full_text_analysis: true,
            use_parallel: true,
            use_batch_parallel: true,
            max_workers: 0,
            batch_size: 10,
            retry_cooldown: Duration::from_secs(60),
            batch_cooldown: Duration::from_secs(60),
            request_timeout: Some(Duration::from_secs(600)),
            serial_rotation_delay: Duration::ZERO,
            serial_rating: true,
            days_back: 2,
            arxiv_max_results: 1000,
            topics_file: "topics.toml".to_string(),
            download_pdfs: true,
            pdf_base_dir: "papers".to_string(),
            pdf_db_file: "papers/pdf_database.json".to_string(),
            organize_by_date: true,
            pdf_max_chars: 0,
            digest_output_dir: "digests".to_string(),
            email: None,
            schedule_time: "09:00".to_string(),
            debug_mode: false,
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        let default = Self::default();
        let request_timeout_secs: u64 = env_or(
            "REQUEST_TIMEOUT_SECS",
            default.request_timeout.map(|d| d.as_secs()).unwrap_or(0),
        )?;

        Ok(Self {
            llm_api_keys: collect_api_keys(|name| std::env::var(name).ok()),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            full_text_analysis: env_flag("FULL_TEXT_ANALYSIS", default.full_text_analysis)?,
            use_parallel: env_flag("USE_PARALLEL", default.use_parallel)?,
            use_batch_parallel: env_flag("USE_BATCH_PARALLEL", default.use_batch_parallel)?,
            max_workers: env_or("MAX_WORKERS", default.max_workers)?,
            batch_size: env_or("BATCH_SIZE", default.batch_size)?,
            retry_cooldown: Duration::from_secs(env_or(
                "RETRY_COOLDOWN_SECS",
                default.retry_cooldown.as_secs(),
            )?),
            batch_cooldown: Duration::from_secs(env_or(
                "BATCH_COOLDOWN_SECS",
                default.batch_cooldown.as_secs(),
            )?),
            request_timeout: (request_timeout_secs > 0)
                .then(|| Duration::from_secs(request_timeout_secs)),
            serial_rotation_delay: Duration::from_secs(env_or(
                "SERIAL_ROTATION_DELAY_SECS",
                default.serial_rotation_delay.as_secs(),
            )?),
            serial_rating: env_flag("SERIAL_RATING", default.serial_rating)?,
            days_back: env_or("DAYS_BACK", default.days_back)?,
            arxiv_max_results: env_or("ARXIV_MAX_RESULTS", default.arxiv_max_results)?,
            topics_file: std::env::var("TOPICS_FILE").unwrap_or(default.topics_file),
            download_pdfs: env_flag("DOWNLOAD_PDFS", default.download_pdfs)?,
            pdf_base_dir: std::env::var("PDF_BASE_DIR").unwrap_or(default.pdf_base_dir),
            pdf_db_file: std::env::var("PDF_DB_FILE").unwrap_or(default.pdf_db_file),
            organize_by_date: env_flag("ORGANIZE_BY_DATE", default.organize_by_date)?,
            pdf_max_chars: env_or("PDF_MAX_CHARS", default.pdf_max_chars)?,
            digest_output_dir: std::env::var("DIGEST_OUTPUT_DIR")
                .unwrap_or(default.digest_output_dir),
            email: EmailConfig::from_lookup(|name| std::env::var(name).ok())?,
            schedule_time: std::env::var("SCHEDULE_TIME").unwrap_or(default.schedule_time),
            debug_mode: env_flag("DEBUG_MODE", default.debug_mode)?,
        })
    }

    /// 分批大小，未配置分批时返回 None
    pub fn effective_batch_size(&self) -> Option<usize> {
        (self.use_batch_parallel && self.batch_size > 0).then_some(self.batch_size)
    }
}

/// SMTP 邮件配置
#[derive(Clone, PartialEq, Eq)]
pub struct EmailConfig {
    pub smtp_server: String,
    /// SSL 端口，失败时改用 587 + STARTTLS
    pub smtp_port: u16,
    pub sender_email: String,
    pub sender_password: String,
    pub receiver_emails: Vec<String>,
}

impl EmailConfig {
    /// 读取 SMTP 配置
    ///
    /// `SENDER_EMAIL`、`SENDER_PASSWORD`、`RECEIVER_EMAILS` 缺任何一个时返回 None。
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Option<Self>> {
        let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let (Some(sender_email), Some(sender_password), Some(receivers)) = (
            present("SENDER_EMAIL"),
            present("SENDER_PASSWORD"),
            present("RECEIVER_EMAILS"),
        ) else {
            return Ok(None);
        };

        let receiver_emails = parse_recipients(&receivers);
        if receiver_emails.is_empty() {
            return Ok(None);
        }

        let smtp_port = match lookup("SMTP_PORT") {
            Some(value) => parse_value("SMTP_PORT", &value, "u16")?,
            None => 465,
        };

        Ok(Some(Self {
            smtp_server: present("SMTP_SERVER").unwrap_or_else(|| "smtp.qq.com".to_string()),
            smtp_port,
            sender_email: sender_email.trim().to_string(),
            sender_password,
            receiver_emails,
        }))
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("sender_email", &self.sender_email)
            .field("sender_password", &"***")
            .field("receiver_emails", &self.receiver_emails)
            .finish()
    }
}

/// 逗号分隔的收件人列表，忽略空项
pub fn parse_recipients(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 按编号依次读取 API 密钥，遇到第一个缺失的编号即停止
fn collect_api_keys(lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
    let mut keys = Vec::new();
    for i in 1..=MAX_API_KEYS {
        match lookup(&format!("GEMINI_API_KEY_{}", i)) {
            Some(key) if !key.trim().is_empty() => keys.push(key),
            _ => break,
        }
    }
    keys
}

fn env_or<T: FromStr>(var_name: &str, default: T) -> AppResult<T> {
    match std::env::var(var_name) {
        Ok(value) => parse_value(var_name, &value, std::any::type_name::<T>()),
        Err(_) => Ok(default),
    }
}

fn env_flag(var_name: &str, default: bool) -> AppResult<bool> {
    match std::env::var(var_name) {
        Ok(value) => parse_flag(var_name, &value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(var_name: &str, value: &str, expected_type: &str) -> AppResult<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: expected_type.to_string(),
        }
        .into()
    })
}

fn parse_flag(var_name: &str, value: &str) -> AppResult<bool> {
    parse_value(var_name, &value.to_ascii_lowercase(), "bool")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;

    #[test]
    fn test_collect_api_keys_stops_at_gap() {
        let vars: HashMap<&str, &str> = [
            ("GEMINI_API_KEY_1", "key-a"),
            ("GEMINI_API_KEY_2", "key-b"),
            ("GEMINI_API_KEY_4", "key-d"),
        ]
        .into_iter()
        .collect();

        let keys = collect_api_keys(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(keys, vec!["key-a", "key-b"]);
    }

    #[test]
    fn test_parse_flag_is_case_insensitive() {
        assert!(parse_flag("USE_PARALLEL", "True").unwrap());
        assert!(!parse_flag("USE_PARALLEL", "FALSE").unwrap());
        assert!(matches!(
            parse_flag("USE_PARALLEL", "yes"),
            Err(AppError::Config(ConfigError::EnvVarParseFailed { .. }))
        ));
    }

    #[test]
    fn test_parse_value_reports_variable() {
        let err = parse_value::<usize>("BATCH_SIZE", "ten", "usize").unwrap_err();
        assert!(err.to_string().contains("BATCH_SIZE"));
    }

    #[test]
    fn test_parse_recipients() {
        assert_eq!(
            parse_recipients(" a@example.com,b@example.com , ,"),
            vec!["a@example.com", "b@example.com"]
        );
        assert!(parse_recipients(" , ").is_empty());
    }

    #[test]
    fn test_email_config_requires_sender_and_receivers() {
        let vars: HashMap<&str, &str> = [
            ("SENDER_EMAIL", "bot@example.com"),
            ("SENDER_PASSWORD", "secret"),
        ]
        .into_iter()
        .collect();
        let email = EmailConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert!(email.is_none());
    }

    #[test]
    fn test_email_config_defaults_and_masking() {
        let vars: HashMap<&str, &str> = [
            ("SENDER_EMAIL", "bot@example.com"),
            ("SENDER_PASSWORD", "secret"),
            ("RECEIVER_EMAILS", "a@example.com, b@example.com"),
        ]
        .into_iter()
        .collect();
        let email = EmailConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap()
            .unwrap();

        assert_eq!(email.smtp_server, "smtp.qq.com");
        assert_eq!(email.smtp_port, 465);
        assert_eq!(email.receiver_emails.len(), 2);
        assert!(!format!("{:?}", email).contains("secret"));
    }

    #[test]
    fn test_email_config_rejects_bad_port() {
        let vars: HashMap<&str, &str> = [
            ("SENDER_EMAIL", "bot@example.com"),
            ("SENDER_PASSWORD", "secret"),
            ("RECEIVER_EMAILS", "a@example.com"),
            ("SMTP_PORT", "ssl"),
        ]
        .into_iter()
        .collect();
        assert!(EmailConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).is_err());
    }

    #[test]
    fn test_effective_batch_size() {
        let mut config = Config::default();
        assert_eq!(config.effective_batch_size(), Some(10));

        config.batch_size = 0;
        assert_eq!(config.effective_batch_size(), None);

        config.batch_size = 5;
        config.use_batch_parallel = false;
        assert_eq!(config.effective_batch_size(), None);
    }
}
