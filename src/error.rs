use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 论文源（arXiv）错误
    #[error("论文源错误: {0}")]
    Source(#[from] SourceError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 邮件发送错误
    #[error("邮件错误: {0}")]
    Mail(#[from] MailError),
    /// 其他错误
    #[error("错误: {0}")]
    Other(String),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 没有任何可用的 API 凭证
    #[error("没有可用的API客户端，请检查API密钥")]
    NoCredentials,
    /// 单个凭证无法构建客户端
    #[error("第 {index} 个API密钥无效: {reason}")]
    InvalidCredential { index: usize, reason: String },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: BoxError,
    },
    /// 流式响应中途出错
    #[error("LLM 流式响应中断 (模型: {model}): {message}")]
    StreamInterrupted { model: String, message: String },
    /// 单次调用超时
    #[error("LLM 调用超时 (模型: {model}, {seconds}秒)")]
    Timeout { model: String, seconds: u64 },
}

/// 论文源错误
#[derive(Debug, Error)]
pub enum SourceError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// HTTP 状态码异常
    #[error("API返回错误状态 ({endpoint}): {status}")]
    BadStatus { endpoint: String, status: u16 },
    /// Atom 解析失败
    #[error("Atom 解析失败: {message}")]
    FeedParseFailed { message: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// JSON 序列化失败
    #[error("JSON处理失败 ({path}): {source}")]
    JsonFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 邮件错误
#[derive(Debug, Error)]
pub enum MailError {
    /// 邮箱地址无法解析
    #[error("邮箱地址无效 ({address}): {message}")]
    InvalidAddress { address: String, message: String },
    /// 邮件内容构建失败
    #[error("邮件构建失败: {message}")]
    BuildFailed { message: String },
    /// SMTP 发送失败
    #[error("邮件发送失败 ({server}:{port}): {message}")]
    SendFailed {
        server: String,
        port: u16,
        message: String,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 创建API请求失败错误
    pub fn source_request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Source(SourceError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
