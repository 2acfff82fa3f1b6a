//! LLM API 客户端
//!
//! 封装兼容 OpenAI 接口的流式生成调用（Gemini 的 OpenAI 兼容端点、OpenAI、Doubao 等）。

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, ConfigError};

/// 生成结果的文本分片流
pub type ChunkStream = BoxStream<'static, AppResult<String>>;

/// 文本生成服务
///
/// 每个 API 凭证对应一个实现；调用方负责把分片拼接成完整响应。
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn stream_generate(&self, model: &str, prompt: &str) -> AppResult<ChunkStream>;
}

/// LLM 客户端，持有一个 API 密钥
pub struct LlmClient {
    client: Client<OpenAIConfig>,
}

impl LlmClient {
    /// 用一个 API 密钥创建客户端
    ///
    /// `index` 只用于错误信息。
    pub fn new(index: usize, api_key: &str, api_base_url: &str) -> AppResult<Self> {
        if api_key.trim().is_empty() {
            return Err(ConfigError::InvalidCredential {
                index,
                reason: "密钥为空".to_string(),
            }
            .into());
        }
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidCredential {
                index,
                reason: format!("API 地址无效: {}", api_base_url),
            }
            .into());
        }

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base_url);

        Ok(Self {
            client: Client::with_config(openai_config),
        })
    }
}

#[async_trait]
impl GenerationService for LlmClient {
    async fn stream_generate(&self, model: &str, prompt: &str) -> AppResult<ChunkStream> {
        debug!("调用 LLM 流式接口，模型: {}，提示词长度: {} 字符", model, prompt.chars().count());

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| AppError::llm_api_failed(model, e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .build()
            .map_err(|e| AppError::llm_api_failed(model, e))?;

        let stream = self.client.chat().create_stream(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_api_failed(model, e)
        })?;

        let model = model.to_string();
        let chunks = stream.map(move |item| match item {
            Ok(response) => Ok(response
                .choices
                .into_iter()
                .filter_map(|choice| choice.delta.content)
                .collect::<String>()),
            Err(e) => Err(AppError::llm_api_failed(model.clone(), e)),
        });

        Ok(chunks.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_blank_key() {
        let err = LlmClient::new(2, "   ", "https://example.com/v1").err().unwrap();
        assert!(err.to_string().contains("第 2 个API密钥无效"));
    }

    #[test]
    fn test_new_rejects_bad_base_url() {
        assert!(LlmClient::new(1, "key", "example.com").is_err());
        assert!(LlmClient::new(1, "key", "https://example.com/v1").is_ok());
    }
}
