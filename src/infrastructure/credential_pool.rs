//! API 凭证池 - 基础设施层
//!
//! 持有稀缺资源（每个 API 密钥对应的客户端），只暴露按下标取用的能力。
//! 初始化之后只读；每个凭证带一把异步锁，保证同一凭证同一时刻只有一个生成调用。

use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::clients::GenerationService;
use crate::error::{AppResult, ConfigError};

/// 单个凭证对应的客户端句柄
#[derive(Clone)]
pub struct ClientHandle {
    index: usize,
    service: Arc<dyn GenerationService>,
    lane: Arc<Mutex<()>>,
}

impl ClientHandle {
    pub fn new(index: usize, service: Arc<dyn GenerationService>) -> Self {
        Self {
            index,
            service,
            lane: Arc::new(Mutex::new(())),
        }
    }

    /// 在池中的下标
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn service(&self) -> &dyn GenerationService {
        self.service.as_ref()
    }

    /// 独占该凭证，直到返回的守卫被释放
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.lane.lock().await
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("index", &self.index)
            .field("service", &"<GenerationService>")
            .finish()
    }
}

/// 凭证池
#[derive(Debug, Clone)]
pub struct CredentialPool {
    handles: Vec<ClientHandle>,
}

impl CredentialPool {
    /// 用一组 API 密钥初始化凭证池
    ///
    /// `factory` 为每个密钥构建客户端；单个密钥失败时记录日志并跳过，
    /// 全部失败（或没有密钥）时返回 `ConfigError::NoCredentials`。
    pub fn initialize<F>(credentials: &[String], factory: F) -> AppResult<Self>
    where
        F: Fn(usize, &str) -> AppResult<Arc<dyn GenerationService>>,
    {
        let mut handles = Vec::with_capacity(credentials.len());

        for (i, credential) in credentials.iter().enumerate() {
            match factory(i + 1, credential) {
                Ok(service) => {
                    info!("✓ 成功初始化API客户端 #{} ({})", i + 1, mask_credential(credential));
                    handles.push(ClientHandle::new(handles.len(), service));
                }
                Err(e) => {
                    warn!("初始化API客户端失败 #{} ({}): {}", i + 1, mask_credential(credential), e);
                }
            }
        }

        if handles.is_empty() {
            return Err(ConfigError::NoCredentials.into());
        }

        Ok(Self { handles })
    }

    /// 直接用已构建好的客户端创建凭证池
    pub fn from_services(services: Vec<Arc<dyn GenerationService>>) -> AppResult<Self> {
        if services.is_empty() {
            return Err(ConfigError::NoCredentials.into());
        }
        let handles = services
            .into_iter()
            .enumerate()
            .map(|(i, service)| ClientHandle::new(i, service))
            .collect();
        Ok(Self { handles })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// 按位置取客户端，下标对池大小取模
    pub fn client_at(&self, index: usize) -> &ClientHandle {
        &self.handles[index % self.handles.len()]
    }

    pub fn handles(&self) -> &[ClientHandle] {
        &self.handles
    }
}

/// 日志中只显示密钥的末尾几位
fn mask_credential(credential: &str) -> String {
    let chars: Vec<char> = credential.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
