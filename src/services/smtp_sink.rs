//! 邮件投递 - 业务能力层
//!
//! 把一个主题的日报以纯文本邮件发给所有收件人。先用 SSL 端口发送，
//! 失败后改用 587 端口 + STARTTLS 再试一次。

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::EmailConfig;
use crate::error::{AppResult, MailError};
use crate::models::{ReportEntry, Topic};
use crate::services::digest_writer::{render_text, DigestSink};

/// SSL 发送失败后使用的端口
pub const STARTTLS_FALLBACK_PORT: u16 = 587;

const SENDER_NAME: &str = "arXiv论文助手";
const SEND_TIMEOUT: Duration = Duration::from_secs(60);

/// 连接方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// 连接建立即 TLS（SMTP_SSL）
    Tls,
    /// 明文连接后升级
    StartTls,
}

/// 邮件发送通道
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, security: SmtpSecurity, port: u16, message: Message) -> AppResult<()>;
}

/// 基于 lettre 的 SMTP 通道，每次发送新建连接
pub struct LettreTransport {
    server: String,
    credentials: Credentials,
}

impl LettreTransport {
    pub fn new(server: impl Into<String>, username: &str, password: &str) -> Self {
        Self {
            server: server.into(),
            credentials: Credentials::new(username.to_string(), password.to_string()),
        }
    }

    fn send_failed(&self, port: u16, e: impl std::fmt::Display) -> MailError {
        MailError::SendFailed {
            server: self.server.clone(),
            port,
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl MailTransport for LettreTransport {
    async fn send(&self, security: SmtpSecurity, port: u16, message: Message) -> AppResult<()> {
        let builder = match security {
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&self.server),
            SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.server),
        }
        .map_err(|e| self.send_failed(port, e))?;

        let transport = builder
            .port(port)
            .credentials(self.credentials.clone())
            .timeout(Some(SEND_TIMEOUT))
            .build();

        transport
            .send(message)
            .await
            .map_err(|e| self.send_failed(port, e))?;
        Ok(())
    }
}

/// 通过邮件投递日报
pub struct SmtpSink {
    from: Mailbox,
    to: Vec<Mailbox>,
    port: u16,
    model_name: String,
    transport: Arc<dyn MailTransport>,
}

impl SmtpSink {
    pub fn new(email: &EmailConfig, model_name: impl Into<String>) -> AppResult<Self> {
        let transport = LettreTransport::new(
            &email.smtp_server,
            &email.sender_email,
            &email.sender_password,
        );
        Self::with_transport(email, model_name, Arc::new(transport))
    }

    pub fn with_transport(
        email: &EmailConfig,
        model_name: impl Into<String>,
        transport: Arc<dyn MailTransport>,
    ) -> AppResult<Self> {
        let from = Mailbox::new(Some(SENDER_NAME.to_string()), parse_address(&email.sender_email)?);
        let to = email
            .receiver_emails
            .iter()
            .map(|r| parse_address(r).map(|address| Mailbox::new(None, address)))
            .collect::<AppResult<Vec<_>>>()?;
        if to.is_empty() {
            return Err(MailError::InvalidAddress {
                address: String::new(),
                message: "没有收件人".to_string(),
            }
            .into());
        }

        Ok(Self {
            from,
            to,
            port: email.smtp_port,
            model_name: model_name.into(),
            transport,
        })
    }

    /// 构建一封日报邮件
    pub fn build_message(&self, topic: &Topic, entries: &[ReportEntry], date: NaiveDate) -> AppResult<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(format!("arXiv论文日报 - {} - {}", topic.name, date.format("%Y-%m-%d")))
            .header(ContentType::TEXT_PLAIN);
        for mailbox in &self.to {
            builder = builder.to(mailbox.clone());
        }

        builder
            .body(render_text(topic, entries, date, &self.model_name))
            .map_err(|e| MailError::BuildFailed { message: e.to_string() }.into())
    }

    /// 先走 SSL 端口，失败后改用 STARTTLS
    async fn send_with_fallback(&self, message: Message) -> AppResult<()> {
        match self.transport.send(SmtpSecurity::Tls, self.port, message.clone()).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("邮件发送失败: {}，尝试使用备用端口 {} 发送...", e, STARTTLS_FALLBACK_PORT);
                self.transport
                    .send(SmtpSecurity::StartTls, STARTTLS_FALLBACK_PORT, message)
                    .await?;
                info!("使用备用端口发送成功");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl DigestSink for SmtpSink {
    async fn deliver(&self, topic: &Topic, entries: &[ReportEntry]) -> AppResult<()> {
        if entries.is_empty() {
            info!("主题 {} 今日没有论文，不发送邮件", topic.name);
            return Ok(());
        }

        let message = self.build_message(topic, entries, Local::now().date_naive())?;
        self.send_with_fallback(message).await?;
        info!("📨 主题 {} 的日报已发送给 {} 位收件人 ({} 篇)", topic.name, self.to.len(), entries.len());
        Ok(())
    }
}

fn parse_address(value: &str) -> AppResult<Address> {
    value.trim().parse::<Address>().map_err(|e| {
        MailError::InvalidAddress {
            address: value.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}
