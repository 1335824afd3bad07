pub mod mock;
pub mod smtp;
pub mod templates;

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::config::Config;

pub use mock::MockSender;
pub use smtp::SmtpSender;

/// Placeholder values substituted into `{{Key}}` markers.
pub type TemplateData = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub html_body: Option<String>,
    pub reply_to: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("template not found: {0}")]
    UnknownTemplate(String),
    #[error("invalid address {0}")]
    InvalidAddress(String),
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("failed to deliver message: {0}")]
    Transport(String),
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), EmailError>;

    async fn send_template(
        &self,
        to: &[String],
        template: &str,
        data: &TemplateData,
    ) -> Result<(), EmailError> {
        let email = templates::render(template, to, data)?;
        self.send(email).await
    }
}

/// SMTP in production when a relay is configured, otherwise mail is only logged.
pub fn sender_from_config(config: &Config) -> Result<Arc<dyn EmailSender>, EmailError> {
    match (&config.smtp, config.is_production()) {
        (Some(smtp), true) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "Email service: SMTP");
            Ok(Arc::new(SmtpSender::new(smtp)?))
        }
        (None, true) => {
            tracing::warn!("SMTP_HOST not set in production, emails will only be logged");
            Ok(Arc::new(MockSender::new()))
        }
        _ => {
            tracing::info!("Email service: mock (emails logged)");
            Ok(Arc::new(MockSender::new()))
        }
    }
}
