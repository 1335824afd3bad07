use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Email, EmailError, EmailSender};

/// Logs outgoing mail and keeps a copy instead of delivering it.
#[derive(Clone, Default)]
pub struct MockSender {
    sent: Arc<Mutex<Vec<Email>>>,
}

impl MockSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent_mails(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }

    pub async fn last_email(&self) -> Option<Email> {
        self.sent.lock().await.last().cloned()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl EmailSender for MockSender {
    async fn send(&self, email: Email) -> Result<(), EmailError> {
        tracing::info!(
            to = ?email.to,
            subject = %email.subject,
            body_preview = %preview(&email.body, 100),
            "[mock] email sent"
        );
        self.sent.lock().await.push(email);
        Ok(())
    }
}

fn preview(body: &str, max_chars: usize) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::{templates, TemplateData};

    #[tokio::test]
    async fn records_rendered_templates() {
        let sender = MockSender::new();
        let data: TemplateData = [("AppName".to_string(), "Starter".to_string())]
            .into_iter()
            .collect();

        sender
            .send_template(&["a@x.com".to_string()], templates::WELCOME, &data)
            .await
            .unwrap();

        let last = sender.last_email().await.unwrap();
        assert_eq!(last.subject, "Welcome to Starter!");

        sender.clear().await;
        assert!(sender.sent_mails().await.is_empty());
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("héllo", 2), "hé...");
        assert_eq!(preview("hi", 10), "hi");
    }
}
