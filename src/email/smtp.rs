use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{Email, EmailError, EmailSender};
use crate::config::SmtpConfig;

pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpSender {
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        // 465 is implicit TLS, 587 upgrades with STARTTLS, anything else is a plain local relay.
        let mut builder = match config.port {
            465 => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| EmailError::Transport(e.to_string()))?,
            587 => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| EmailError::Transport(e.to_string()))?,
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
        }
        .port(config.port);

        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        let from = format!("{} <{}>", config.from_name, config.from_address);
        let from = from
            .parse::<Mailbox>()
            .map_err(|_| EmailError::InvalidAddress(from))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, email: Email) -> Result<Message, EmailError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(email.subject);

        for recipient in &email.to {
            let mailbox = recipient
                .parse::<Mailbox>()
                .map_err(|_| EmailError::InvalidAddress(recipient.clone()))?;
            builder = builder.to(mailbox);
        }

        if let Some(reply_to) = &email.reply_to {
            let mailbox = reply_to
                .parse::<Mailbox>()
                .map_err(|_| EmailError::InvalidAddress(reply_to.clone()))?;
            builder = builder.reply_to(mailbox);
        }

        let message = match email.html_body {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(email.body, html)),
            None => builder.header(ContentType::TEXT_PLAIN).body(email.body),
        };

        message.map_err(|e| EmailError::Build(e.to_string()))
    }
}

#[async_trait]
impl EmailSender for SmtpSender {
    async fn send(&self, email: Email) -> Result<(), EmailError> {
        let recipients = email.to.len();
        let message = self.build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        tracing::info!(recipients, "Email delivered via SMTP");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "localhost".to_string(),
            port: 1025,
            user: None,
            password: None,
            from_name: "Starter App".to_string(),
            from_address: "noreply@example.com".to_string(),
        }
    }

    #[test]
    fn builds_multipart_message() {
        let sender = SmtpSender::new(&config()).unwrap();
        let message = sender
            .build_message(Email {
                to: vec!["a@x.com".to_string()],
                subject: "Hello".to_string(),
                body: "plain".to_string(),
                html_body: Some("<p>html</p>".to_string()),
                reply_to: None,
            })
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[test]
    fn rejects_bad_recipient() {
        let sender = SmtpSender::new(&config()).unwrap();
        let err = sender
            .build_message(Email {
                to: vec!["not an address".to_string()],
                subject: "Hello".to_string(),
                body: "plain".to_string(),
                html_body: None,
                reply_to: None,
            })
            .unwrap_err();
        assert!(matches!(err, EmailError::InvalidAddress(_)));
    }
}
