use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use shared_config::MailConfig;

use crate::models::{MailMessage, NotificationError};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), NotificationError>;
}

/// Posts messages as JSON to an HTTP mail API authenticated with a bearer key.
pub struct HttpMailTransport {
    client: Client,
    config: MailConfig,
}

impl HttpMailTransport {
    pub fn new(config: MailConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), NotificationError> {
        debug!("Sending mail to {} via {}", message.to, self.config.api_url);

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Mail API error ({}): {}", status, body);
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(())
    }
}
