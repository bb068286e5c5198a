use super::{NotificationProvider, UserNotification};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Posts each notification as JSON to the notification service.
pub struct HttpWebhookProvider {
    endpoint: Url,
    client: Client,
}

impl HttpWebhookProvider {
    pub fn new(endpoint: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(3))
            .build()?;

        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl NotificationProvider for HttpWebhookProvider {
    async fn send(&self, notification: &UserNotification) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(notification)
            .send()
            .await
            .map_err(sanitize_reqwest_error)?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(anyhow!(
            "notification service returned non-success status: {}",
            response.status()
        ))
    }

    fn provider_name(&self) -> &'static str {
        "http_webhook"
    }
}

// Endpoints can carry tokens in the query string; keep them out of logs.
fn sanitize_reqwest_error(error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("notification request timed out");
    }
    if error.is_connect() {
        return anyhow!("notification connection failed");
    }
    anyhow!("notification request failed")
}
