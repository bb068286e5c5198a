mod webhook;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

pub use webhook::HttpWebhookProvider;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PaymentSucceeded,
    PaymentFailed,
    SubscriptionRenewed,
    PaymentRefunded,
}

#[derive(Clone, Debug, Serialize)]
pub struct UserNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl UserNotification {
    pub fn new(user_id: Uuid, kind: NotificationKind, title: &str, message: String) -> Self {
        Self {
            user_id,
            kind,
            title: title.to_string(),
            message,
            data: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_data(mut self, key: &str, value: impl ToString) -> Self {
        self.data.insert(key.to_string(), value.to_string());
        self
    }
}

#[async_trait]
pub trait NotificationProvider: Send + Sync {
    async fn send(&self, notification: &UserNotification) -> Result<()>;
    fn provider_name(&self) -> &'static str;
}

/// Best-effort delivery queue. Callers never wait on, or learn about, provider failures.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<UserNotification>,
}

impl Notifier {
    /// Must be called inside a Tokio runtime; the delivery task is spawned here.
    pub fn new(providers: Vec<Arc<dyn NotificationProvider>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<UserNotification>(256);

        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                for provider in &providers {
                    if let Err(error) = provider.send(&notification).await {
                        warn!(
                            provider = provider.provider_name(),
                            user_id = %notification.user_id,
                            kind = ?notification.kind,
                            error = %error,
                            "notifications: provider failed"
                        );
                    }
                }
            }
        });

        Self { tx }
    }

    pub fn try_notify(&self, notification: UserNotification) {
        match self.tx.try_send(notification) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(
                    user_id = %dropped.user_id,
                    "notifications: queue full; dropping notification"
                );
            }
            Err(mpsc::error::TrySendError::Closed(dropped)) => {
                warn!(
                    user_id = %dropped.user_id,
                    "notifications: queue closed; dropping notification"
                );
            }
        }
    }
}
