use uuid::Uuid;

/// Settlement events the pipeline understands. Every provider payload is
/// reduced to one of these before it reaches the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    IntentSucceeded {
        intent_id: String,
    },
    IntentFailed {
        intent_id: String,
        failure_message: Option<String>,
    },
    /// Subscription renewal. Has no pending transaction behind it.
    InvoicePaid {
        user_id: Uuid,
        plan_id: Uuid,
    },
    ChargeRefunded {
        intent_id: String,
    },
    Unhandled {
        event_type: String,
    },
}

impl WebhookEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookEvent::IntentSucceeded { .. } => "intent_succeeded",
            WebhookEvent::IntentFailed { .. } => "intent_failed",
            WebhookEvent::InvoicePaid { .. } => "invoice_paid",
            WebhookEvent::ChargeRefunded { .. } => "charge_refunded",
            WebhookEvent::Unhandled { .. } => "unhandled",
        }
    }
}
