use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseKind {
    Course,
    Subscription,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIntentRequest {
    #[serde(rename = "type")]
    pub kind: PurchaseKind,
    #[serde(default)]
    pub course_id: Option<Uuid>,
    #[serde(default)]
    pub plan_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CreateIntentResponse {
    Checkout {
        client_secret: String,
        transaction_id: Uuid,
    },
    FreePlan {
        free_plan: bool,
        subscription_id: Uuid,
    },
}

/// Intent returned by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIntent {
    pub intent_id: String,
    pub client_secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_type_field() {
        let request: CreateIntentRequest = serde_json::from_value(serde_json::json!({
            "type": "subscription",
            "plan_id": "6f1c1a52-0d5b-4b59-9ad4-7f2d3b1e4a10"
        }))
        .unwrap();

        assert_eq!(request.kind, PurchaseKind::Subscription);
        assert!(request.course_id.is_none());
        assert!(request.plan_id.is_some());
    }

    #[test]
    fn free_plan_response_shape() {
        let subscription_id = Uuid::new_v4();
        let body = serde_json::to_value(CreateIntentResponse::FreePlan {
            free_plan: true,
            subscription_id,
        })
        .unwrap();

        assert_eq!(body["free_plan"], true);
        assert_eq!(body["subscription_id"], subscription_id.to_string());
        assert!(body.get("client_secret").is_none());
    }
}
