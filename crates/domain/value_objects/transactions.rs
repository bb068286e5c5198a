use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::enums::billing_cycles::BillingCycle;

/// Snapshot of catalog data taken when a transaction is opened. Stored as JSONB
/// so the grantor and earnings calculator never re-read mutable catalog rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_cycle: Option<BillingCycle>,
}

impl TransactionMetadata {
    pub fn for_course(course_title: String, teacher_id: Option<Uuid>) -> Self {
        Self {
            course_title: Some(course_title),
            teacher_id,
            ..Default::default()
        }
    }

    pub fn for_plan(plan_name: String, billing_cycle: BillingCycle) -> Self {
        Self {
            plan_name: Some(plan_name),
            billing_cycle: Some(billing_cycle),
            ..Default::default()
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}
