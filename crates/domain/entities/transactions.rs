use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    domain::value_objects::{
        enums::{transaction_statuses::TransactionStatus, transaction_types::TransactionType},
        transactions::TransactionMetadata,
    },
    infra::db::postgres::schema::transactions,
};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = transactions)]
pub struct TransactionEntity {
    pub id: Uuid,
    pub provider_intent_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub type_: String,
    pub related_id: Uuid,
    pub owner_user_id: Uuid,
    pub metadata: serde_json::Value,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionEntity {
    pub fn status(&self) -> Option<TransactionStatus> {
        TransactionStatus::from_str(&self.status)
    }

    pub fn transaction_type(&self) -> Option<TransactionType> {
        TransactionType::from_str(&self.type_)
    }

    pub fn metadata(&self) -> TransactionMetadata {
        TransactionMetadata::from_json(&self.metadata)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = transactions)]
pub struct InsertTransactionEntity {
    pub id: Uuid,
    pub provider_intent_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub type_: String,
    pub related_id: Uuid,
    pub owner_user_id: Uuid,
    pub metadata: serde_json::Value,
}
