use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::enums::payout_statuses::PayoutStatus;

#[derive(Debug, Clone, Deserialize)]
pub struct PayoutRequest {
    pub amount: Decimal,
}

/// Payouts move whole earnings rows, so `amount` can be lower than
/// `requested_amount`. The difference stays available.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PayoutReceipt {
    pub payout_id: Uuid,
    pub requested_amount: Decimal,
    pub amount: Decimal,
    pub currency: String,
    pub status: PayoutStatus,
    pub transfer_reference: Option<String>,
    pub earnings_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PayoutBalance {
    pub teacher_id: Uuid,
    pub available: Decimal,
    pub currency: String,
    pub minimum_payout: Decimal,
}

/// What the transfer executor needs to move money to a teacher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub payout_id: Uuid,
    pub destination_account: String,
    pub amount_minor: i64,
    pub currency: String,
}
