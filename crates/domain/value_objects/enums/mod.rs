pub mod billing_cycles;
pub mod earning_statuses;
pub mod payout_statuses;
pub mod subscription_statuses;
pub mod transaction_statuses;
pub mod transaction_types;
