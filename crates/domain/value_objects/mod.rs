pub mod enums;
pub mod money;
pub mod payment_intents;
pub mod payouts;
pub mod transactions;
pub mod webhook_events;
