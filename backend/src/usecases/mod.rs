pub mod earnings;
pub mod entitlements;
pub mod errors;
pub mod gateway;
pub mod ledger;
pub mod payment_intents;
pub mod payouts;
#[cfg(test)]
pub mod test_support;
pub mod webhooks;
