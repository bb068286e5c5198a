pub mod admin;
pub mod payments;
pub mod payouts;
