pub mod catalog;
pub mod earnings;
pub mod enrollments;
pub mod payouts;
pub mod platform_settings;
pub mod subscriptions;
pub mod transactions;
