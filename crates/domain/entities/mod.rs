pub mod courses;
pub mod earnings;
pub mod enrollments;
pub mod payouts;
pub mod plans;
pub mod subscriptions;
pub mod transactions;
