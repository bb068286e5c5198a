use rust_decimal::Decimal;
use url::Url;

use super::stage::Stage;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub stage: Stage,
    pub backend_server: BackendServer,
    pub database: Database,
    pub auth: AuthSecret,
    pub stripe: Stripe,
    pub payouts: Payouts,
    pub commission: Commission,
    pub notifications: Notifications,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AuthSecret {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct Stripe {
    pub secret_key: String,
    pub webhook_secret: String,
    pub webhook_tolerance_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Payouts {
    pub minimum_amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct Commission {
    /// Used only when the platform settings row is missing.
    pub fallback_rate: Decimal,
}

#[derive(Debug, Clone)]
pub struct Notifications {
    pub webhook_url: Option<Url>,
}
