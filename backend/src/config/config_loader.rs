use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use url::Url;

use super::{
    config_model::{
        AuthSecret, BackendServer, Commission, Database, DotEnvyConfig, Notifications, Payouts,
        Stripe,
    },
    stage::Stage,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?.parse()?,
        body_limit: required("SERVER_BODY_LIMIT")?.parse()?,
        timeout: required("SERVER_TIMEOUT")?.parse()?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: optional("DATABASE_MAX_CONNECTIONS")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(10),
    };

    let auth = AuthSecret {
        jwt_secret: required("JWT_SECRET")?,
    };

    let stripe = Stripe {
        secret_key: required("STRIPE_SECRET_KEY")?,
        webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
        webhook_tolerance_secs: optional("STRIPE_WEBHOOK_TOLERANCE_SECS")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(300),
        request_timeout_secs: optional("STRIPE_REQUEST_TIMEOUT_SECS")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(15),
    };

    let payouts = Payouts {
        minimum_amount: decimal_or("PAYOUT_MINIMUM_AMOUNT", "50")?,
        currency: optional("PAYOUT_CURRENCY").unwrap_or_else(|| "usd".to_string()),
    };

    let commission = Commission {
        fallback_rate: decimal_or("COMMISSION_FALLBACK_RATE", "30")?,
    };

    let notifications = Notifications {
        webhook_url: optional("NOTIFICATION_WEBHOOK_URL")
            .map(|raw| Url::parse(&raw))
            .transpose()
            .context("NOTIFICATION_WEBHOOK_URL is invalid")?,
    };

    Ok(DotEnvyConfig {
        stage: get_stage(),
        backend_server,
        database,
        auth,
        stripe,
        payouts,
        commission,
        notifications,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or("".to_string());
    Stage::try_from(&stage_str).unwrap_or_default()
}

pub fn get_jwt_secret() -> Result<String> {
    dotenvy::dotenv().ok();

    required("JWT_SECRET")
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} is invalid"))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn decimal_or(key: &str, default: &str) -> Result<Decimal> {
    let raw = optional(key).unwrap_or_else(|| default.to_string());
    Decimal::from_str(&raw).with_context(|| format!("{key} is not a decimal: {raw}"))
}
