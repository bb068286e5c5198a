pub mod auth;
pub mod axum_http;
pub mod config;
pub mod usecases;

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum_http::http_serve::{self, UseCases};
use config::{config_loader, config_model::DotEnvyConfig};
use settlement::{
    infra::db::{
        postgres::postgres_connection::{self, PgPoolSquad},
        repositories::{
            catalog::CatalogPostgres, earnings::EarningsPostgres, enrollments::EnrollmentPostgres,
            payouts::PayoutPostgres, platform_settings::PlatformSettingsPostgres,
            subscriptions::SubscriptionPostgres, transactions::TransactionPostgres,
        },
    },
    notifications::{HttpWebhookProvider, NotificationProvider, Notifier},
    payments::stripe_client::StripeClient,
};
use tracing::info;
use usecases::{
    earnings::EarningsCalculator, entitlements::EntitlementGrantor, ledger::TransactionLedger,
    payment_intents::PaymentIntentUseCase, payouts::PayoutUseCase, webhooks::WebhookUseCase,
};

pub async fn run() -> Result<()> {
    settlement::observability::init_observability("backend")?;

    let dotenvy_env = config_loader::load()?;
    info!(stage = %dotenvy_env.stage, "ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.max_connections,
    )?;
    info!("Postgres connection has been established");

    let usecases = build_usecases(&dotenvy_env, Arc::new(postgres_pool))?;

    http_serve::start(Arc::new(dotenvy_env), usecases).await?;

    Ok(())
}

fn build_usecases(config: &DotEnvyConfig, db_pool: Arc<PgPoolSquad>) -> Result<UseCases> {
    let stripe_client = Arc::new(StripeClient::new(
        config.stripe.secret_key.clone(),
        config.stripe.webhook_secret.clone(),
        Duration::from_secs(config.stripe.webhook_tolerance_secs),
        Duration::from_secs(config.stripe.request_timeout_secs),
    )?);

    let mut providers: Vec<Arc<dyn NotificationProvider>> = Vec::new();
    if let Some(webhook_url) = config.notifications.webhook_url.clone() {
        providers.push(Arc::new(HttpWebhookProvider::new(webhook_url)?));
    }
    info!(
        providers = providers.len(),
        "notification providers configured"
    );
    let notifier = Notifier::new(providers);

    let catalog_repo = Arc::new(CatalogPostgres::new(Arc::clone(&db_pool)));
    let transaction_repo = Arc::new(TransactionPostgres::new(Arc::clone(&db_pool)));
    let subscription_repo = Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool)));
    let enrollment_repo = Arc::new(EnrollmentPostgres::new(Arc::clone(&db_pool)));
    let earnings_repo = Arc::new(EarningsPostgres::new(Arc::clone(&db_pool)));
    let payout_repo = Arc::new(PayoutPostgres::new(Arc::clone(&db_pool)));
    let settings_repo = Arc::new(PlatformSettingsPostgres::new(Arc::clone(&db_pool)));

    let grantor = Arc::new(EntitlementGrantor::new(
        catalog_repo.clone(),
        subscription_repo.clone(),
        enrollment_repo,
    ));
    let earnings = Arc::new(EarningsCalculator::new(
        earnings_repo.clone(),
        settings_repo,
        config.commission.fallback_rate,
    ));
    let ledger = Arc::new(TransactionLedger::new(
        transaction_repo.clone(),
        subscription_repo.clone(),
        catalog_repo.clone(),
        Arc::clone(&grantor),
        earnings,
        notifier,
    ));

    let payment_intents = Arc::new(PaymentIntentUseCase::new(
        catalog_repo,
        transaction_repo,
        subscription_repo,
        grantor,
        stripe_client.clone(),
    ));
    let webhooks = Arc::new(WebhookUseCase::new(
        stripe_client.clone(),
        Arc::clone(&ledger),
    ));
    let payouts = Arc::new(PayoutUseCase::new(
        earnings_repo,
        payout_repo,
        stripe_client,
        config.payouts.minimum_amount,
        config.payouts.currency.clone(),
    ));

    Ok(UseCases {
        payment_intents,
        webhooks,
        payouts,
        ledger,
    })
}
