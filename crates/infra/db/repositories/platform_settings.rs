use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::{
    domain::repositories::platform_settings::PlatformSettingsRepository,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::platform_settings},
};

pub struct PlatformSettingsPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PlatformSettingsPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PlatformSettingsRepository for PlatformSettingsPostgres {
    async fn current_commission_rate(&self) -> Result<Option<Decimal>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rate = platform_settings::table
            .order(platform_settings::id.asc())
            .select(platform_settings::commission_rate)
            .first::<Decimal>(&mut conn)
            .optional()?;

        Ok(rate)
    }
}
