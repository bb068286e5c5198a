use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::billing_cycles::BillingCycle,
    infra::db::postgres::schema::plans,
};

#[derive(Debug, Clone)]
pub struct PlanEntity {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub is_active: bool,
}

/// Raw row used for Diesel queries. The billing cycle stays as text and is parsed into BillingCycle.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plans)]
pub struct PlanRow {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub currency: String,
    pub billing_cycle: String,
    pub is_active: bool,
}

impl TryFrom<PlanRow> for PlanEntity {
    type Error = anyhow::Error;

    fn try_from(value: PlanRow) -> Result<Self, Self::Error> {
        let billing_cycle = BillingCycle::from_str(&value.billing_cycle).ok_or_else(|| {
            anyhow::anyhow!(
                "plan {} has unknown billing cycle {}",
                value.id,
                value.billing_cycle
            )
        })?;

        Ok(Self {
            id: value.id,
            name: value.name,
            price: value.price,
            currency: value.currency,
            billing_cycle,
            is_active: value.is_active,
        })
    }
}
