use std::fmt::Display;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Yearly,
    Lifetime,
}

/// Dates derived from a subscription start. `end_date` and `renewal_date` are
/// both absent for lifetime plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionPeriod {
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub renewal_date: Option<DateTime<Utc>>,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
            BillingCycle::Lifetime => "lifetime",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(BillingCycle::Monthly),
            "yearly" => Some(BillingCycle::Yearly),
            "lifetime" => Some(BillingCycle::Lifetime),
            _ => None,
        }
    }

    pub fn length(&self) -> Option<Duration> {
        match self {
            BillingCycle::Monthly => Some(Duration::days(30)),
            BillingCycle::Yearly => Some(Duration::days(365)),
            BillingCycle::Lifetime => None,
        }
    }

    pub fn period_from(&self, start_date: DateTime<Utc>) -> SubscriptionPeriod {
        let end_date = self.length().map(|length| start_date + length);

        SubscriptionPeriod {
            start_date,
            end_date,
            renewal_date: end_date,
        }
    }
}

impl Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap()
    }

    #[test]
    fn monthly_is_thirty_days() {
        let period = BillingCycle::Monthly.period_from(start());
        assert_eq!(period.end_date.unwrap() - period.start_date, Duration::days(30));
        assert_eq!(period.renewal_date, period.end_date);
    }

    #[test]
    fn yearly_is_three_hundred_sixty_five_days_even_across_leap_year() {
        let period = BillingCycle::Yearly.period_from(start());
        assert_eq!(period.end_date.unwrap() - period.start_date, Duration::days(365));
    }

    #[test]
    fn lifetime_has_no_end() {
        let period = BillingCycle::Lifetime.period_from(start());
        assert_eq!(period.end_date, None);
        assert_eq!(period.renewal_date, None);
    }
}
