use anyhow::{Result, bail};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::Serialize;

/// Currencies the payment provider already expresses in their smallest unit.
/// https://docs.stripe.com/currencies#zero-decimal
const ZERO_DECIMAL_CURRENCIES: [&str; 16] = [
    "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv",
    "xaf", "xof", "xpf",
];

pub fn is_zero_decimal(currency: &str) -> bool {
    let currency = currency.trim().to_ascii_lowercase();
    ZERO_DECIMAL_CURRENCIES.contains(&currency.as_str())
}

/// Converts a major-unit amount into the provider's minor-unit integer.
pub fn to_minor_units(amount: Decimal, currency: &str) -> Result<i64> {
    if amount.is_sign_negative() {
        bail!("amount must not be negative: {amount}");
    }

    let scaled = if is_zero_decimal(currency) {
        amount
    } else {
        amount * Decimal::ONE_HUNDRED
    };

    let rounded = scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    rounded
        .to_i64()
        .ok_or_else(|| anyhow::anyhow!("amount {amount} does not fit in minor units"))
}

/// Platform/teacher split of a gross amount at a given commission percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommissionSplit {
    pub gross_amount: Decimal,
    pub commission_rate: Decimal,
    pub platform_fee: Decimal,
    pub net_amount: Decimal,
}

impl CommissionSplit {
    /// `platform_fee = round(gross * rate / 100, 2)` and the net is the exact
    /// remainder, so `platform_fee + net_amount == gross_amount` always holds.
    pub fn compute(gross_amount: Decimal, commission_rate: Decimal) -> Result<Self> {
        if gross_amount.is_sign_negative() {
            bail!("gross amount must not be negative: {gross_amount}");
        }
        if commission_rate < Decimal::ZERO || commission_rate > Decimal::ONE_HUNDRED {
            bail!("commission rate out of range: {commission_rate}");
        }

        let platform_fee = (gross_amount * commission_rate / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let net_amount = gross_amount - platform_fee;

        Ok(Self {
            gross_amount,
            commission_rate,
            platform_fee,
            net_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn usd_is_scaled_by_one_hundred() {
        assert_eq!(to_minor_units(dec!(50), "usd").unwrap(), 5000);
        assert_eq!(to_minor_units(dec!(19.99), "USD").unwrap(), 1999);
    }

    #[test]
    fn zero_decimal_currency_is_not_scaled() {
        assert_eq!(to_minor_units(dec!(1500), "jpy").unwrap(), 1500);
    }

    #[test]
    fn sub_cent_amounts_round_half_away_from_zero() {
        assert_eq!(to_minor_units(dec!(10.005), "eur").unwrap(), 1001);
    }

    #[test]
    fn negative_amount_is_rejected() {
        assert!(to_minor_units(dec!(-1), "usd").is_err());
    }

    #[test]
    fn fifty_dollars_at_thirty_percent() {
        let split = CommissionSplit::compute(dec!(50.00), dec!(30)).unwrap();
        assert_eq!(split.platform_fee, dec!(15.00));
        assert_eq!(split.net_amount, dec!(35.00));
    }

    #[test]
    fn fee_and_net_always_sum_to_gross() {
        let rates = [dec!(0), dec!(12.5), dec!(30), dec!(33.333), dec!(100)];
        let grosses = [dec!(0.01), dec!(0.03), dec!(9.99), dec!(49.95), dec!(1234.57)];

        for rate in rates {
            for gross in grosses {
                let split = CommissionSplit::compute(gross, rate).unwrap();
                assert_eq!(
                    split.platform_fee + split.net_amount,
                    gross,
                    "rate {rate} gross {gross}"
                );
                assert!(split.platform_fee.scale() <= 2);
            }
        }
    }

    #[test]
    fn rate_outside_percentage_range_is_rejected() {
        assert!(CommissionSplit::compute(dec!(10), dec!(101)).is_err());
        assert!(CommissionSplit::compute(dec!(10), dec!(-1)).is_err());
    }
}
