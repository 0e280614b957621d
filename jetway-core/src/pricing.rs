use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::surge::SurgeDecision;

/// Itemised price of one booking.
///
/// `total = (base_fare * passengers + seat_surcharges) * (1 + tax_rate) * surge_multiplier`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub base_fare: Decimal,
    pub passenger_count: u32,
    pub seat_surcharges: Decimal,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub taxes: Decimal,
    pub surge_multiplier: Decimal,
    pub surge_applied: bool,
    pub total: Decimal,
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl PriceBreakdown {
    pub fn compute(
        base_fare: Decimal,
        passenger_count: u32,
        seat_prices: &[Decimal],
        tax_rate: Decimal,
        surge: &SurgeDecision,
    ) -> Self {
        let seat_surcharges: Decimal = seat_prices.iter().copied().sum();
        let subtotal = base_fare * Decimal::from(passenger_count) + seat_surcharges;
        let exact_taxes = subtotal * tax_rate;
        let taxes = round_money(exact_taxes);
        let total = round_money((subtotal + exact_taxes) * surge.multiplier);

        Self {
            base_fare,
            passenger_count,
            seat_surcharges,
            subtotal,
            tax_rate,
            taxes,
            surge_multiplier: surge.multiplier,
            surge_applied: surge.applied,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_two_passengers_no_surge() {
        let price = PriceBreakdown::compute(
            dec!(100.00),
            2,
            &[dec!(10.00), dec!(15.00)],
            dec!(0.12),
            &SurgeDecision::none(0),
        );
        assert_eq!(price.subtotal, dec!(225.00));
        assert_eq!(price.taxes, dec!(27.00));
        assert_eq!(price.total, dec!(252.00));
        assert!(!price.surge_applied);
    }

    #[test]
    fn test_surge_multiplies_taxed_subtotal() {
        let surge = SurgeDecision {
            applied: true,
            multiplier: dec!(1.10),
            prior_attempts: 3,
        };
        let price = PriceBreakdown::compute(dec!(100.00), 2, &[dec!(10.00), dec!(15.00)], dec!(0.12), &surge);
        assert_eq!(price.total, dec!(277.20));
        assert!(price.surge_applied);
    }

    #[test]
    fn test_rounds_to_cents() {
        let surge = SurgeDecision {
            applied: true,
            multiplier: dec!(1.10),
            prior_attempts: 3,
        };
        let price = PriceBreakdown::compute(dec!(4321.37), 1, &[], dec!(0.12), &surge);
        // 4321.37 * 1.12 * 1.10 = 5323.92784
        assert_eq!(price.taxes, dec!(518.56));
        assert_eq!(price.total, dec!(5323.93));
    }
}
