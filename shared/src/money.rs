//! Currency rounding for display

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serializer;

/// Round to two decimal places, half away from zero, keeping the scale
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Serialize an amount as a rounded currency string
pub fn serialize<S>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&round_money(*amount).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(dec!(80)).to_string(), "80.00");
        assert_eq!(round_money(dec!(11.09889)).to_string(), "11.10");
        assert_eq!(round_money(dec!(0.005)).to_string(), "0.01");
        assert_eq!(round_money(dec!(2.344)).to_string(), "2.34");
    }
}
