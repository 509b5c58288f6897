//! Pricing rules: per-unit price, line total and stock-kg equivalent
//!
//! Stock is tracked in kilograms whatever unit a vegetable is sold in. Units
//! without a natural weight (piece, bundle, packet without a packet weight)
//! use fixed approximations from [`ConversionFactors`]. These are not
//! physically accurate.
//!
//! Restoration on cancellation uses [`PricingResolver::restoration_kg`], which
//! always applies `packet_restore_kg` to packets and ignores the packet weight
//! the sale was deducted with, so a cancelled packet order may restore a
//! different amount than was deducted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Price, Unit};

/// Unit-to-kilogram conversion factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionFactors {
    /// Kilograms deducted per piece
    pub piece_kg: Decimal,
    /// Kilograms deducted per bundle
    pub bundle_kg: Decimal,
    /// Kilograms deducted per packet when the price has no packet weight
    pub packet_fallback_kg: Decimal,
    /// Kilograms restored per packet on cancellation
    pub packet_restore_kg: Decimal,
    pub grams_per_kg: Decimal,
}

impl Default for ConversionFactors {
    fn default() -> Self {
        Self {
            piece_kg: Decimal::new(5, 1),
            bundle_kg: Decimal::new(5, 1),
            packet_fallback_kg: Decimal::new(5, 1),
            packet_restore_kg: Decimal::new(5, 1),
            grams_per_kg: Decimal::from(1000),
        }
    }
}

impl ConversionFactors {
    /// Every factor must be strictly positive
    pub fn check(&self) -> Result<(), String> {
        let factors = [
            ("piece_kg", self.piece_kg),
            ("bundle_kg", self.bundle_kg),
            ("packet_fallback_kg", self.packet_fallback_kg),
            ("packet_restore_kg", self.packet_restore_kg),
            ("grams_per_kg", self.grams_per_kg),
        ];
        match factors.iter().find(|(_, value)| *value <= Decimal::ZERO) {
            Some((name, _)) => Err(format!("pricing.{} must be greater than zero", name)),
            None => Ok(()),
        }
    }
}

/// Outcome of pricing one line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub unit_price: Decimal,
    /// `unit_price * quantity`, unrounded
    pub line_total: Decimal,
    pub stock_deduct_kg: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("not sold by {0}")]
    UnitNotSold(Unit),

    #[error("quantity out of range for {0}")]
    OutOfRange(Unit),
}

/// Resolves purchase units against a price record
#[derive(Debug, Clone, Default)]
pub struct PricingResolver {
    factors: ConversionFactors,
}

impl PricingResolver {
    pub fn new(factors: ConversionFactors) -> Self {
        Self { factors }
    }

    pub fn factors(&self) -> &ConversionFactors {
        &self.factors
    }

    /// Price `quantity` of `unit` (in that unit's own magnitude, so grams
    /// for `Gram`) against `price`.
    pub fn resolve(
        &self,
        price: &Price,
        unit: Unit,
        quantity: Decimal,
    ) -> Result<Resolution, PricingError> {
        let f = &self.factors;
        let not_sold = || PricingError::UnitNotSold(unit);
        let out_of_range = || PricingError::OutOfRange(unit);

        let (unit_price, stock_deduct_kg) = match unit {
            Unit::Kg | Unit::Bunch => (price.price_per_kg.ok_or_else(not_sold)?, Some(quantity)),
            Unit::Gram => {
                let per_kg = price.price_per_kg.ok_or_else(not_sold)?;
                (
                    per_kg.checked_div(f.grams_per_kg).ok_or_else(out_of_range)?,
                    quantity.checked_div(f.grams_per_kg),
                )
            }
            Unit::Piece => (
                price.price_per_piece.ok_or_else(not_sold)?,
                quantity.checked_mul(f.piece_kg),
            ),
            Unit::Packet => {
                let per_packet = price.price_per_packet.ok_or_else(not_sold)?;
                let packet_kg = price.packet_weight.unwrap_or(f.packet_fallback_kg);
                (per_packet, quantity.checked_mul(packet_kg))
            }
            Unit::Bundle => (
                price.price_per_bundle.ok_or_else(not_sold)?,
                quantity.checked_mul(f.bundle_kg),
            ),
        };

        Ok(Resolution {
            unit_price,
            line_total: unit_price.checked_mul(quantity).ok_or_else(out_of_range)?,
            stock_deduct_kg: stock_deduct_kg.ok_or_else(out_of_range)?,
        })
    }

    /// Kilograms to put back when a line of `quantity` `unit` is cancelled
    pub fn restoration_kg(&self, unit: Unit, quantity: Decimal) -> Result<Decimal, PricingError> {
        let f = &self.factors;
        match unit {
            Unit::Kg | Unit::Bunch => Some(quantity),
            Unit::Gram => quantity.checked_div(f.grams_per_kg),
            Unit::Piece => quantity.checked_mul(f.piece_kg),
            Unit::Packet => quantity.checked_mul(f.packet_restore_kg),
            Unit::Bundle => quantity.checked_mul(f.bundle_kg),
        }
        .ok_or(PricingError::OutOfRange(unit))
    }

    /// Units `price` can be bought in
    pub fn available_units(&self, price: &Price) -> Vec<Unit> {
        Unit::ALL
            .into_iter()
            .filter(|unit| self.resolve(price, *unit, Decimal::ONE).is_ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn price() -> Price {
        Price {
            id: Uuid::new_v4(),
            vegetable_id: Uuid::new_v4(),
            price_per_kg: None,
            price_per_piece: None,
            price_per_packet: None,
            price_per_bundle: None,
            packet_weight: None,
            effective_from: Utc::now(),
        }
    }

    #[test]
    fn test_kg_line() {
        let p = Price { price_per_kg: Some(dec!(40)), ..price() };
        let r = PricingResolver::default().resolve(&p, Unit::Kg, dec!(2)).unwrap();
        assert_eq!(r.unit_price, dec!(40));
        assert_eq!(r.line_total, dec!(80.00));
        assert_eq!(r.stock_deduct_kg, dec!(2));
    }

    #[test]
    fn test_gram_line_uses_grams() {
        let p = Price { price_per_kg: Some(dec!(40)), ..price() };
        let r = PricingResolver::default().resolve(&p, Unit::Gram, dec!(250)).unwrap();
        assert_eq!(r.unit_price, dec!(0.04));
        assert_eq!(r.line_total, dec!(10));
        assert_eq!(r.stock_deduct_kg, dec!(0.25));
    }

    #[test]
    fn test_piece_line_uses_fixed_weight() {
        let p = Price { price_per_piece: Some(dec!(60)), ..price() };
        let r = PricingResolver::default().resolve(&p, Unit::Piece, dec!(3)).unwrap();
        assert_eq!(r.unit_price, dec!(60));
        assert_eq!(r.line_total, dec!(180.00));
        assert_eq!(r.stock_deduct_kg, dec!(1.5));
    }

    #[test]
    fn test_packet_line_uses_packet_weight() {
        let p = Price {
            price_per_packet: Some(dec!(25)),
            packet_weight: Some(dec!(0.25)),
            ..price()
        };
        let r = PricingResolver::default().resolve(&p, Unit::Packet, dec!(4)).unwrap();
        assert_eq!(r.line_total, dec!(100));
        assert_eq!(r.stock_deduct_kg, dec!(1.00));

        let no_weight = Price { packet_weight: None, ..p };
        let r = PricingResolver::default()
            .resolve(&no_weight, Unit::Packet, dec!(4))
            .unwrap();
        assert_eq!(r.stock_deduct_kg, dec!(2.0));
    }

    #[test]
    fn test_bundle_and_bunch() {
        let p = Price {
            price_per_kg: Some(dec!(30)),
            price_per_bundle: Some(dec!(15)),
            ..price()
        };
        let resolver = PricingResolver::default();
        let bundle = resolver.resolve(&p, Unit::Bundle, dec!(2)).unwrap();
        assert_eq!(bundle.unit_price, dec!(15));
        assert_eq!(bundle.stock_deduct_kg, dec!(1.0));

        let bunch = resolver.resolve(&p, Unit::Bunch, dec!(2)).unwrap();
        assert_eq!(bunch.unit_price, dec!(30));
        assert_eq!(bunch.stock_deduct_kg, dec!(2));
    }

    #[test]
    fn test_missing_unit_price_is_not_sold() {
        let p = Price { price_per_piece: Some(dec!(60)), ..price() };
        let resolver = PricingResolver::default();
        assert_eq!(
            resolver.resolve(&p, Unit::Kg, dec!(1)),
            Err(PricingError::UnitNotSold(Unit::Kg))
        );
        assert_eq!(
            resolver.resolve(&p, Unit::Bunch, dec!(1)),
            Err(PricingError::UnitNotSold(Unit::Bunch))
        );
        assert_eq!(resolver.available_units(&p), vec![Unit::Piece]);
    }

    #[test]
    fn test_line_total_is_not_rounded() {
        let p = Price { price_per_kg: Some(dec!(33.33)), ..price() };
        let r = PricingResolver::default().resolve(&p, Unit::Gram, dec!(333)).unwrap();
        assert_eq!(r.line_total, dec!(11.09889));
    }

    #[test]
    fn test_restoration_ignores_packet_weight() {
        let resolver = PricingResolver::default();
        assert_eq!(resolver.restoration_kg(Unit::Packet, dec!(2)), Ok(dec!(1.0)));
        assert_eq!(resolver.restoration_kg(Unit::Kg, dec!(2)), Ok(dec!(2)));
        assert_eq!(resolver.restoration_kg(Unit::Gram, dec!(500)), Ok(dec!(0.5)));
        assert_eq!(resolver.restoration_kg(Unit::Piece, dec!(3)), Ok(dec!(1.5)));
    }

    #[test]
    fn test_restoration_of_bunch_and_bundle() {
        // Bunches restore by weight like kg; bundles at the bundle factor
        let resolver = PricingResolver::default();
        assert_eq!(resolver.restoration_kg(Unit::Bunch, dec!(3)), Ok(dec!(3)));
        assert_eq!(resolver.restoration_kg(Unit::Bundle, dec!(3)), Ok(dec!(1.5)));
    }

    #[test]
    fn test_oversized_quantity_is_out_of_range() {
        let p = Price {
            price_per_kg: Some(dec!(40)),
            price_per_piece: Some(dec!(10)),
            ..price()
        };
        let resolver = PricingResolver::default();
        assert_eq!(
            resolver.resolve(&p, Unit::Kg, Decimal::MAX),
            Err(PricingError::OutOfRange(Unit::Kg))
        );
        assert_eq!(
            resolver.resolve(&p, Unit::Piece, Decimal::MAX),
            Err(PricingError::OutOfRange(Unit::Piece))
        );

        let expensive = Price { price_per_kg: Some(Decimal::MAX), ..price() };
        assert_eq!(
            resolver.resolve(&expensive, Unit::Kg, dec!(2)),
            Err(PricingError::OutOfRange(Unit::Kg))
        );
    }

    #[test]
    fn test_zero_gram_factor_is_out_of_range() {
        let resolver = PricingResolver::new(ConversionFactors {
            grams_per_kg: Decimal::ZERO,
            ..ConversionFactors::default()
        });
        let p = Price { price_per_kg: Some(dec!(40)), ..price() };
        assert_eq!(
            resolver.resolve(&p, Unit::Gram, dec!(250)),
            Err(PricingError::OutOfRange(Unit::Gram))
        );
        assert_eq!(
            resolver.restoration_kg(Unit::Gram, dec!(250)),
            Err(PricingError::OutOfRange(Unit::Gram))
        );
    }

    #[test]
    fn test_factor_check() {
        assert!(ConversionFactors::default().check().is_ok());

        let zero_grams = ConversionFactors {
            grams_per_kg: Decimal::ZERO,
            ..ConversionFactors::default()
        };
        assert_eq!(
            zero_grams.check(),
            Err("pricing.grams_per_kg must be greater than zero".to_string())
        );

        let negative_piece = ConversionFactors {
            piece_kg: dec!(-0.5),
            ..ConversionFactors::default()
        };
        assert!(negative_piece.check().is_err());
    }

    #[test]
    fn test_factors_are_tunable() {
        let resolver = PricingResolver::new(ConversionFactors {
            piece_kg: dec!(0.2),
            ..ConversionFactors::default()
        });
        let p = Price { price_per_piece: Some(dec!(10)), ..price() };
        let r = resolver.resolve(&p, Unit::Piece, dec!(5)).unwrap();
        assert_eq!(r.stock_deduct_kg, dec!(1.0));
        assert_eq!(resolver.restoration_kg(Unit::Piece, dec!(5)), Ok(dec!(1.0)));
    }
}
