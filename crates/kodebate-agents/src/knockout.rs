//! Knockout level calculation.
//!
//! Pure functions: no I/O, no clock. LONG levels sit below price and SHORT
//! levels above it; in both cases the tiers run aggressive (nearest),
//! moderate, conservative (farthest).

use kodebate_models::{
    KnockoutConfig, KnockoutLevel, PositionPlan, RiskSettings, RiskTier, Signal, Strategies,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

/// Minimum leverage ever recommended.
const MIN_LEVERAGE: u32 = 2;

/// Significant digits kept for sub-unit prices.
const SUB_UNIT_DIGITS: u32 = 6;
/// Keeps the rounding scale within what `Decimal` can represent.
const MAX_SHIFTS: u32 = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Below,
    Above,
}

impl Side {
    fn for_signal(signal: Signal) -> Option<Side> {
        match signal {
            Signal::Long => Some(Side::Below),
            Signal::Short => Some(Side::Above),
            Signal::Hold | Signal::Ignore => None,
        }
    }

    /// `from` moved `by` further away from price.
    fn step(self, from: Decimal, by: Decimal) -> Decimal {
        match self {
            Side::Below => from - by,
            Side::Above => from + by,
        }
    }

    /// `from` moved `pct` percent further away from price.
    fn scale(self, from: Decimal, pct: Decimal) -> Decimal {
        let factor = pct / Decimal::ONE_HUNDRED;
        match self {
            Side::Below => from * (Decimal::ONE - factor),
            Side::Above => from * (Decimal::ONE + factor),
        }
    }

    fn round_away(self, value: Decimal, dp: u32) -> Decimal {
        let strategy = match self {
            Side::Below => RoundingStrategy::ToNegativeInfinity,
            Side::Above => RoundingStrategy::ToPositiveInfinity,
        };
        value.round_dp_with_strategy(dp, strategy)
    }

    /// Whether `candidate` sits at least `floor` beyond `reference`.
    fn clears(self, reference: Decimal, candidate: Decimal, floor: Decimal) -> bool {
        match self {
            Side::Below => candidate <= reference - floor,
            Side::Above => candidate >= reference + floor,
        }
    }

    fn farther(self, a: Decimal, b: Decimal) -> Decimal {
        match self {
            Side::Below => a.min(b),
            Side::Above => a.max(b),
        }
    }
}

/// Decimal places levels are rounded to. Prices of 1 and above use cents;
/// below that six significant digits are kept, however small the price.
fn precision(price: Decimal) -> u32 {
    if price >= Decimal::ONE {
        return 2;
    }
    let mut scaled = price;
    let mut shifts = 0;
    while scaled < Decimal::ONE && shifts < MAX_SHIFTS {
        scaled *= Decimal::TEN;
        shifts += 1;
    }
    SUB_UNIT_DIGITS - 1 + shifts
}

fn tick(dp: u32) -> Decimal {
    Decimal::new(1, dp)
}

fn distance_pct(price: Decimal, level: Decimal) -> Decimal {
    ((level - price).abs() / price * Decimal::ONE_HUNDRED).round_dp(2)
}

/// Zones on the knockout side of price, nearest first.
fn anchors(
    price: Decimal,
    side: Side,
    support: &[Decimal],
    resistance: &[Decimal],
) -> Vec<Decimal> {
    let mut zones: Vec<Decimal> = match side {
        Side::Below => support
            .iter()
            .copied()
            .filter(|z| *z > Decimal::ZERO && *z < price)
            .collect(),
        Side::Above => resistance.iter().copied().filter(|z| *z > price).collect(),
    };
    match side {
        Side::Below => zones.sort_by(|a, b| b.cmp(a)),
        Side::Above => zones.sort(),
    }
    zones
}

/// Derive the three knockout tiers for `signal`.
///
/// Zones on the knockout side anchor the tiers nearest first. Tiers without
/// an anchor are generated from the risk settings: the first one
/// `stop_loss_pct` from price, each further one `knockout_buffer_pct` beyond
/// the previous level. Every level keeps at least `min_spacing_pct` of price
/// (and at least one tick) from price and from its neighbour.
///
/// Returns `None` for HOLD/IGNORE and for a non-positive price.
pub fn compute(
    price: Decimal,
    signal: Signal,
    support_zones: &[Decimal],
    resistance_zones: &[Decimal],
    settings: &RiskSettings,
    config: &KnockoutConfig,
) -> Option<Strategies> {
    let side = Side::for_signal(signal)?;
    if price <= Decimal::ZERO {
        return None;
    }

    let dp = precision(price);
    let floor = (price * config.min_spacing_pct / Decimal::ONE_HUNDRED).max(tick(dp));

    let mut levels: Vec<Decimal> = Vec::with_capacity(3);
    let mut previous = price;

    for zone in anchors(price, side, support_zones, resistance_zones) {
        if levels.len() == 3 {
            break;
        }
        let candidate = side.round_away(zone, dp);
        if side.clears(previous, candidate, floor) {
            levels.push(candidate);
            previous = candidate;
        }
    }

    while levels.len() < 3 {
        let target = if levels.is_empty() {
            side.scale(price, settings.stop_loss_pct)
        } else {
            side.scale(previous, settings.knockout_buffer_pct)
        };
        let limit = side.step(previous, floor);
        let level = side.farther(side.round_away(target, dp), side.round_away(limit, dp));
        levels.push(level);
        previous = level;
    }

    if levels.iter().any(|level| *level <= Decimal::ZERO) {
        warn!(%price, ?levels, "Knockout levels fell to or below zero");
        return None;
    }

    let tier = |level: Decimal, risk: RiskTier| KnockoutLevel {
        level,
        distance_pct: distance_pct(price, level),
        risk,
    };

    Some(Strategies {
        aggressive: tier(levels[0], RiskTier::High),
        moderate: tier(levels[1], RiskTier::Medium),
        conservative: tier(levels[2], RiskTier::Low),
    })
}

/// Size a knockout position from the caller's budget.
///
/// A knockout wipes out the stake, so the maximum loss equals the stake.
/// Leverage is `100 / moderate distance`, floored, between 2 and the
/// profile's cap.
pub fn size_position(
    budget: Decimal,
    strategies: &Strategies,
    settings: &RiskSettings,
    config: &KnockoutConfig,
) -> Option<PositionPlan> {
    if budget <= Decimal::ZERO {
        return None;
    }

    let stake = (budget * config.stake_fraction).round_dp(2);
    let raw_leverage = Decimal::ONE_HUNDRED
        .checked_div(strategies.moderate.distance_pct)?
        .floor()
        .to_u32()
        .unwrap_or(u32::MAX);

    Some(PositionPlan {
        stake,
        max_loss: stake,
        recommended_leverage: raw_leverage.max(MIN_LEVERAGE).min(settings.max_leverage),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kodebate_models::RiskProfile;
    use rust_decimal_macros::dec;

    fn moderate() -> RiskSettings {
        RiskProfile::Moderate.settings()
    }

    fn long(price: Decimal, support: &[Decimal]) -> Strategies {
        compute(
            price,
            Signal::Long,
            support,
            &[],
            &moderate(),
            &KnockoutConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn support_zones_anchor_long_tiers() {
        let s = long(dec!(260.25), &[dec!(245.00), dec!(250.00), dec!(255.00)]);
        assert_eq!(s.levels(), [dec!(245.00), dec!(250.00), dec!(255.00)]);
        assert_eq!(s.aggressive.risk, RiskTier::High);
        assert_eq!(s.moderate.risk, RiskTier::Medium);
        assert_eq!(s.conservative.risk, RiskTier::Low);
        assert_eq!(s.aggressive.distance_pct, dec!(2.02));
    }

    #[test]
    fn missing_zones_are_generated_from_profile() {
        let s = long(dec!(100), &[]);
        assert_eq!(s.aggressive.level, dec!(92.00));
        assert_eq!(s.moderate.level, dec!(87.40));
        assert_eq!(s.conservative.level, dec!(83.03));
        assert_eq!(s.moderate.distance_pct, dec!(12.60));
    }

    #[test]
    fn single_anchor_then_buffers() {
        let s = long(dec!(100), &[dec!(95), dec!(104)]);
        assert_eq!(s.aggressive.level, dec!(95));
        assert_eq!(s.moderate.level, dec!(90.25));
        assert_eq!(s.conservative.level, dec!(85.73));
    }

    #[test]
    fn short_tiers_mirror_above_price() {
        let s = compute(
            dec!(30.10),
            Signal::Short,
            &[dec!(28.00)],
            &[],
            &moderate(),
            &KnockoutConfig::default(),
        )
        .unwrap();
        assert_eq!(s.aggressive.level, dec!(32.51));
        assert_eq!(s.moderate.level, dec!(34.14));
        assert_eq!(s.conservative.level, dec!(35.85));
    }

    #[test]
    fn short_uses_resistance_nearest_first() {
        let s = compute(
            dec!(30.10),
            Signal::Short,
            &[],
            &[dec!(33.00), dec!(31.00), dec!(35.00), dec!(29.00)],
            &moderate(),
            &KnockoutConfig::default(),
        )
        .unwrap();
        assert_eq!(s.levels(), [dec!(35.00), dec!(33.00), dec!(31.00)]);
    }

    #[test]
    fn zones_hugging_price_are_skipped() {
        let s = long(dec!(100), &[dec!(99.8), dec!(99.7), dec!(99.6)]);
        assert_eq!(s.aggressive.level, dec!(92.00));
    }

    #[test]
    fn clustered_zones_keep_minimum_spacing() {
        let s = long(dec!(100), &[dec!(95), dec!(94.9), dec!(94.8)]);
        assert_eq!(s.aggressive.level, dec!(95));
        assert_eq!(s.moderate.level, dec!(90.25));
    }

    #[test]
    fn spacing_floor_overrides_small_buffers() {
        let config = KnockoutConfig {
            min_spacing_pct: dec!(10),
            ..KnockoutConfig::default()
        };
        let s = compute(
            dec!(100),
            Signal::Long,
            &[],
            &[],
            &RiskProfile::Yolo.settings(),
            &config,
        )
        .unwrap();
        assert_eq!(s.levels(), [dec!(55), dec!(65), dec!(75)]);
    }

    #[test]
    fn sub_unit_prices_keep_precision() {
        let s = long(dec!(0.5), &[]);
        assert_eq!(s.aggressive.level, dec!(0.46));
        assert_eq!(s.moderate.level, dec!(0.437));
        assert_eq!(s.conservative.level, dec!(0.41515));
    }

    #[test]
    fn micro_prices_keep_relative_precision() {
        let s = long(dec!(0.0000025), &[]);
        assert_eq!(s.aggressive.level, dec!(0.0000023));
        assert_eq!(s.moderate.level, dec!(0.000002185));
        assert_eq!(s.conservative.level, dec!(0.00000207575));
        assert_eq!(s.aggressive.distance_pct, dec!(8.00));

        let s = long(dec!(0.0000089), &[]);
        assert_eq!(s.aggressive.level, dec!(0.000008188));
        assert_eq!(s.aggressive.distance_pct, dec!(8.00));
        assert!(s.conservative.level > Decimal::ZERO);

        let s = compute(
            dec!(0.00000082),
            Signal::Short,
            &[],
            &[],
            &moderate(),
            &KnockoutConfig::default(),
        )
        .unwrap();
        assert_eq!(s.aggressive.level, dec!(0.0000008856));
        assert!(s.aggressive.level < s.moderate.level);
        assert!(s.moderate.level < s.conservative.level);
    }

    #[test]
    fn precision_follows_magnitude() {
        assert_eq!(precision(dec!(260.25)), 2);
        assert_eq!(precision(dec!(1)), 2);
        assert_eq!(precision(dec!(0.5)), 6);
        assert_eq!(precision(dec!(0.05)), 7);
        assert_eq!(precision(dec!(0.0000025)), 11);
    }

    #[test]
    fn no_levels_without_direction() {
        for signal in [Signal::Hold, Signal::Ignore] {
            assert!(compute(
                dec!(100),
                signal,
                &[dec!(95)],
                &[dec!(105)],
                &moderate(),
                &KnockoutConfig::default()
            )
            .is_none());
        }
        assert!(compute(
            Decimal::ZERO,
            Signal::Long,
            &[],
            &[],
            &moderate(),
            &KnockoutConfig::default()
        )
        .is_none());
    }

    #[test]
    fn ordering_holds_for_every_profile() {
        let price = dec!(187.43);
        let zones = [dec!(186.90), dec!(180.00), dec!(179.95), dec!(150.00)];
        for profile in [
            RiskProfile::Conservative,
            RiskProfile::Moderate,
            RiskProfile::Aggressive,
            RiskProfile::Yolo,
        ] {
            let settings = profile.settings();
            let config = KnockoutConfig::default();
            let l = compute(price, Signal::Long, &zones, &[], &settings, &config).unwrap();
            assert!(l.conservative.level < l.moderate.level);
            assert!(l.moderate.level < l.aggressive.level);
            assert!(l.aggressive.level < price);

            let s = compute(price, Signal::Short, &[], &[dec!(188)], &settings, &config).unwrap();
            assert!(price < s.aggressive.level);
            assert!(s.aggressive.level < s.moderate.level);
            assert!(s.moderate.level < s.conservative.level);
        }
    }

    #[test]
    fn position_is_sized_from_budget() {
        let s = long(dec!(100), &[]);
        let plan = size_position(dec!(1000), &s, &moderate(), &KnockoutConfig::default()).unwrap();
        assert_eq!(plan.stake, dec!(300.00));
        assert_eq!(plan.max_loss, plan.stake);
        // 100 / 12.60 = 7, capped at the moderate maximum of 5.
        assert_eq!(plan.recommended_leverage, 5);
    }

    #[test]
    fn leverage_never_below_two() {
        let s = compute(
            dec!(100),
            Signal::Long,
            &[],
            &[],
            &RiskProfile::Yolo.settings(),
            &KnockoutConfig::default(),
        )
        .unwrap();
        // Moderate tier sits 26.5% away: 100 / 26.5 = 3.
        let plan = size_position(
            dec!(500),
            &s,
            &RiskProfile::Yolo.settings(),
            &KnockoutConfig::default(),
        )
        .unwrap();
        assert_eq!(plan.recommended_leverage, 3);

        let far = Strategies {
            moderate: KnockoutLevel {
                level: dec!(40),
                distance_pct: dec!(60),
                risk: RiskTier::Medium,
            },
            ..s
        };
        let plan = size_position(
            dec!(500),
            &far,
            &RiskProfile::Yolo.settings(),
            &KnockoutConfig::default(),
        )
        .unwrap();
        assert_eq!(plan.recommended_leverage, 2);
    }

    #[test]
    fn no_position_without_budget() {
        let s = long(dec!(100), &[]);
        let config = KnockoutConfig::default();
        assert!(size_position(Decimal::ZERO, &s, &moderate(), &config).is_none());
    }
}
