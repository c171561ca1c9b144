//! Deterministic impact of an intervention on a block's AQI.

use eco_blocks_block_models::DensityLabel;
use eco_blocks_simulation_models::InterventionStrategy;

/// Highest AQI accepted for simulation. Keeps the reduction in tenths
/// well inside `u32`.
pub const MAX_AQI: f64 = 10_000.0;

/// Scales the reduction by building density: denser blocks trap more
/// pollution near the intervention.
#[must_use]
pub const fn density_multiplier(density: DensityLabel) -> f64 {
    match density {
        DensityLabel::High => 1.2,
        DensityLabel::Medium => 1.1,
        DensityLabel::Sparse => 0.9,
        DensityLabel::Low => 1.0,
    }
}

/// Deterministic outcome of applying a strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    /// AQI points removed, to one decimal.
    pub reduction: f64,
    /// `max(0, current - reduction)`, to one decimal and never above the
    /// current AQI.
    pub new_aqi: f64,
    /// `floor(reduction * 10)`.
    pub credits: u32,
}

/// Computes the impact of `strategy` on a block at `current_aqi`.
///
/// The reduction is carried in integer tenths so `credits` is exact.
/// `current_aqi` must be finite and within `0..=MAX_AQI`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn apply(strategy: &InterventionStrategy, density: DensityLabel, current_aqi: f64) -> Impact {
    let raw = current_aqi * strategy.reduction_rate * density_multiplier(density);
    // At most MAX_AQI * 0.45 * 1.2 * 10 tenths.
    let tenths = (raw * 10.0).round().max(0.0) as u32;
    let reduction = f64::from(tenths) / 10.0;
    let new_aqi = round1((current_aqi - reduction).max(0.0)).min(current_aqi);

    Impact {
        reduction,
        new_aqi,
        credits: tenths,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn green_wall_medium_density() {
        let impact = apply(strategy::resolve("Green Wall"), DensityLabel::Medium, 120.0);
        assert!(close(impact.reduction, 19.8), "{impact:?}");
        assert!(close(impact.new_aqi, 100.2), "{impact:?}");
        assert_eq!(impact.credits, 198);
    }

    #[test]
    fn zero_aqi_has_no_impact() {
        let impact = apply(strategy::resolve("Direct Air Capture"), DensityLabel::High, 0.0);
        assert!(close(impact.reduction, 0.0));
        assert!(close(impact.new_aqi, 0.0));
        assert_eq!(impact.credits, 0);
    }

    #[test]
    fn invariants_hold_across_inputs() {
        let densities = [
            DensityLabel::Sparse,
            DensityLabel::Low,
            DensityLabel::Medium,
            DensityLabel::High,
        ];
        for s in strategy::STRATEGIES {
            for density in densities {
                for step in 0..=600 {
                    let current = f64::from(step) * 0.5 + 0.03;
                    let impact = apply(s, density, current);
                    let expected_reduction =
                        round1(current * s.reduction_rate * density_multiplier(density));

                    assert!(close(impact.reduction, expected_reduction));
                    assert!(impact.new_aqi <= current, "{} {current} {impact:?}", s.name);
                    assert!(impact.new_aqi >= 0.0);
                    assert_eq!(
                        f64::from(impact.credits),
                        (impact.reduction * 10.0).round()
                    );
                }
            }
        }
    }

    #[test]
    fn ceiling_aqi_stays_exact() {
        let impact = apply(
            strategy::resolve("Direct Air Capture"),
            DensityLabel::High,
            MAX_AQI,
        );
        let expected = round1(MAX_AQI * 0.45 * 1.2);
        assert!(close(impact.reduction, expected), "{impact:?}");
        assert!(close(impact.new_aqi, MAX_AQI - expected), "{impact:?}");
        assert_eq!(f64::from(impact.credits), expected * 10.0);
    }

    #[test]
    fn multiplier_table() {
        assert!(close(density_multiplier(DensityLabel::High), 1.2));
        assert!(close(density_multiplier(DensityLabel::Medium), 1.1));
        assert!(close(density_multiplier(DensityLabel::Low), 1.0));
        assert!(close(density_multiplier(DensityLabel::Sparse), 0.9));
    }
}
