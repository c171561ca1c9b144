//! Static intervention strategy table.

use eco_blocks_simulation_models::InterventionStrategy;

/// All known interventions.
pub const STRATEGIES: &[InterventionStrategy] = &[
    InterventionStrategy {
        name: "Green Wall",
        reduction_rate: 0.15,
        unit_cost: 12_000,
    },
    InterventionStrategy {
        name: "Algae Panel",
        reduction_rate: 0.25,
        unit_cost: 25_000,
    },
    InterventionStrategy {
        name: "Direct Air Capture",
        reduction_rate: 0.45,
        unit_cost: 80_000,
    },
    InterventionStrategy {
        name: "Building Retrofit",
        reduction_rate: 0.30,
        unit_cost: 45_000,
    },
    InterventionStrategy {
        name: "Biochar",
        reduction_rate: 0.10,
        unit_cost: 8_000,
    },
    InterventionStrategy {
        name: "Cool Roof + Solar",
        reduction_rate: 0.20,
        unit_cost: 35_000,
    },
];

/// The strategy applied to unknown intervention names: the cheapest one
/// in [`STRATEGIES`].
#[must_use]
pub fn default_strategy() -> &'static InterventionStrategy {
    STRATEGIES
        .iter()
        .min_by_key(|s| s.unit_cost)
        .unwrap_or(&STRATEGIES[0])
}

/// Finds a strategy by exact name, then case-insensitively (ignoring
/// surrounding whitespace).
#[must_use]
pub fn find(name: &str) -> Option<&'static InterventionStrategy> {
    STRATEGIES.iter().find(|s| s.name == name).or_else(|| {
        let name = name.trim();
        STRATEGIES
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    })
}

/// Resolves an intervention name, substituting [`default_strategy`] for
/// unknown names.
#[must_use]
pub fn resolve(name: &str) -> &'static InterventionStrategy {
    find(name).unwrap_or_else(|| {
        let fallback = default_strategy();
        log::info!(
            "Unknown intervention '{name}', using default strategy '{}'",
            fallback.name
        );
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_are_in_unit_interval() {
        for s in STRATEGIES {
            assert!(
                s.reduction_rate > 0.0 && s.reduction_rate <= 1.0,
                "{} has rate {}",
                s.name,
                s.reduction_rate
            );
        }
    }

    #[test]
    fn default_is_cheapest() {
        let default = default_strategy();
        assert_eq!(default.name, "Biochar");
        assert!(STRATEGIES.iter().all(|s| s.unit_cost >= default.unit_cost));
    }

    #[test]
    fn exact_and_case_insensitive_lookup() {
        assert_eq!(find("Green Wall").unwrap().unit_cost, 12_000);
        assert_eq!(find("direct air capture").unwrap().name, "Direct Air Capture");
        assert_eq!(find("  algae panel ").unwrap().name, "Algae Panel");
        assert!(find("Unknown Tech").is_none());
    }

    #[test]
    fn unknown_resolves_to_default() {
        let s = resolve("Unknown Tech");
        assert_eq!(s.name, "Biochar");
        assert!((s.reduction_rate - 0.10).abs() < f64::EPSILON);
    }
}
