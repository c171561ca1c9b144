//! Deterministic, network-free narratives and forecasts.
//!
//! Used whenever the narrative generator is disabled, unreachable, slow,
//! or returns output that violates the narrative contract.

use eco_blocks_block_models::DensityLabel;
use eco_blocks_simulation_models::{FORECAST_DAYS, Forecast, NarrativeBlock};

/// Daily AQI improvement assumed by the fallback forecast.
const DAILY_AQI_DECAY: f64 = 0.5;

/// Traffic speed (km/h) used for every day of the fallback forecast.
pub const FALLBACK_TRAFFIC_SPEED: f64 = 35.0;

const TECH_SPECS: &[(&str, &str)] = &[
    (
        "Green Wall",
        "Modular living wall of moss and fern panels with drip irrigation; \
         foliage captures PM2.5 and cools the facade.",
    ),
    (
        "Algae Panel",
        "Facade-mounted photobioreactor panels cultivating microalgae that \
         fix CO2 and release oxygen.",
    ),
    (
        "Direct Air Capture",
        "Solid-sorbent capture unit drawing street-level air through filter \
         beds that bind CO2 and fine particulates.",
    ),
    (
        "Building Retrofit",
        "Envelope insulation, heat-pump HVAC, and sealed ventilation with \
         MERV-13 filtration to cut combustion emissions.",
    ),
    (
        "Biochar",
        "Biochar-amended soil beds and planters that sequester carbon and \
         support street-tree root health.",
    ),
    (
        "Cool Roof + Solar",
        "High-albedo roof membrane paired with rooftop photovoltaics, \
         lowering cooling demand and grid emissions.",
    ),
];

const GENERIC_TECH_SPEC: &str =
    "Modular urban air-quality intervention sized for a single city block.";

/// Builds a complete narrative from the intervention, block density, and
/// projected AQI. Every field is non-empty.
#[must_use]
pub fn narrative(intervention: &str, density: DensityLabel, new_aqi: f64) -> NarrativeBlock {
    let tech_specs = TECH_SPECS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(intervention.trim()))
        .map_or(GENERIC_TECH_SPEC, |(_, spec)| *spec);

    let name = if intervention.trim().is_empty() {
        "This intervention"
    } else {
        intervention.trim()
    };

    NarrativeBlock {
        headline: format!("{name} projected to bring local AQI to {new_aqi:.1}"),
        content: format!(
            "Deploying {name} on a {} block is projected to lower the local air \
             quality index to {new_aqi:.1}. {}",
            density_phrase(density),
            dispersion_note(density),
        ),
        tech_specs: tech_specs.to_string(),
        recommendation: recommendation(new_aqi).to_string(),
    }
}

/// Seven-day fallback forecast: AQI improving by half a point per day
/// from `new_aqi`, traffic constant.
#[must_use]
pub fn forecast(new_aqi: f64) -> Forecast {
    let aqi = (0..FORECAST_DAYS)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let day = i as f64;
            (new_aqi - day * DAILY_AQI_DECAY).max(0.0)
        })
        .collect();

    Forecast {
        aqi,
        traffic: vec![FALLBACK_TRAFFIC_SPEED; FORECAST_DAYS],
    }
}

const fn density_phrase(density: DensityLabel) -> &'static str {
    match density {
        DensityLabel::High => "densely built",
        DensityLabel::Medium => "moderately built",
        DensityLabel::Low => "lightly built",
        DensityLabel::Sparse => "sparsely built",
    }
}

const fn dispersion_note(density: DensityLabel) -> &'static str {
    match density {
        DensityLabel::High | DensityLabel::Medium => {
            "Tight street canyons slow dispersion, so local capture has an outsized effect."
        }
        DensityLabel::Low | DensityLabel::Sparse => {
            "Open surroundings disperse pollutants quickly, so gains spread across the area."
        }
    }
}

fn recommendation(new_aqi: f64) -> &'static str {
    if new_aqi <= 50.0 {
        "Maintain the installation and monitor seasonal readings to keep air quality in the good range."
    } else if new_aqi <= 100.0 {
        "Pair this with street trees or traffic calming to move the block into the good range."
    } else {
        "Combine with additional interventions on neighboring blocks; air quality remains unhealthy for sensitive groups."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_intervention_uses_its_tech_spec() {
        let block = narrative("Green Wall", DensityLabel::Medium, 100.2);
        assert!(block.tech_specs.contains("living wall"));
        assert!(block.headline.contains("100.2"));
        assert!(block.content.contains("moderately built"));
    }

    #[test]
    fn unknown_intervention_uses_generic_phrase() {
        let block = narrative("Unknown Tech", DensityLabel::Sparse, 40.0);
        assert_eq!(block.tech_specs, GENERIC_TECH_SPEC);
        assert!(block.headline.starts_with("Unknown Tech"));
    }

    #[test]
    fn every_field_is_non_empty() {
        for name in ["", "Biochar", "??"] {
            for density in [DensityLabel::Sparse, DensityLabel::High] {
                for aqi in [0.0, 75.0, 180.0] {
                    let block = narrative(name, density, aqi);
                    assert!(!block.headline.trim().is_empty());
                    assert!(!block.content.trim().is_empty());
                    assert!(!block.tech_specs.trim().is_empty());
                    assert!(!block.recommendation.trim().is_empty());
                }
            }
        }
    }

    #[test]
    fn forecast_decays_and_clamps() {
        let f = forecast(100.2);
        assert_eq!(f.aqi.len(), FORECAST_DAYS);
        assert!((f.aqi[0] - 100.2).abs() < 1e-9);
        assert!((f.aqi[6] - 97.2).abs() < 1e-9);
        assert!(f.traffic.iter().all(|t| (*t - FALLBACK_TRAFFIC_SPEED).abs() < f64::EPSILON));

        let low = forecast(1.0);
        assert!((low.aqi[2] - 0.0).abs() < f64::EPSILON);
        assert!(low.aqi.iter().all(|v| *v >= 0.0));
    }
}
