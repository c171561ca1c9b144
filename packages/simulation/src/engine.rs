//! The intervention simulation pipeline.

use std::sync::Arc;
use std::time::Duration;

use eco_blocks_ai::LlmProvider;
use eco_blocks_simulation_models::{
    Forecast, NarrativeBlock, SimulationInput, SimulationResult, WeeklySummary,
};
use thiserror::Error;

use crate::{fallback, history, narrative, physics, strategy};

/// Default budget for one generator call.
pub const DEFAULT_NARRATIVE_TIMEOUT: Duration = Duration::from_secs(8);

/// Errors that fail a simulation outright. Generator failures are never
/// reported here; they select the fallback narrative instead.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A required numeric field was missing or out of range.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong.
        message: String,
    },
}

/// A finished simulation plus the context it was computed from, for
/// persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    /// The result returned to the caller.
    pub result: SimulationResult,
    /// AQI series that was summarized (the constant series when none was
    /// supplied).
    pub aqi_history: Vec<f64>,
    /// Weekly AQI summaries sent to the generator.
    pub aqi_summary: Vec<WeeklySummary>,
    /// Weekly traffic summaries sent to the generator.
    pub traffic_summary: Vec<WeeklySummary>,
}

/// Runs strategy lookup, physics, summarization, and narrative
/// augmentation for one request.
///
/// The engine holds no per-request state and never mutates a result after
/// building it.
pub struct SimulationEngine {
    generator: Option<Arc<dyn LlmProvider>>,
    narrative_timeout: Duration,
}

impl SimulationEngine {
    /// Creates an engine. With no generator, every narrative comes from
    /// the fallback.
    #[must_use]
    pub fn new(generator: Option<Arc<dyn LlmProvider>>, narrative_timeout: Duration) -> Self {
        Self {
            generator,
            narrative_timeout,
        }
    }

    /// Whether a narrative generator is configured.
    #[must_use]
    pub const fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Simulates `input.intervention` at the block described by `input`.
    ///
    /// Unknown interventions use [`strategy::default_strategy`]. Generator
    /// failures of any kind fall back to [`fallback::narrative`] and
    /// [`fallback::forecast`] with `is_fallback_narrative` set.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidInput`] if `current_aqi` is
    /// not finite or outside `0..=`[`physics::MAX_AQI`].
    pub async fn simulate(
        &self,
        input: &SimulationInput,
    ) -> Result<SimulationOutcome, SimulationError> {
        if !input.current_aqi.is_finite()
            || input.current_aqi < 0.0
            || input.current_aqi > physics::MAX_AQI
        {
            return Err(SimulationError::InvalidInput {
                message: format!(
                    "currentAqi must be between 0 and {}, got {}",
                    physics::MAX_AQI,
                    input.current_aqi
                ),
            });
        }

        let strategy = strategy::resolve(&input.intervention);
        let impact = physics::apply(strategy, input.density, input.current_aqi);

        let aqi_history = if input.aqi_history.is_empty() {
            log::debug!(
                "No AQI history supplied, using constant series of {}",
                input.current_aqi
            );
            history::constant_series(input.current_aqi)
        } else {
            input.aqi_history.clone()
        };
        let traffic_history = if input.traffic_history.is_empty() {
            history::synthetic_traffic_series(input.traffic, input.traffic_speed)
        } else {
            input.traffic_history.clone()
        };
        let aqi_summary = history::summarize_weekly(&aqi_history);
        let traffic_summary = history::summarize_weekly(&traffic_history);

        let prompt = narrative::build_prompt(
            input,
            strategy.name,
            impact.new_aqi,
            &aqi_summary,
            &traffic_summary,
        );

        let (narrative, forecast, is_fallback_narrative) = match self.generate(&prompt).await {
            Some((narrative, forecast)) => (narrative, forecast, false),
            None => (
                fallback::narrative(strategy.name, input.density, impact.new_aqi),
                fallback::forecast(impact.new_aqi),
                true,
            ),
        };

        log::info!(
            "Simulated {} at {}: AQI {:.1} -> {:.1}, {} credits, fallback={is_fallback_narrative}",
            strategy.name,
            input.location,
            input.current_aqi,
            impact.new_aqi,
            impact.credits
        );

        Ok(SimulationOutcome {
            result: SimulationResult {
                strategy: strategy.name.to_string(),
                new_aqi: impact.new_aqi,
                reduction_amount: impact.reduction,
                credits_earned: impact.credits,
                estimated_cost: strategy.unit_cost,
                narrative,
                forecast,
                is_fallback_narrative,
            },
            aqi_history,
            aqi_summary,
            traffic_summary,
        })
    }

    /// Asks the generator for a narrative, returning `None` on any failure.
    async fn generate(&self, prompt: &str) -> Option<(NarrativeBlock, Forecast)> {
        let Some(generator) = &self.generator else {
            log::info!("Narrative generator disabled, using fallback narrative");
            return None;
        };

        let text = match tokio::time::timeout(
            self.narrative_timeout,
            generator.complete(narrative::SYSTEM_PROMPT, prompt),
        )
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                log::warn!("{} narrative request failed: {e}", generator.name());
                return None;
            }
            Err(_) => {
                log::warn!(
                    "{} narrative request timed out after {:?}",
                    generator.name(),
                    self.narrative_timeout
                );
                return None;
            }
        };

        match narrative::parse(&text) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                log::warn!("{} violated the narrative contract: {e}", generator.name());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use eco_blocks_ai::AiError;
    use eco_blocks_block_models::DensityLabel;
    use eco_blocks_simulation_models::TrendTag;

    use super::*;

    /// Generator returning a fixed reply and counting calls.
    struct Canned {
        reply: Result<String, String>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Canned {
        fn new(reply: Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(String::from).map_err(String::from),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow() -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(String::new()),
                delay: Duration::from_secs(30),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn complete(&self, _system: &str, prompt: &str) -> Result<String, AiError> {
            assert!(prompt.contains("Intervention:"));
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.reply.clone().map_err(|message| AiError::Provider { message })
        }
    }

    const GOOD_REPLY: &str = r#"```json
{
  "headline": "Green wall clears the air",
  "content": "Projected AQI falls to 100.2.",
  "techSpecs": "Moss panels.",
  "recommendation": "Add trees.",
  "aqiForecast": [100, 99, 98, 97, 96, 95, 94],
  "trafficForecast": [30, 30, 30, 30, 30, 35, 35]
}
```"#;

    fn input(intervention: &str, current_aqi: f64, density: DensityLabel) -> SimulationInput {
        SimulationInput {
            location: "block-7".to_string(),
            intervention: intervention.to_string(),
            current_aqi,
            density,
            area_type: None,
            traffic: None,
            traffic_speed: None,
            aqi_history: Vec::new(),
            traffic_history: Vec::new(),
        }
    }

    fn engine(generator: Option<Arc<dyn LlmProvider>>) -> SimulationEngine {
        SimulationEngine::new(generator, Duration::from_millis(100))
    }

    fn assert_complete_fallback(result: &SimulationResult) {
        assert!(result.is_fallback_narrative);
        assert!(!result.narrative.headline.is_empty());
        assert!(!result.narrative.content.is_empty());
        assert!(!result.narrative.tech_specs.is_empty());
        assert!(!result.narrative.recommendation.is_empty());
        assert_eq!(result.forecast.aqi.len(), 7);
        assert_eq!(result.forecast.traffic.len(), 7);
    }

    #[tokio::test]
    async fn green_wall_on_medium_block() {
        let outcome = engine(None)
            .simulate(&input("Green Wall", 120.0, DensityLabel::Medium))
            .await
            .unwrap();
        let result = &outcome.result;
        assert!((result.reduction_amount - 19.8).abs() < 1e-9);
        assert!((result.new_aqi - 100.2).abs() < 1e-9);
        assert_eq!(result.credits_earned, 198);
        assert_eq!(result.estimated_cost, 12_000);
        assert_eq!(result.strategy, "Green Wall");
        assert_complete_fallback(result);
    }

    #[tokio::test]
    async fn unknown_intervention_uses_default_strategy() {
        let outcome = engine(None)
            .simulate(&input("Unknown Tech", 100.0, DensityLabel::Low))
            .await
            .unwrap();
        assert_eq!(outcome.result.strategy, "Biochar");
        assert_eq!(outcome.result.estimated_cost, 8_000);
        assert!((outcome.result.reduction_amount - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn supplied_history_is_summarized() {
        let mut request = input("Algae Panel", 80.0, DensityLabel::High);
        request.aqi_history = vec![50.0, 50.0, 50.0, 50.0, 50.0, 50.0, 50.0, 80.0, 80.0, 80.0];

        let outcome = engine(None).simulate(&request).await.unwrap();
        assert_eq!(outcome.aqi_summary.len(), 2);
        assert!((outcome.aqi_summary[0].average_value - 50.0).abs() < f64::EPSILON);
        assert_eq!(outcome.aqi_summary[0].trend_tag, TrendTag::Past);
        assert!((outcome.aqi_summary[1].average_value - 80.0).abs() < f64::EPSILON);
        assert_eq!(outcome.aqi_summary[1].trend_tag, TrendTag::Current);
        assert_eq!(outcome.aqi_history, request.aqi_history);
    }

    #[tokio::test]
    async fn missing_history_becomes_constant_series() {
        let outcome = engine(None)
            .simulate(&input("Biochar", 64.0, DensityLabel::Sparse))
            .await
            .unwrap();
        assert_eq!(outcome.aqi_history.len(), history::SERIES_DAYS);
        assert_eq!(outcome.aqi_summary.len(), 4);
        assert!(outcome
            .aqi_summary
            .iter()
            .all(|s| (s.average_value - 64.0).abs() < f64::EPSILON));
        assert_eq!(outcome.traffic_summary.len(), 4);
    }

    #[tokio::test]
    async fn valid_generator_reply_is_used() {
        let generator = Canned::new(Ok(GOOD_REPLY));
        let outcome = engine(Some(generator.clone()))
            .simulate(&input("Green Wall", 120.0, DensityLabel::Medium))
            .await
            .unwrap();
        assert!(!outcome.result.is_fallback_narrative);
        assert_eq!(outcome.result.narrative.headline, "Green wall clears the air");
        assert!((outcome.result.forecast.aqi[6] - 94.0).abs() < f64::EPSILON);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_generator_falls_back() {
        let generator = Canned::new(Err("connection refused"));
        let outcome = engine(Some(generator))
            .simulate(&input("Green Wall", 120.0, DensityLabel::Medium))
            .await
            .unwrap();
        assert_complete_fallback(&outcome.result);
        assert!((outcome.result.new_aqi - 100.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn malformed_generator_reply_falls_back() {
        let generator = Canned::new(Ok(r#"{"headline": "Only a headline"}"#));
        let outcome = engine(Some(generator))
            .simulate(&input("Direct Air Capture", 150.0, DensityLabel::High))
            .await
            .unwrap();
        assert_complete_fallback(&outcome.result);
        assert!(outcome.result.narrative.tech_specs.contains("capture"));
    }

    #[tokio::test]
    async fn slow_generator_falls_back() {
        let outcome = engine(Some(Canned::slow()))
            .simulate(&input("Green Wall", 120.0, DensityLabel::Medium))
            .await
            .unwrap();
        assert_complete_fallback(&outcome.result);
    }

    #[tokio::test]
    async fn negative_aqi_is_invalid() {
        let result = engine(None)
            .simulate(&input("Green Wall", -1.0, DensityLabel::Medium))
            .await;
        assert!(matches!(result, Err(SimulationError::InvalidInput { .. })));

        let result = engine(None)
            .simulate(&input("Green Wall", f64::NAN, DensityLabel::Medium))
            .await;
        assert!(matches!(result, Err(SimulationError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn aqi_above_ceiling_is_invalid() {
        let result = engine(None)
            .simulate(&input("Direct Air Capture", 1e10, DensityLabel::High))
            .await;
        assert!(matches!(result, Err(SimulationError::InvalidInput { .. })));

        let outcome = engine(None)
            .simulate(&input(
                "Direct Air Capture",
                physics::MAX_AQI,
                DensityLabel::High,
            ))
            .await
            .unwrap();
        assert_eq!(outcome.result.credits_earned, 54_000);
    }
}
