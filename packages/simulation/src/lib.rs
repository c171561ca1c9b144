#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Intervention simulation for a single block.
//!
//! [`engine::SimulationEngine::simulate`] runs a linear pipeline:
//!
//! 1. resolve the intervention in the [`strategy`] table (unknown names
//!    get the cheapest strategy)
//! 2. compute the deterministic [`physics`] impact
//! 3. summarize AQI and traffic [`history`] into weekly means
//! 4. ask the narrative generator for a [`narrative`] and forecast, or
//!    use the [`fallback`] when it is disabled, fails, or breaks the
//!    contract
//!
//! Only a non-finite or negative AQI fails the request.

pub mod engine;
pub mod fallback;
pub mod history;
pub mod narrative;
pub mod physics;
pub mod strategy;

pub use engine::{SimulationEngine, SimulationError, SimulationOutcome};
