#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Block-state aggregation.
//!
//! [`Aggregator::aggregate`] fans out to the air-quality, traffic, and
//! land-use providers for one coordinate, waits for all three to settle,
//! and merges them into a [`BlockState`](eco_blocks_block_models::BlockState).
//! It never fails outright; an unavailable provider is replaced by a
//! documented heuristic and flagged in the state's provenance.
//!
//! Label thresholds live in [`classify`].

pub mod aggregate;
pub mod classify;

pub use aggregate::{Aggregator, AggregatorConfig};
pub use classify::DensityThresholds;
