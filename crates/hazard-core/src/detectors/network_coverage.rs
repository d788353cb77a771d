//! Network coverage sampling along a route.
//!
//! No live signal-strength source is integrated. [`SimulatedCoverage`] draws
//! from a weighted distribution (80% of samples in the normal 2-4 band, 20%
//! in the remote 0-1 band) and is the default model until a real provider
//! implements [`CoverageModel`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::detectors::RouteContext;
use crate::models::{CommunicationRisk, NetworkCoverage, Waypoint};
use crate::rules::{stride_indices, HazardRules};

/// Source of signal-strength readings for a waypoint.
pub trait CoverageModel: Send + Sync {
    /// Signal bars at `waypoint`, 0 (none) to 4 (full).
    fn signal_strength(&self, waypoint: &Waypoint) -> u8;

    fn sample(&self, index: usize, waypoint: &Waypoint, ctx: &RouteContext) -> NetworkCoverage {
        coverage_record(index, waypoint, ctx, self.signal_strength(waypoint))
    }
}

pub fn communication_risk(signal_strength: u8) -> CommunicationRisk {
    match signal_strength {
        0 | 1 => CommunicationRisk::High,
        2 => CommunicationRisk::Medium,
        _ => CommunicationRisk::Low,
    }
}

pub fn coverage_risk_score(signal_strength: u8) -> u8 {
    match signal_strength {
        0 => 9,
        1 => 7,
        2 => 4,
        3 => 2,
        _ => 1,
    }
}

pub fn coverage_record(
    index: usize,
    waypoint: &Waypoint,
    ctx: &RouteContext,
    signal_strength: u8,
) -> NetworkCoverage {
    let signal_strength = signal_strength.min(4);
    NetworkCoverage {
        meta: ctx.meta(index, waypoint, coverage_risk_score(signal_strength)),
        signal_strength,
        is_dead_zone: signal_strength == 0,
        communication_risk: communication_risk(signal_strength),
    }
}

/// Sample coverage at stride `max(1, n / coverage_sample_target)`.
pub fn sample_network_coverage(
    waypoints: &[Waypoint],
    ctx: &RouteContext,
    rules: &HazardRules,
    model: &dyn CoverageModel,
) -> Vec<NetworkCoverage> {
    stride_indices(waypoints.len(), rules.coverage_sample_target)
        .map(|idx| model.sample(idx, &waypoints[idx], ctx))
        .collect()
}

/// Weighted random coverage model.
pub struct SimulatedCoverage {
    rng: Mutex<StdRng>,
    remote_probability: f64,
}

impl SimulatedCoverage {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_rng(&mut rand::rng()))
    }

    /// Reproducible draws, for replays and tests.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            remote_probability: 0.2,
        }
    }
}

impl Default for SimulatedCoverage {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverageModel for SimulatedCoverage {
    fn signal_strength(&self, _waypoint: &Waypoint) -> u8 {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if rng.random_bool(self.remote_probability) {
            rng.random_range(0..=1)
        } else {
            rng.random_range(2..=4)
        }
    }
}

/// Constant reading everywhere.
#[derive(Debug, Clone, Copy)]
pub struct FixedCoverage(pub u8);

impl CoverageModel for FixedCoverage {
    fn signal_strength(&self, _waypoint: &Waypoint) -> u8 {
        self.0
    }
}
