//! Traffic distribution simulation
//!
//! Drives a selector with randomly generated flows and reports how the
//! flows spread across backends next to the share each backend's weight
//! asks for. Used by `flowpick simulate` to sanity-check a configuration.

use crate::flow::{FlowHasher, FlowKey};
use crate::selector::WeightedSelector;
use ahash::AHashMap;
use rand::Rng;
use serde::Serialize;
use std::net::{Ipv4Addr, SocketAddr};

const CLIENT_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);
const SERVICE_ADDR: Ipv4Addr = Ipv4Addr::new(10, 10, 0, 1);

/// Result of a simulation run
#[derive(Debug, Clone, Serialize)]
pub struct DistributionReport {
    pub flows: u64,
    /// Flows that found no eligible backend
    pub unassigned: u64,
    /// One entry per distinct backend name, in block order
    pub backends: Vec<BackendShare>,
}

/// Observed vs expected share for one backend name
#[derive(Debug, Clone, Serialize)]
pub struct BackendShare {
    pub name: String,
    /// Sum of weights of all enabled entries with this name
    pub weight: u64,
    pub count: u64,
    pub observed_percent: f64,
    pub expected_percent: f64,
}

impl DistributionReport {
    pub fn share(&self, name: &str) -> Option<&BackendShare> {
        self.backends.iter().find(|b| b.name == name)
    }

    /// Largest absolute gap between observed and expected percentage
    pub fn max_deviation_percent(&self) -> f64 {
        self.backends
            .iter()
            .map(|b| (b.observed_percent - b.expected_percent).abs())
            .fold(0.0, f64::max)
    }
}

/// Random flow between a fixed client and service address
///
/// Ports are drawn from `1..65535`, so dispersion comes from the hasher,
/// not from the addresses.
pub fn random_flow<R: Rng + ?Sized>(rng: &mut R) -> FlowKey {
    FlowKey::tcp(
        SocketAddr::from((CLIENT_ADDR, rng.random_range(1..65535))),
        SocketAddr::from((SERVICE_ADDR, rng.random_range(1..65535))),
    )
}

/// Map `flows` random flows through `selector` and tally the results
pub fn simulate<R: Rng + ?Sized>(
    selector: &WeightedSelector,
    hasher: &dyn FlowHasher,
    flows: u64,
    rng: &mut R,
) -> DistributionReport {
    let mut index: AHashMap<&str, usize> = AHashMap::new();
    let mut backends: Vec<BackendShare> = Vec::new();

    for block in selector.blocks() {
        let name = block.backend.name();
        let slot = *index.entry(name).or_insert_with(|| {
            backends.push(BackendShare {
                name: name.to_string(),
                weight: 0,
                count: 0,
                observed_percent: 0.0,
                expected_percent: 0.0,
            });
            backends.len() - 1
        });
        backends[slot].weight += block.len() as u64;
    }

    let mut unassigned = 0;
    for _ in 0..flows {
        let flow = random_flow(rng);
        match selector.select(hasher.hash_flow(&flow)) {
            Some(backend) => {
                if let Some(&slot) = index.get(backend.name()) {
                    backends[slot].count += 1;
                }
            }
            None => unassigned += 1,
        }
    }

    let total_weight = selector.total_weight();
    for share in &mut backends {
        share.expected_percent = percent(share.weight, total_weight);
        share.observed_percent = percent(share.count, flows);
    }

    tracing::debug!(
        flows,
        unassigned,
        backends = backends.len(),
        "Simulation complete"
    );

    DistributionReport {
        flows,
        unassigned,
        backends,
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
