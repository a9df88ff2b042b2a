//! A number of methods to generate random instances for testing.

use crate::instance::{
    FleetRecord, HorizonRecord, InstanceFile, PassengerRecord, TravelTimeRecord,
};
use rand::{seq::SliceRandom, Rng};
use std::collections::{BTreeMap, BTreeSet};

/// Shape of a generated instance
#[derive(Debug, Clone, Copy)]
pub struct GeneratorParams {
    /// Number of vertiports, at least 2
    pub vertiports: usize,

    /// Upper bound of gates per vertiport, at least 1
    pub max_gates: i64,

    /// Seats per aircraft
    pub seats: i64,

    /// Number of instants
    pub horizon_len: i64,

    /// Longest leg duration
    pub max_duration: i64,

    /// Number of passenger requests
    pub passengers: usize,

    /// Chance of adding a leg besides the ring `V0 -> V1 -> ... -> V0`
    pub extra_leg_probability: f64,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            vertiports: 3,
            max_gates: 3,
            seats: 4,
            horizon_len: 8,
            max_duration: 2,
            passengers: 5,
            extra_leg_probability: 0.3,
        }
    }
}

/// Generate a random instance with the thread rng.
pub fn generate_instance(params: &GeneratorParams) -> InstanceFile {
    generate_instance_with(&mut rand::thread_rng(), params)
}

/// Generate a random instance that passes validation.
///
/// Every vertiport gets at least one gate and the fleet never exceeds the
///  total gate count. Legs always include a ring through all vertiports so
///  each one can be reached. Desired times are whole instants on the grid.
///
/// # Arguments
/// * `rng` - The random number generator.
/// * `params` - Shape of the instance; too small values are raised to the
///   nearest usable one.
pub fn generate_instance_with<R: Rng + ?Sized>(
    rng: &mut R,
    params: &GeneratorParams,
) -> InstanceFile {
    let vertiport_count = params.vertiports.max(2);
    let vertiports = (0..vertiport_count)
        .map(|i| format!("V{}", i))
        .collect::<Vec<String>>();

    let gates = vertiports
        .iter()
        .map(|id| (id.clone(), rng.gen_range(1..=params.max_gates.max(1))))
        .collect::<BTreeMap<String, i64>>();
    let total_gates: i64 = gates.values().sum();

    let horizon_len = params.horizon_len.max(1);
    let start = rng.gen_range(0..=100);
    let max_duration = params.max_duration.max(1);

    let mut legs = BTreeSet::new();
    for i in 0..vertiport_count {
        legs.insert((i, (i + 1) % vertiport_count));
    }
    for i in 0..vertiport_count {
        for j in 0..vertiport_count {
            if i != j && rng.gen_bool(params.extra_leg_probability.clamp(0.0, 1.0)) {
                legs.insert((i, j));
            }
        }
    }

    let travel_times = legs
        .iter()
        .map(|&(i, j)| TravelTimeRecord {
            origin: vertiports[i].clone(),
            destination: vertiports[j].clone(),
            duration: rng.gen_range(1..=max_duration),
        })
        .collect::<Vec<TravelTimeRecord>>();

    let passengers = (0..params.passengers)
        .map(|n| {
            let mut pair = vertiports
                .choose_multiple(rng, 2)
                .cloned()
                .collect::<Vec<String>>();
            let destination = pair.pop().unwrap_or_default();
            let origin = pair.pop().unwrap_or_default();
            PassengerRecord {
                id: format!("P{}", n),
                origin,
                destination,
                desired_time: (start + rng.gen_range(0..horizon_len)) as f64,
            }
        })
        .collect::<Vec<PassengerRecord>>();

    InstanceFile {
        vertiports,
        gates,
        fleet: FleetRecord {
            aircraft: rng.gen_range(1..=total_gates),
            seats: params.seats.max(1),
        },
        horizon: HorizonRecord {
            start,
            end: start + horizon_len,
        },
        travel_times,
        charging_time: rng.gen_range(0..=1),
        passengers,
    }
}
