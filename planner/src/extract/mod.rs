//! Reads a solver assignment back into domain terms: who is served and
//!  which aircraft flies which leg when.

#[macro_use]
pub mod macros;

use crate::instance::InstanceData;
use crate::model::{OptimizationModel, PresenceKey};
use crate::solver::{SolutionStatus, SolveOutcome};
use serde::Serialize;

/// Binary values above this count as selected
pub const SELECTION_THRESHOLD: f64 = 0.5;

/// One departure of one aircraft
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledFlight {
    /// Departure vertiport id
    pub origin: String,

    /// Arrival vertiport id
    pub destination: String,

    /// Departure instant
    pub departure_time: i64,

    /// Aircraft index
    pub aircraft_id: usize,
}

/// Number of aircraft a vertiport starts the horizon with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FleetPlacement {
    /// Vertiport id
    pub vertiport_id: String,

    /// Aircraft parked there at the first instant
    pub aircraft: u32,
}

/// Domain view of a solve outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    /// Solver status
    pub status: SolutionStatus,

    /// Objective value, when an assignment was read
    pub objective_value: Option<f64>,

    /// Ids of served passengers, in request order
    pub served_passengers: Vec<String>,

    /// Selected flights ordered by departure time, origin, destination
    ///  and aircraft
    pub flights: Vec<ScheduledFlight>,

    /// Initial fleet distribution
    pub initial_fleet: Vec<FleetPlacement>,
}

impl Extraction {
    /// Number of served passengers
    pub fn served_count(&self) -> usize {
        self.served_passengers.len()
    }

    /// Whether passenger and flight results are present
    pub fn has_solution(&self) -> bool {
        self.objective_value.is_some()
    }
}

/// Read the outcome of solving `model`, built from `instance`.
///
/// Statuses other than `Optimal` and `TimeLimitReached` with an incumbent
///  produce an empty extraction.
pub fn extract(
    instance: &InstanceData,
    model: &OptimizationModel,
    outcome: &SolveOutcome,
) -> Extraction {
    let Some(assignment) = outcome.usable_assignment() else {
        extract_info!(
            "(extract) No solution to read, status: {}.",
            outcome.status
        );
        return Extraction {
            status: outcome.status,
            objective_value: None,
            served_passengers: vec![],
            flights: vec![],
            initial_fleet: vec![],
        };
    };

    let vars = model.vars();
    let passengers = instance.passengers();
    let served_passengers = vars
        .passengers()
        .filter(|(_, var)| assignment.value(**var) > SELECTION_THRESHOLD)
        .map(|(key, _)| passengers[key.passenger].id.clone())
        .collect::<Vec<String>>();

    let vertiports = instance.vertiports();
    let horizon = instance.horizon();
    let flights = vars
        .flights()
        .filter(|(_, var)| assignment.value(**var) > SELECTION_THRESHOLD)
        .map(|(key, _)| ScheduledFlight {
            origin: vertiports[key.origin].id.clone(),
            destination: vertiports[key.destination].id.clone(),
            departure_time: horizon.instant(key.time),
            aircraft_id: key.aircraft,
        })
        .collect::<Vec<ScheduledFlight>>();

    let initial_fleet = vertiports
        .iter()
        .enumerate()
        .filter_map(|(vertiport, port)| {
            let var = vars.presence(&PresenceKey { vertiport, time: 0 })?;
            Some(FleetPlacement {
                vertiport_id: port.id.clone(),
                aircraft: assignment.value(var).round().max(0.0) as u32,
            })
        })
        .collect::<Vec<FleetPlacement>>();

    let objective_value = model.objective().expr.evaluate(assignment);
    extract_debug!(
        "(extract) Objective {}, {} passengers served, {} flights.",
        objective_value,
        served_passengers.len(),
        flights.len()
    );

    Extraction {
        status: outcome.status,
        objective_value: Some(objective_value),
        served_passengers,
        flights,
        initial_fleet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{HorizonRecord, InstanceData};
    use crate::model::{build_model, Assignment, FlightKey, ModelOptions, PassengerKey};
    use crate::test_util::*;

    fn model_with_passengers() -> (InstanceData, OptimizationModel) {
        let mut file = two_vertiport_file();
        file.horizon = HorizonRecord { start: 100, end: 104 };
        file.passengers.push(passenger("P1", "V1", "V2", 101.0));
        file.passengers.push(passenger("P2", "V1", "V2", 103.0));
        let instance = InstanceData::try_from(file).unwrap();
        let model = build_model(&instance, &ModelOptions::default()).unwrap();
        (instance, model)
    }

    fn flight_var(model: &OptimizationModel, time: usize) -> usize {
        model
            .vars()
            .flight(&FlightKey {
                time,
                origin: 0,
                destination: 1,
                aircraft: 0,
            })
            .unwrap()
            .index()
    }

    #[test]
    fn ut_extract_reads_selected_values() {
        let (instance, model) = model_with_passengers();
        let mut values = vec![0.0; model.variables().len()];
        values[flight_var(&model, 3)] = 0.9999;
        values[flight_var(&model, 1)] = 1.0;
        let z = model.vars().passenger(&PassengerKey { passenger: 1 }).unwrap();
        values[z.index()] = 1.0;
        let y = model
            .vars()
            .presence(&PresenceKey {
                vertiport: 0,
                time: 0,
            })
            .unwrap();
        values[y.index()] = 1.0;

        let outcome = SolveOutcome::optimal(Assignment::new(values));
        let extraction = extract(&instance, &model, &outcome);

        assert_eq!(extraction.status, SolutionStatus::Optimal);
        assert_eq!(extraction.objective_value, Some(1.0));
        assert_eq!(extraction.served_passengers, vec!["P2".to_string()]);
        assert_eq!(extraction.served_count(), 1);
        assert_eq!(
            extraction.flights,
            vec![
                ScheduledFlight {
                    origin: "V1".to_string(),
                    destination: "V2".to_string(),
                    departure_time: 101,
                    aircraft_id: 0,
                },
                ScheduledFlight {
                    origin: "V1".to_string(),
                    destination: "V2".to_string(),
                    departure_time: 103,
                    aircraft_id: 0,
                },
            ]
        );
        assert_eq!(
            extraction.initial_fleet,
            vec![
                FleetPlacement {
                    vertiport_id: "V1".to_string(),
                    aircraft: 1
                },
                FleetPlacement {
                    vertiport_id: "V2".to_string(),
                    aircraft: 0
                },
            ]
        );
    }

    #[test]
    fn ut_extract_threshold_is_strict() {
        let (instance, model) = model_with_passengers();
        let mut values = vec![0.0; model.variables().len()];
        values[flight_var(&model, 2)] = 0.5;

        let outcome = SolveOutcome::optimal(Assignment::new(values));
        let extraction = extract(&instance, &model, &outcome);
        assert!(extraction.flights.is_empty());
    }

    #[test]
    fn ut_extract_without_solution() {
        let (instance, model) = model_with_passengers();
        for status in [
            SolutionStatus::Infeasible,
            SolutionStatus::Unbounded,
            SolutionStatus::SolverFailure,
            SolutionStatus::TimeLimitReached,
        ] {
            let outcome = SolveOutcome::without_assignment(status, None);
            let extraction = extract(&instance, &model, &outcome);
            assert_eq!(extraction.status, status);
            assert!(!extraction.has_solution());
            assert!(extraction.served_passengers.is_empty());
            assert!(extraction.flights.is_empty());
            assert!(extraction.initial_fleet.is_empty());
        }
    }

    #[test]
    fn ut_extract_ignores_assignment_on_failure() {
        let (instance, model) = model_with_passengers();
        let values = vec![1.0; model.variables().len()];
        let outcome = SolveOutcome {
            status: SolutionStatus::SolverFailure,
            assignment: Some(Assignment::new(values)),
            message: Some("numerical trouble".to_string()),
            worker: None,
        };

        let extraction = extract(&instance, &model, &outcome);
        assert!(extraction.flights.is_empty());
        assert!(extraction.served_passengers.is_empty());
    }

    #[test]
    fn ut_extract_time_limit_incumbent() {
        let (instance, model) = model_with_passengers();
        let mut values = vec![0.0; model.variables().len()];
        let z = model.vars().passenger(&PassengerKey { passenger: 0 }).unwrap();
        values[z.index()] = 1.0;

        let outcome = SolveOutcome {
            status: SolutionStatus::TimeLimitReached,
            assignment: Some(Assignment::new(values)),
            message: None,
            worker: None,
        };

        let extraction = extract(&instance, &model, &outcome);
        assert_eq!(extraction.status, SolutionStatus::TimeLimitReached);
        assert_eq!(extraction.served_passengers, vec!["P1".to_string()]);
    }
}
