//! Formulates the air-taxi scheduling model from a validated instance.
//!
//! Variables:
//! - `x[i,j,k,t]` binary, aircraft `k` departs `i` for `j` at `t`
//! - `y[i,t]` integer in `[0, gates(i)]`, aircraft present at `i` at `t`
//! - `p[i,k,t]` binary, aircraft `k` present at `i` at `t`
//! - `z[s]` binary, passenger `s` is served
//!
//! The objective maximizes `Σ z[s]`.

use super::{
    AircraftPresenceKey, ConstraintFamily, FlightKey, LinearExpr, Objective,
    OptimizationModel, PassengerKey, PresenceKey, Sense, VarDomain, VarId,
};
use crate::instance::{InputValidationError, InstanceData};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Default half-width of the passenger service window
pub const DEFAULT_TIME_TOLERANCE: f64 = 0.5;

/// Most variables a single model may declare
pub const MAX_MODEL_VARIABLES: usize = 50_000_000;

/// How a leg without a travel time entry is treated
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum MissingLegPolicy {
    /// The leg can't be flown
    #[default]
    Unreachable,

    /// The leg is flown instantly
    ZeroDuration,
}

impl Display for MissingLegPolicy {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            MissingLegPolicy::Unreachable => write!(f, "unreachable"),
            MissingLegPolicy::ZeroDuration => write!(f, "zero_duration"),
        }
    }
}

impl FromStr for MissingLegPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unreachable" => Ok(MissingLegPolicy::Unreachable),
            "zero_duration" => Ok(MissingLegPolicy::ZeroDuration),
            other => Err(format!("Unknown missing leg policy [{}].", other)),
        }
    }
}

/// Formulation switches
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ModelOptions {
    /// Half-width of the window around a passenger's desired instant in
    ///  which a departure serves them
    pub time_tolerance: f64,

    /// Treatment of legs absent from the travel time table
    pub missing_leg_policy: MissingLegPolicy,

    /// Require aircraft to be present for departures on the last instant
    pub close_horizon: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            time_tolerance: DEFAULT_TIME_TOLERANCE,
            missing_leg_policy: MissingLegPolicy::default(),
            close_horizon: true,
        }
    }
}

/// Dense row-major table of variable handles
#[derive(Debug)]
struct VarGrid<const N: usize> {
    dims: [usize; N],
    vars: Vec<VarId>,
}

impl<const N: usize> VarGrid<N> {
    fn new(dims: [usize; N], len: usize) -> Self {
        Self {
            dims,
            vars: Vec::with_capacity(len),
        }
    }

    fn at(&self, index: [usize; N]) -> VarId {
        let position = index
            .iter()
            .zip(self.dims.iter())
            .fold(0, |acc, (i, dim)| acc * dim + i);
        self.vars[position]
    }
}

/// Owns an [`OptimizationModel`] while it's under construction.
///
/// Variables are declared by [`ModelBuilder::new`]; [`ModelBuilder::build`]
///  adds every constraint family and the objective and hands the model over.
#[derive(Debug)]
pub struct ModelBuilder<'a> {
    instance: &'a InstanceData,
    options: ModelOptions,
    model: OptimizationModel,
    x: VarGrid<4>,
    y: VarGrid<2>,
    p: VarGrid<3>,
    z: Vec<VarId>,
}

/// Sizes of the `x`, `y` and `p` grids, `None` when the model would
///  exceed [`MAX_MODEL_VARIABLES`]
fn grid_sizes(
    vertiports: usize,
    aircraft: usize,
    times: usize,
    passengers: usize,
) -> Option<(usize, usize, usize)> {
    let y = vertiports.checked_mul(times)?;
    let p = y.checked_mul(aircraft)?;
    let x = p.checked_mul(vertiports)?;
    let total = x.checked_add(y)?.checked_add(p)?.checked_add(passengers)?;
    (total <= MAX_MODEL_VARIABLES).then_some((x, y, p))
}

/// Build the model of an instance in one call
pub fn build_model(
    instance: &InstanceData,
    options: &ModelOptions,
) -> Result<OptimizationModel, InputValidationError> {
    Ok(ModelBuilder::new(instance, *options)?.build())
}

impl<'a> ModelBuilder<'a> {
    /// Check the options and declare every variable
    pub fn new(
        instance: &'a InstanceData,
        options: ModelOptions,
    ) -> Result<Self, InputValidationError> {
        if !options.time_tolerance.is_finite() || options.time_tolerance < 0.0 {
            model_error!(
                "(new) Invalid time tolerance: {}.",
                options.time_tolerance
            );
            return Err(InputValidationError::InvalidTimeTolerance(
                options.time_tolerance,
            ));
        }

        let vertiports = instance.vertiports().len();
        let aircraft = instance.fleet().aircraft as usize;
        let times = instance.horizon().len();
        let passengers = instance.passengers().len();

        let Some((x_len, y_len, p_len)) = grid_sizes(vertiports, aircraft, times, passengers)
        else {
            model_error!(
                "(new) Model for {} vertiports, {} aircraft and {} instants exceeds {} variables.",
                vertiports,
                aircraft,
                times,
                MAX_MODEL_VARIABLES
            );
            return Err(InputValidationError::ModelTooLarge {
                limit: MAX_MODEL_VARIABLES,
            });
        };

        let mut builder = Self {
            instance,
            options,
            model: OptimizationModel::new("air_taxi_optimization"),
            x: VarGrid::new([vertiports, vertiports, aircraft, times], x_len),
            y: VarGrid::new([vertiports, times], y_len),
            p: VarGrid::new([vertiports, aircraft, times], p_len),
            z: Vec::with_capacity(passengers),
        };

        builder.declare_variables();
        Ok(builder)
    }

    fn declare_variables(&mut self) {
        let vertiports = self.instance.vertiports();
        let aircraft = self.instance.fleet().aircraft as usize;
        let times = self.instance.horizon().len();

        for (origin, from) in vertiports.iter().enumerate() {
            for (destination, to) in vertiports.iter().enumerate() {
                for k in 0..aircraft {
                    for t in 0..times {
                        let var = self.model.add_variable(
                            format!("x[{},{},{},{}]", from.id, to.id, k, t),
                            VarDomain::Binary,
                        );
                        self.x.vars.push(var);
                        self.model.vars.flights.insert(
                            FlightKey {
                                time: t,
                                origin,
                                destination,
                                aircraft: k,
                            },
                            var,
                        );
                    }
                }
            }
        }

        for (vertiport, port) in vertiports.iter().enumerate() {
            for t in 0..times {
                let var = self.model.add_variable(
                    format!("y[{},{}]", port.id, t),
                    VarDomain::Integer {
                        lower: 0,
                        upper: port.gates as i64,
                    },
                );
                self.y.vars.push(var);
                self.model
                    .vars
                    .presence
                    .insert(PresenceKey { vertiport, time: t }, var);
            }
        }

        for (vertiport, port) in vertiports.iter().enumerate() {
            for k in 0..aircraft {
                for t in 0..times {
                    let var = self
                        .model
                        .add_variable(format!("p[{},{},{}]", port.id, k, t), VarDomain::Binary);
                    self.p.vars.push(var);
                    self.model.vars.aircraft_presence.insert(
                        AircraftPresenceKey {
                            vertiport,
                            aircraft: k,
                            time: t,
                        },
                        var,
                    );
                }
            }
        }

        for (passenger, request) in self.instance.passengers().iter().enumerate() {
            let var = self
                .model
                .add_variable(format!("z[{}]", request.id), VarDomain::Binary);
            self.z.push(var);
            self.model
                .vars
                .passengers
                .insert(PassengerKey { passenger }, var);
        }
    }

    /// Add every constraint family and the objective, then release the model
    pub fn build(mut self) -> OptimizationModel {
        self.add_gate_capacity();
        self.add_flow_conservation();
        if self.options.close_horizon {
            self.add_horizon_closure();
        }
        self.add_fleet_size();
        self.add_seat_capacity();
        self.add_service_window();
        self.add_turnaround();
        self.add_aircraft_presence();
        self.add_no_self_loop();
        if self.options.missing_leg_policy == MissingLegPolicy::Unreachable {
            self.add_unreachable_legs();
        }

        self.model.objective = Objective {
            expr: LinearExpr::sum(self.z.iter().copied()),
        };

        model_info!(
            "(build) Built model [{}] with {} variables and {} constraints.",
            self.model.name(),
            self.model.variables().len(),
            self.model.constraints().len()
        );
        model_debug!("(build) Model stats: {:?}", self.model.stats());

        self.model
    }

    /// Duration of the leg `origin -> destination`, `None` when it can't be flown
    fn leg(&self, origin: usize, destination: usize) -> Option<usize> {
        if origin == destination {
            return None;
        }

        match self.instance.travel_time(origin, destination) {
            Some(duration) => Some(duration as usize),
            None => match self.options.missing_leg_policy {
                MissingLegPolicy::Unreachable => None,
                MissingLegPolicy::ZeroDuration => Some(0),
            },
        }
    }

    fn aircraft(&self, only: Option<usize>) -> std::ops::Range<usize> {
        match only {
            Some(k) => k..k + 1,
            None => 0..self.instance.fleet().aircraft as usize,
        }
    }

    /// `x[j,i,k,t - travel(j,i)]` for every other vertiport `j` with
    ///  `t - travel(j,i) >= 0`
    fn arrivals(&self, vertiport: usize, t: usize, only: Option<usize>) -> Vec<VarId> {
        let mut vars = vec![];
        for origin in 0..self.instance.vertiports().len() {
            let Some(duration) = self.leg(origin, vertiport) else {
                continue;
            };

            let Some(departure) = t.checked_sub(duration) else {
                continue;
            };

            for k in self.aircraft(only) {
                vars.push(self.x.at([origin, vertiport, k, departure]));
            }
        }
        vars
    }

    /// `x[i,j,k,t]` for every other vertiport `j`
    fn departures(&self, vertiport: usize, t: usize, only: Option<usize>) -> Vec<VarId> {
        let mut vars = vec![];
        for destination in 0..self.instance.vertiports().len() {
            if destination == vertiport {
                continue;
            }

            for k in self.aircraft(only) {
                vars.push(self.x.at([vertiport, destination, k, t]));
            }
        }
        vars
    }

    fn add_gate_capacity(&mut self) {
        let times = self.instance.horizon().len();
        for (i, port) in self.instance.vertiports().iter().enumerate() {
            for t in 0..times {
                self.model.add_constraint(
                    ConstraintFamily::GateCapacity,
                    format!("gates[{},t={}]", port.id, t),
                    LinearExpr::sum([self.y.at([i, t])]),
                    Sense::LessEq,
                    port.gates as f64,
                );
            }
        }
    }

    /// `y[i,t+1] - y[i,t] - arrivals(i,t) + departures(i,t) = 0`
    fn add_flow_conservation(&mut self) {
        let times = self.instance.horizon().len();
        for (i, port) in self.instance.vertiports().iter().enumerate() {
            for t in 0..times.saturating_sub(1) {
                let mut expr = LinearExpr::new()
                    .with_term(self.y.at([i, t + 1]), 1.0)
                    .with_term(self.y.at([i, t]), -1.0);
                expr.add_terms(self.arrivals(i, t, None), -1.0);
                expr.add_terms(self.departures(i, t, None), 1.0);

                self.model.add_constraint(
                    ConstraintFamily::FlowConservation,
                    format!("flow[{},t={}]", port.id, t),
                    expr,
                    Sense::Equal,
                    0.0,
                );
            }
        }
    }

    /// `departures(i,T) - y[i,T] - arrivals(i,T) <= 0` on the last instant `T`,
    ///  which no flow equation covers
    fn add_horizon_closure(&mut self) {
        let last = self.instance.horizon().len() - 1;
        for (i, port) in self.instance.vertiports().iter().enumerate() {
            let mut expr = LinearExpr::sum(self.departures(i, last, None));
            expr.add_term(self.y.at([i, last]), -1.0);
            expr.add_terms(self.arrivals(i, last, None), -1.0);

            self.model.add_constraint(
                ConstraintFamily::HorizonClosure,
                format!("closure[{},t={}]", port.id, last),
                expr,
                Sense::LessEq,
                0.0,
            );
        }
    }

    /// `Σ_i y[i,0] = A`
    fn add_fleet_size(&mut self) {
        let expr = LinearExpr::sum(
            (0..self.instance.vertiports().len()).map(|i| self.y.at([i, 0])),
        );

        self.model.add_constraint(
            ConstraintFamily::FleetSize,
            String::from("fleet"),
            expr,
            Sense::Equal,
            self.instance.fleet().aircraft as f64,
        );
    }

    /// At most S passengers whose request matches (origin, destination,
    ///  instant) exactly
    fn add_seat_capacity(&mut self) {
        let horizon = self.instance.horizon();
        let mut groups: BTreeMap<(usize, usize, usize), Vec<VarId>> = BTreeMap::new();
        for (s, request) in self.instance.passengers().iter().enumerate() {
            let Some(t) = horizon.index_of(request.desired_time) else {
                continue;
            };

            groups
                .entry((request.origin, request.destination, t))
                .or_default()
                .push(self.z[s]);
        }

        let seats = self.instance.fleet().seats as f64;
        let vertiports = self.instance.vertiports();
        for ((origin, destination, t), passengers) in groups {
            self.model.add_constraint(
                ConstraintFamily::SeatCapacity,
                format!(
                    "seats[{},{},t={}]",
                    vertiports[origin].id, vertiports[destination].id, t
                ),
                LinearExpr::sum(passengers),
                Sense::LessEq,
                seats,
            );
        }
    }

    /// `z[s] - Σ_k Σ_{|t - desired| <= tol} x[o,d,k,t] <= 0`
    fn add_service_window(&mut self) {
        let horizon = self.instance.horizon();
        for (s, request) in self.instance.passengers().iter().enumerate() {
            let mut expr = LinearExpr::sum([self.z[s]]);
            let window = horizon
                .indices_within(request.desired_time, self.options.time_tolerance)
                .collect::<Vec<usize>>();

            if window.is_empty() {
                model_warn!(
                    "(add_service_window) Passenger [{}] wants to depart at {}, outside the horizon.",
                    request.id,
                    request.desired_time
                );
            }

            for t in window {
                for k in self.aircraft(None) {
                    expr.add_term(
                        self.x.at([request.origin, request.destination, k, t]),
                        -1.0,
                    );
                }
            }

            self.model.add_constraint(
                ConstraintFamily::ServiceWindow,
                format!("window[{}]", request.id),
                expr,
                Sense::LessEq,
                0.0,
            );
        }
    }

    /// `x[i,j,k,t] + x[j,i,k,t + travel(i,j) + charging] <= 1`
    fn add_turnaround(&mut self) {
        let times = self.instance.horizon().len();
        let charging = self.instance.charging_time() as usize;
        let vertiports = self.instance.vertiports();
        for i in 0..vertiports.len() {
            for j in 0..vertiports.len() {
                let Some(duration) = self.leg(i, j) else {
                    continue;
                };

                for k in self.aircraft(None) {
                    for t in 0..times {
                        let reverse = t + duration + charging;
                        if reverse >= times {
                            break;
                        }

                        self.model.add_constraint(
                            ConstraintFamily::Turnaround,
                            format!(
                                "turnaround[{},{},{},t={}]",
                                vertiports[i].id, vertiports[j].id, k, t
                            ),
                            LinearExpr::sum([self.x.at([i, j, k, t]), self.x.at([j, i, k, reverse])]),
                            Sense::LessEq,
                            1.0,
                        );
                    }
                }
            }
        }
    }

    /// `p[i,k,t+1] - p[i,k,t] - arrivals_k(i,t) + departures_k(i,t) = 0`
    fn add_aircraft_presence(&mut self) {
        let times = self.instance.horizon().len();
        for (i, port) in self.instance.vertiports().iter().enumerate() {
            for k in self.aircraft(None) {
                for t in 0..times.saturating_sub(1) {
                    let mut expr = LinearExpr::new()
                        .with_term(self.p.at([i, k, t + 1]), 1.0)
                        .with_term(self.p.at([i, k, t]), -1.0);
                    expr.add_terms(self.arrivals(i, t, Some(k)), -1.0);
                    expr.add_terms(self.departures(i, t, Some(k)), 1.0);

                    self.model.add_constraint(
                        ConstraintFamily::AircraftPresence,
                        format!("presence[{},{},t={}]", port.id, k, t),
                        expr,
                        Sense::Equal,
                        0.0,
                    );
                }
            }
        }
    }

    fn add_no_self_loop(&mut self) {
        let times = self.instance.horizon().len();
        for (i, port) in self.instance.vertiports().iter().enumerate() {
            for k in self.aircraft(None) {
                for t in 0..times {
                    self.model.add_constraint(
                        ConstraintFamily::NoSelfLoop,
                        format!("self_loop[{},{},t={}]", port.id, k, t),
                        LinearExpr::sum([self.x.at([i, i, k, t])]),
                        Sense::Equal,
                        0.0,
                    );
                }
            }
        }
    }

    fn add_unreachable_legs(&mut self) {
        let times = self.instance.horizon().len();
        let vertiports = self.instance.vertiports();
        for i in 0..vertiports.len() {
            for j in 0..vertiports.len() {
                if i == j || self.leg(i, j).is_some() {
                    continue;
                }

                for k in self.aircraft(None) {
                    for t in 0..times {
                        self.model.add_constraint(
                            ConstraintFamily::UnreachableLeg,
                            format!(
                                "unreachable[{},{},{},t={}]",
                                vertiports[i].id, vertiports[j].id, k, t
                            ),
                            LinearExpr::sum([self.x.at([i, j, k, t])]),
                            Sense::Equal,
                            0.0,
                        );
                    }
                }
            }
        }
    }
}
