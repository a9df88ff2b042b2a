//! Validated, immutable description of a scheduling instance: vertiports
//!  with their gates, the fleet, the time grid, leg durations and
//!  passenger requests.
//!
//! Vertiports and passengers are referred to by their position in
//!  [`InstanceData::vertiports`] and [`InstanceData::passengers`] once
//!  validated. Their string ids are kept for reporting.

#[macro_use]
pub mod macros;
mod file;

pub use file::*;

use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Reasons an instance or model configuration is rejected
#[derive(Debug, Clone, PartialEq)]
pub enum InputValidationError {
    /// The instance has no vertiports
    NoVertiports,

    /// A vertiport id appears more than once
    DuplicateVertiport(String),

    /// A record references a vertiport that isn't declared
    UnknownVertiport {
        /// The unknown id
        vertiport_id: String,
        /// Which record referenced it
        referenced_by: String,
    },

    /// A vertiport has no gate capacity entry
    MissingGateCapacity(String),

    /// A gate capacity is negative or too large
    InvalidGateCapacity {
        /// Vertiport id
        vertiport_id: String,
        /// Provided value
        gates: i64,
    },

    /// Fleet size is not positive
    InvalidFleetSize(i64),

    /// Seat capacity is not positive
    InvalidSeatCapacity(i64),

    /// The time grid has no instants
    EmptyTimeGrid {
        /// First instant
        start: i64,
        /// One past the last instant
        end: i64,
    },

    /// A leg duration is not positive
    InvalidTravelTime {
        /// Departure vertiport id
        origin: String,
        /// Arrival vertiport id
        destination: String,
        /// Provided value
        duration: i64,
    },

    /// A leg starts and ends at the same vertiport
    SelfLoopLeg(String),

    /// A leg is listed more than once
    DuplicateTravelTime {
        /// Departure vertiport id
        origin: String,
        /// Arrival vertiport id
        destination: String,
    },

    /// Charging time is negative or too large
    InvalidChargingTime(i64),

    /// A passenger id appears more than once
    DuplicatePassenger(String),

    /// A passenger wants to fly to the vertiport they depart from
    SelfLoopRequest(String),

    /// A passenger's desired instant is NaN or infinite
    InvalidDesiredTime {
        /// Passenger id
        passenger_id: String,
        /// Provided value
        desired_time: f64,
    },

    /// The service window tolerance is negative or not finite
    InvalidTimeTolerance(f64),

    /// The model would declare more variables than the builder accepts
    ModelTooLarge {
        /// Largest accepted number of variables
        limit: usize,
    },
}

impl Display for InputValidationError {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            InputValidationError::NoVertiports => write!(f, "Instance has no vertiports."),
            InputValidationError::DuplicateVertiport(id) => {
                write!(f, "Vertiport [{}] is declared more than once.", id)
            }
            InputValidationError::UnknownVertiport {
                vertiport_id,
                referenced_by,
            } => write!(
                f,
                "Unknown vertiport [{}] referenced by {}.",
                vertiport_id, referenced_by
            ),
            InputValidationError::MissingGateCapacity(id) => {
                write!(f, "Vertiport [{}] has no gate capacity.", id)
            }
            InputValidationError::InvalidGateCapacity {
                vertiport_id,
                gates,
            } => write!(
                f,
                "Vertiport [{}] has an invalid gate capacity: {}.",
                vertiport_id, gates
            ),
            InputValidationError::InvalidFleetSize(size) => {
                write!(f, "Invalid fleet size: {}.", size)
            }
            InputValidationError::InvalidSeatCapacity(seats) => {
                write!(f, "Invalid seat capacity: {}.", seats)
            }
            InputValidationError::EmptyTimeGrid { start, end } => {
                write!(f, "Time grid [{}, {}) is empty.", start, end)
            }
            InputValidationError::InvalidTravelTime {
                origin,
                destination,
                duration,
            } => write!(
                f,
                "Leg [{}] -> [{}] has an invalid travel time: {}.",
                origin, destination, duration
            ),
            InputValidationError::SelfLoopLeg(id) => {
                write!(f, "Leg [{}] -> [{}] starts and ends at the same vertiport.", id, id)
            }
            InputValidationError::DuplicateTravelTime {
                origin,
                destination,
            } => write!(
                f,
                "Leg [{}] -> [{}] has more than one travel time.",
                origin, destination
            ),
            InputValidationError::InvalidChargingTime(time) => {
                write!(f, "Invalid charging time: {}.", time)
            }
            InputValidationError::DuplicatePassenger(id) => {
                write!(f, "Passenger [{}] is declared more than once.", id)
            }
            InputValidationError::SelfLoopRequest(id) => write!(
                f,
                "Passenger [{}] has the same origin and destination.",
                id
            ),
            InputValidationError::InvalidDesiredTime {
                passenger_id,
                desired_time,
            } => write!(
                f,
                "Passenger [{}] has an invalid desired time: {}.",
                passenger_id, desired_time
            ),
            InputValidationError::InvalidTimeTolerance(tolerance) => {
                write!(f, "Invalid time tolerance: {}.", tolerance)
            }
            InputValidationError::ModelTooLarge { limit } => {
                write!(f, "Model would declare more than {} variables.", limit)
            }
        }
    }
}

impl std::error::Error for InputValidationError {}

/// Switches that relax instance validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Accept a fleet of zero aircraft
    pub allow_empty_fleet: bool,
}

/// A take-off and landing station
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Vertiport {
    /// Vertiport id
    pub id: String,

    /// Maximum number of aircraft present per time unit
    pub gates: u32,
}

/// Interchangeable aircraft sharing one seat capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fleet {
    /// Number of aircraft (A)
    pub aircraft: u32,

    /// Seats per aircraft (S)
    pub seats: u32,
}

/// Contiguous integer instants `start, start + 1, ..., start + len - 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeGrid {
    start: i64,
    len: usize,
}

impl TimeGrid {
    /// First instant of the grid
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Number of instants
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false for a validated instance
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Instant at grid position `index`
    pub fn instant(&self, index: usize) -> i64 {
        self.start + index as i64
    }

    /// Grid position whose instant equals `instant` exactly
    pub fn index_of(&self, instant: f64) -> Option<usize> {
        if instant.fract() != 0.0 {
            return None;
        }

        let offset = instant - self.start as f64;
        if offset < 0.0 || offset >= self.len as f64 {
            return None;
        }

        Some(offset as usize)
    }

    /// Grid positions whose instant lies in `[instant - tolerance, instant + tolerance]`
    pub fn indices_within(&self, instant: f64, tolerance: f64) -> impl Iterator<Item = usize> + '_ {
        let lower = instant - tolerance;
        let upper = instant + tolerance;
        (0..self.len).filter(move |&index| {
            let t = self.instant(index) as f64;
            lower <= t && t <= upper
        })
    }
}

/// A validated passenger request
#[derive(Debug, Clone, PartialEq)]
pub struct Passenger {
    /// Passenger id
    pub id: String,

    /// Position of the departure vertiport
    pub origin: usize,

    /// Position of the arrival vertiport
    pub destination: usize,

    /// Desired departure instant
    pub desired_time: f64,
}

/// Validated problem description
#[derive(Debug, Clone)]
pub struct InstanceData {
    vertiports: Vec<Vertiport>,
    vertiport_index: HashMap<String, usize>,
    fleet: Fleet,
    horizon: TimeGrid,
    travel_times: HashMap<(usize, usize), u32>,
    charging_time: u32,
    passengers: Vec<Passenger>,
}

impl TryFrom<InstanceFile> for InstanceData {
    type Error = InputValidationError;

    fn try_from(file: InstanceFile) -> Result<Self, Self::Error> {
        InstanceData::new(file, &ValidationOptions::default())
    }
}

impl InstanceData {
    /// Validate an [`InstanceFile`], failing on the first inconsistency found
    pub fn new(
        file: InstanceFile,
        options: &ValidationOptions,
    ) -> Result<Self, InputValidationError> {
        let instance = Self::validate(file, options).map_err(|e| {
            instance_error!("(new) Invalid instance: {}", e);
            e
        })?;

        instance_debug!(
            "(new) Validated instance with {} vertiports, {} aircraft, {} instants, {} legs and {} passengers.",
            instance.vertiports.len(),
            instance.fleet.aircraft,
            instance.horizon.len(),
            instance.travel_times.len(),
            instance.passengers.len()
        );

        Ok(instance)
    }

    fn validate(
        file: InstanceFile,
        options: &ValidationOptions,
    ) -> Result<Self, InputValidationError> {
        let (vertiports, vertiport_index) = validate_vertiports(&file)?;
        let fleet = validate_fleet(&file.fleet, options)?;
        let horizon = validate_horizon(&file.horizon)?;
        let travel_times = validate_travel_times(&file.travel_times, &vertiport_index)?;
        let charging_time = u32::try_from(file.charging_time)
            .map_err(|_| InputValidationError::InvalidChargingTime(file.charging_time))?;
        let passengers = validate_passengers(file.passengers, &vertiport_index)?;

        Ok(InstanceData {
            vertiports,
            vertiport_index,
            fleet,
            horizon,
            travel_times,
            charging_time,
            passengers,
        })
    }

    /// Vertiports in declaration order
    pub fn vertiports(&self) -> &[Vertiport] {
        &self.vertiports
    }

    /// Position of a vertiport by id
    pub fn vertiport_index(&self, id: &str) -> Option<usize> {
        self.vertiport_index.get(id).copied()
    }

    /// Fleet size and seat capacity
    pub fn fleet(&self) -> Fleet {
        self.fleet
    }

    /// Time grid
    pub fn horizon(&self) -> TimeGrid {
        self.horizon
    }

    /// Charging time after any flight
    pub fn charging_time(&self) -> u32 {
        self.charging_time
    }

    /// Passenger requests in declaration order
    pub fn passengers(&self) -> &[Passenger] {
        &self.passengers
    }

    /// Explicit travel time of the leg `origin -> destination`, if listed
    pub fn travel_time(&self, origin: usize, destination: usize) -> Option<u32> {
        self.travel_times.get(&(origin, destination)).copied()
    }
}

fn validate_vertiports(
    file: &InstanceFile,
) -> Result<(Vec<Vertiport>, HashMap<String, usize>), InputValidationError> {
    if file.vertiports.is_empty() {
        return Err(InputValidationError::NoVertiports);
    }

    let mut index = HashMap::new();
    for (position, id) in file.vertiports.iter().enumerate() {
        if index.insert(id.clone(), position).is_some() {
            return Err(InputValidationError::DuplicateVertiport(id.clone()));
        }
    }

    if let Some(id) = file.gates.keys().find(|id| !index.contains_key(*id)) {
        return Err(InputValidationError::UnknownVertiport {
            vertiport_id: id.clone(),
            referenced_by: String::from("gate capacity"),
        });
    }

    let vertiports = file
        .vertiports
        .iter()
        .map(|id| -> Result<Vertiport, InputValidationError> {
            let Some(&gates) = file.gates.get(id) else {
                return Err(InputValidationError::MissingGateCapacity(id.clone()));
            };

            let gates =
                u32::try_from(gates).map_err(|_| InputValidationError::InvalidGateCapacity {
                    vertiport_id: id.clone(),
                    gates,
                })?;

            Ok(Vertiport {
                id: id.clone(),
                gates,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((vertiports, index))
}

fn validate_fleet(
    fleet: &FleetRecord,
    options: &ValidationOptions,
) -> Result<Fleet, InputValidationError> {
    let minimum = if options.allow_empty_fleet { 0 } else { 1 };
    if fleet.aircraft < minimum {
        return Err(InputValidationError::InvalidFleetSize(fleet.aircraft));
    }

    let aircraft = u32::try_from(fleet.aircraft)
        .map_err(|_| InputValidationError::InvalidFleetSize(fleet.aircraft))?;

    if fleet.seats <= 0 {
        return Err(InputValidationError::InvalidSeatCapacity(fleet.seats));
    }

    let seats = u32::try_from(fleet.seats)
        .map_err(|_| InputValidationError::InvalidSeatCapacity(fleet.seats))?;

    Ok(Fleet { aircraft, seats })
}

fn validate_horizon(horizon: &HorizonRecord) -> Result<TimeGrid, InputValidationError> {
    let empty = InputValidationError::EmptyTimeGrid {
        start: horizon.start,
        end: horizon.end,
    };

    if horizon.end <= horizon.start {
        return Err(empty);
    }

    let len = horizon
        .end
        .checked_sub(horizon.start)
        .and_then(|len| usize::try_from(len).ok())
        .ok_or(empty)?;

    Ok(TimeGrid {
        start: horizon.start,
        len,
    })
}

fn lookup(
    index: &HashMap<String, usize>,
    id: &str,
    referenced_by: impl FnOnce() -> String,
) -> Result<usize, InputValidationError> {
    index
        .get(id)
        .copied()
        .ok_or_else(|| InputValidationError::UnknownVertiport {
            vertiport_id: id.to_string(),
            referenced_by: referenced_by(),
        })
}

fn validate_travel_times(
    records: &[TravelTimeRecord],
    index: &HashMap<String, usize>,
) -> Result<HashMap<(usize, usize), u32>, InputValidationError> {
    let mut travel_times = HashMap::new();
    for record in records {
        let origin = lookup(index, &record.origin, || {
            format!("travel time {} -> {}", record.origin, record.destination)
        })?;
        let destination = lookup(index, &record.destination, || {
            format!("travel time {} -> {}", record.origin, record.destination)
        })?;

        if origin == destination {
            return Err(InputValidationError::SelfLoopLeg(record.origin.clone()));
        }

        let invalid = || InputValidationError::InvalidTravelTime {
            origin: record.origin.clone(),
            destination: record.destination.clone(),
            duration: record.duration,
        };

        if record.duration <= 0 {
            return Err(invalid());
        }

        let duration = u32::try_from(record.duration).map_err(|_| invalid())?;
        if travel_times.insert((origin, destination), duration).is_some() {
            return Err(InputValidationError::DuplicateTravelTime {
                origin: record.origin.clone(),
                destination: record.destination.clone(),
            });
        }
    }

    Ok(travel_times)
}

fn validate_passengers(
    records: Vec<PassengerRecord>,
    index: &HashMap<String, usize>,
) -> Result<Vec<Passenger>, InputValidationError> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .map(|record| -> Result<Passenger, InputValidationError> {
            if !seen.insert(record.id.clone()) {
                return Err(InputValidationError::DuplicatePassenger(record.id));
            }

            let origin = lookup(index, &record.origin, || format!("passenger {}", record.id))?;
            let destination =
                lookup(index, &record.destination, || format!("passenger {}", record.id))?;

            if origin == destination {
                return Err(InputValidationError::SelfLoopRequest(record.id));
            }

            if !record.desired_time.is_finite() {
                return Err(InputValidationError::InvalidDesiredTime {
                    passenger_id: record.id,
                    desired_time: record.desired_time,
                });
            }

            Ok(Passenger {
                id: record.id,
                origin,
                destination,
                desired_time: record.desired_time,
            })
        })
        .collect()
}
