//! Test utilities. Provides log macros and small instances shared by unit tests.

use crate::instance::{
    FleetRecord, HorizonRecord, InstanceFile, PassengerRecord, TravelTimeRecord,
};
use std::collections::BTreeMap;

/// Writes a debug! message to the test logger
#[macro_export]
macro_rules! ut_debug {
    ($($arg:tt)+) => {
        log::debug!(target: "test", $($arg)+)
    };
}

/// Writes an info! message to the test logger
#[macro_export]
macro_rules! ut_info {
    ($($arg:tt)+) => {
        log::info!(target: "test", $($arg)+)
    };
}

/// Writes a warn! message to the test logger
#[macro_export]
macro_rules! ut_warn {
    ($($arg:tt)+) => {
        log::warn!(target: "test", $($arg)+)
    };
}

/// Writes an error! message to the test logger
#[macro_export]
macro_rules! ut_error {
    ($($arg:tt)+) => {
        log::error!(target: "test", $($arg)+)
    };
}

/// Two vertiports joined by a single one-way leg `V1 -> V2` of duration 1,
///  one aircraft with four seats, horizon `0..4` and no passengers.
pub fn two_vertiport_file() -> InstanceFile {
    InstanceFile {
        vertiports: vec!["V1".to_string(), "V2".to_string()],
        gates: BTreeMap::from([("V1".to_string(), 2), ("V2".to_string(), 2)]),
        fleet: FleetRecord {
            aircraft: 1,
            seats: 4,
        },
        horizon: HorizonRecord { start: 0, end: 4 },
        travel_times: vec![TravelTimeRecord {
            origin: "V1".to_string(),
            destination: "V2".to_string(),
            duration: 1,
        }],
        charging_time: 1,
        passengers: vec![],
    }
}

/// Shorthand for a passenger request
pub fn passenger(id: &str, origin: &str, destination: &str, desired_time: f64) -> PassengerRecord {
    PassengerRecord {
        id: id.to_string(),
        origin: origin.to_string(),
        destination: destination.to_string(),
        desired_time,
    }
}

/// Shorthand for a travel time entry
pub fn leg(origin: &str, destination: &str, duration: i64) -> TravelTimeRecord {
    TravelTimeRecord {
        origin: origin.to_string(),
        destination: destination.to_string(),
        duration,
    }
}
