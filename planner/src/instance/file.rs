//! Serialized form of a problem instance.
//!
//! Values are kept signed and unchecked here so that [`super::InstanceData`]
//!  can report exactly which field is out of range.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Fleet description: number of interchangeable aircraft and seats per aircraft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetRecord {
    /// Number of aircraft (A)
    pub aircraft: i64,

    /// Seats per aircraft (S)
    pub seats: i64,
}

/// Planning horizon as a half-open integer range `start..end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizonRecord {
    /// First instant of the grid
    pub start: i64,

    /// One past the last instant of the grid
    pub end: i64,
}

/// Flight duration of one ordered leg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelTimeRecord {
    /// Departure vertiport id
    pub origin: String,

    /// Arrival vertiport id
    pub destination: String,

    /// Duration in grid units
    pub duration: i64,
}

/// A single passenger trip request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassengerRecord {
    /// Passenger id
    pub id: String,

    /// Departure vertiport id
    pub origin: String,

    /// Arrival vertiport id
    pub destination: String,

    /// Desired departure instant, may fall between grid instants
    pub desired_time: f64,
}

/// Complete instance as read from disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceFile {
    /// Vertiport ids
    pub vertiports: Vec<String>,

    /// Gate capacity per vertiport id
    pub gates: BTreeMap<String, i64>,

    /// Fleet size and seat capacity
    pub fleet: FleetRecord,

    /// Time grid
    pub horizon: HorizonRecord,

    /// Every reachable ordered leg with its duration
    #[serde(default)]
    pub travel_times: Vec<TravelTimeRecord>,

    /// Charging time after a flight
    #[serde(default)]
    pub charging_time: i64,

    /// Passenger requests
    #[serde(default)]
    pub passengers: Vec<PassengerRecord>,
}

impl InstanceFile {
    /// Read an instance from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("could not read instance file [{}]", path.display()))?;

        Self::from_json(&contents)
            .with_context(|| format!("could not parse instance file [{}]", path.display()))
    }

    /// Parse an instance from a JSON string
    pub fn from_json(contents: &str) -> Result<Self> {
        let file = serde_json::from_str(contents)?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ut_from_json_defaults() {
        let json = r#"{
            "vertiports": ["A", "B"],
            "gates": { "A": 1, "B": 3 },
            "fleet": { "aircraft": 2, "seats": 4 },
            "horizon": { "start": 0, "end": 10 }
        }"#;

        let file = InstanceFile::from_json(json).unwrap();
        assert_eq!(file.vertiports, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(file.gates.get("B"), Some(&3));
        assert_eq!(file.fleet.aircraft, 2);
        assert_eq!(file.horizon.end, 10);
        assert!(file.travel_times.is_empty());
        assert!(file.passengers.is_empty());
        assert_eq!(file.charging_time, 0);
    }

    #[test]
    fn ut_from_json_invalid() {
        let result = InstanceFile::from_json(r#"{ "vertiports": 3 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn ut_from_path_missing_file() {
        let error = InstanceFile::from_path("does/not/exist.json").unwrap_err();
        assert!(error.to_string().contains("does/not/exist.json"));
    }

    #[test]
    fn ut_sample_instance_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/sample_instance.json");
        let file = InstanceFile::from_path(path).unwrap();
        assert_eq!(file.vertiports.len(), 4);
        assert_eq!(file.passengers.len(), 7);
    }
}
