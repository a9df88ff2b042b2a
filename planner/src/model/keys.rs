//! Structured keys for the four variable families and the typed maps
//!  from those keys to variable handles.
//!
//! Keys hold positions, not ids: vertiports and passengers by their
//!  position in the instance, aircraft by fleet index and time by grid
//!  position.

use super::VarId;
use std::collections::BTreeMap;

/// Key of `x[i,j,k,t]`: aircraft `k` departs `i` for `j` at grid position `t`.
///
/// Field order makes the derived ordering chronological.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlightKey {
    /// Departure grid position
    pub time: usize,
    /// Departure vertiport
    pub origin: usize,
    /// Arrival vertiport
    pub destination: usize,
    /// Aircraft index
    pub aircraft: usize,
}

/// Key of `y[i,t]`: number of aircraft at vertiport `i` at grid position `t`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PresenceKey {
    /// Vertiport
    pub vertiport: usize,
    /// Grid position
    pub time: usize,
}

/// Key of `p[i,k,t]`: aircraft `k` is at vertiport `i` at grid position `t`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AircraftPresenceKey {
    /// Vertiport
    pub vertiport: usize,
    /// Aircraft index
    pub aircraft: usize,
    /// Grid position
    pub time: usize,
}

/// Key of `z[s]`: passenger `s` is served
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassengerKey {
    /// Passenger position
    pub passenger: usize,
}

/// Variable handles of every family, keyed by their structured index
#[derive(Debug, Clone, Default)]
pub struct ModelVariables {
    pub(super) flights: BTreeMap<FlightKey, VarId>,
    pub(super) presence: BTreeMap<PresenceKey, VarId>,
    pub(super) aircraft_presence: BTreeMap<AircraftPresenceKey, VarId>,
    pub(super) passengers: BTreeMap<PassengerKey, VarId>,
}

impl ModelVariables {
    /// Handle of `x[key]`
    pub fn flight(&self, key: &FlightKey) -> Option<VarId> {
        self.flights.get(key).copied()
    }

    /// All `x` handles in chronological order
    pub fn flights(&self) -> impl Iterator<Item = (&FlightKey, &VarId)> {
        self.flights.iter()
    }

    /// Handle of `y[key]`
    pub fn presence(&self, key: &PresenceKey) -> Option<VarId> {
        self.presence.get(key).copied()
    }

    /// All `y` handles
    pub fn presences(&self) -> impl Iterator<Item = (&PresenceKey, &VarId)> {
        self.presence.iter()
    }

    /// Handle of `p[key]`
    pub fn aircraft_presence(&self, key: &AircraftPresenceKey) -> Option<VarId> {
        self.aircraft_presence.get(key).copied()
    }

    /// All `p` handles
    pub fn aircraft_presences(&self) -> impl Iterator<Item = (&AircraftPresenceKey, &VarId)> {
        self.aircraft_presence.iter()
    }

    /// Handle of `z[key]`
    pub fn passenger(&self, key: &PassengerKey) -> Option<VarId> {
        self.passengers.get(key).copied()
    }

    /// All `z` handles in passenger order
    pub fn passengers(&self) -> impl Iterator<Item = (&PassengerKey, &VarId)> {
        self.passengers.iter()
    }
}
