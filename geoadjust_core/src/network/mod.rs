// geoadjust_core/src/network/mod.rs

//! Leveling networks: stations joined by directed elevation-difference
//! observations, stored as an index-addressed arena.

use crate::error::{AdjustError, Result};
use crate::types::{ObservationId, StationId};

mod adjust;
mod traversal;

pub use adjust::{adjust_network, adjust_network_with, IndexMap, NetworkAdjustment};
pub use traversal::{BreadthFirst, EdgeKind, TraversalStep};

/// A benchmark or turning point whose elevation is either known (control)
/// or estimated by the adjustment.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub name: String,
    /// Elevation, or any scalar unknown carried by the station.
    pub value: f64,
    pub is_control: bool,
    /// Set once the station has a value consistent with a control station.
    pub is_initialized: bool,
}

/// A measured difference `value(to) − value(from)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub name: String,
    pub from: StationId,
    pub to: StationId,
    pub measured_difference: f64,
    /// Path length or any reliability proxy; smaller means more reliable.
    pub weight_basis: f64,
}

/// Directed observation graph. Stations and observations live in flat
/// vectors; `outgoing[s]` lists the observations leaving station `s` in
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct Network {
    stations: Vec<Station>,
    observations: Vec<Observation>,
    outgoing: Vec<Vec<ObservationId>>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_station(&mut self, name: impl Into<String>, value: f64, is_control: bool) -> StationId {
        let id = StationId(self.stations.len());
        self.stations.push(Station {
            name: name.into(),
            value,
            is_control,
            is_initialized: is_control,
        });
        self.outgoing.push(Vec::new());
        id
    }

    /// Adds a station with a fixed, known value.
    pub fn add_control(&mut self, name: impl Into<String>, value: f64) -> StationId {
        self.add_station(name, value, true)
    }

    /// Adds a station whose value will be estimated.
    pub fn add_unknown(&mut self, name: impl Into<String>) -> StationId {
        self.add_station(name, 0.0, false)
    }

    pub fn add_observation(
        &mut self,
        name: impl Into<String>,
        from: StationId,
        to: StationId,
        measured_difference: f64,
        weight_basis: f64,
    ) -> Result<ObservationId> {
        let name = name.into();
        for station in [from, to] {
            if station.0 >= self.stations.len() {
                return Err(AdjustError::UnknownStation(station.0));
            }
        }
        if !(weight_basis.is_finite() && weight_basis > 0.0) {
            return Err(AdjustError::InvalidWeight {
                observation: name,
                value: weight_basis,
            });
        }

        let id = ObservationId(self.observations.len());
        self.observations.push(Observation {
            name,
            from,
            to,
            measured_difference,
            weight_basis,
        });
        self.outgoing[from.0].push(id);
        Ok(id)
    }

    pub fn station(&self, id: StationId) -> &Station {
        &self.stations[id.0]
    }

    pub fn observation(&self, id: ObservationId) -> &Observation {
        &self.observations[id.0]
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn station_ids(&self) -> impl Iterator<Item = StationId> {
        (0..self.stations.len()).map(StationId)
    }

    pub fn observation_ids(&self) -> impl Iterator<Item = ObservationId> {
        (0..self.observations.len()).map(ObservationId)
    }

    pub fn outgoing(&self, id: StationId) -> &[ObservationId] {
        &self.outgoing[id.0]
    }

    pub fn find_station(&self, name: &str) -> Option<StationId> {
        self.stations.iter().position(|s| s.name == name).map(StationId)
    }

    pub fn find_observation(&self, name: &str) -> Option<ObservationId> {
        self.observations.iter().position(|o| o.name == name).map(ObservationId)
    }

    pub fn control_stations(&self) -> impl Iterator<Item = StationId> + '_ {
        self.station_ids().filter(|id| self.stations[id.0].is_control)
    }

    /// Number of stations to estimate.
    pub fn unknown_count(&self) -> usize {
        self.stations.iter().filter(|s| !s.is_control).count()
    }

    /// Multi-source breadth-first traversal seeded at every control station.
    pub fn breadth_first(&self) -> BreadthFirst<'_> {
        BreadthFirst::new(self, self.control_stations())
    }

    pub(crate) fn station_mut(&mut self, id: StationId) -> &mut Station {
        &mut self.stations[id.0]
    }

    pub(crate) fn observation_mut(&mut self, id: ObservationId) -> &mut Observation {
        &mut self.observations[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_stations_start_initialized() {
        let mut net = Network::new();
        let a = net.add_control("A", 10.0);
        let b = net.add_unknown("B");
        assert!(net.station(a).is_initialized);
        assert!(!net.station(b).is_initialized);
        assert_eq!(net.unknown_count(), 1);
        assert_eq!(net.control_stations().collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn observations_are_indexed_by_source() {
        let mut net = Network::new();
        let a = net.add_control("A", 0.0);
        let b = net.add_unknown("B");
        let ab = net.add_observation("1", a, b, 1.0, 2.0).unwrap();
        let ba = net.add_observation("2", b, a, -1.0, 2.0).unwrap();
        assert_eq!(net.outgoing(a), &[ab]);
        assert_eq!(net.outgoing(b), &[ba]);
        assert_eq!(net.find_observation("2"), Some(ba));
        assert_eq!(net.find_station("B"), Some(b));
    }

    #[test]
    fn invalid_observations_are_rejected() {
        let mut net = Network::new();
        let a = net.add_control("A", 0.0);
        assert_eq!(
            net.add_observation("x", a, StationId(7), 1.0, 1.0),
            Err(AdjustError::UnknownStation(7))
        );
        assert!(matches!(
            net.add_observation("y", a, a, 1.0, 0.0),
            Err(AdjustError::InvalidWeight { .. })
        ));
        assert!(net.observations().is_empty());
    }
}
