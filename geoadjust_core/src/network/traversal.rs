// geoadjust_core/src/network/traversal.rs

use std::collections::VecDeque;

use crate::network::Network;
use crate::types::{ObservationId, StationId};

/// How the traversal reached an observation's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// The target was discovered through this observation.
    Tree,
    /// The target had already been discovered. Redundant observations, and
    /// self loops, show up here.
    NonTree,
}

/// One examined observation, in breadth-first order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalStep {
    pub observation: ObservationId,
    pub from: StationId,
    pub to: StationId,
    pub kind: EdgeKind,
}

impl TraversalStep {
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

/// Lazy multi-source breadth-first traversal over a `Network`.
///
/// Every seed is discovered up front; each dequeued station then has its
/// outgoing observations examined in insertion order. Observations leaving
/// stations that are never discovered are never yielded. The iterator only
/// borrows the network, so a fresh one can be created at any time.
#[derive(Debug, Clone)]
pub struct BreadthFirst<'a> {
    network: &'a Network,
    queue: VecDeque<StationId>,
    discovered: Vec<bool>,
    current: Option<(StationId, usize)>,
}

impl<'a> BreadthFirst<'a> {
    pub fn new(network: &'a Network, seeds: impl IntoIterator<Item = StationId>) -> Self {
        let mut discovered = vec![false; network.stations().len()];
        let mut queue = VecDeque::new();
        for seed in seeds {
            if !discovered[seed.0] {
                discovered[seed.0] = true;
                queue.push_back(seed);
            }
        }
        Self {
            network,
            queue,
            discovered,
            current: None,
        }
    }

    /// Whether `station` has been discovered so far.
    pub fn is_discovered(&self, station: StationId) -> bool {
        self.discovered[station.0]
    }
}

impl Iterator for BreadthFirst<'_> {
    type Item = TraversalStep;

    fn next(&mut self) -> Option<Self::Item> {
        let network = self.network;
        loop {
            let (station, cursor) = match self.current {
                Some(state) => state,
                None => {
                    let station = self.queue.pop_front()?;
                    (station, 0)
                }
            };

            let outgoing = network.outgoing(station);
            let Some(&observation) = outgoing.get(cursor) else {
                self.current = None;
                continue;
            };
            self.current = Some((station, cursor + 1));

            let to = network.observation(observation).to;
            let kind = if self.discovered[to.0] {
                EdgeKind::NonTree
            } else {
                self.discovered[to.0] = true;
                self.queue.push_back(to);
                EdgeKind::Tree
            };

            return Some(TraversalStep {
                observation,
                from: station,
                to,
                kind,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_network() -> Network {
        let mut net = Network::new();
        let a = net.add_control("A", 237.483);
        let b = net.add_unknown("B");
        let c = net.add_unknown("C");
        let d = net.add_unknown("D");
        net.add_observation("1", a, b, 5.835, 3.5).unwrap();
        net.add_observation("2", b, c, 3.782, 2.7).unwrap();
        net.add_observation("3", a, c, 9.640, 4.0).unwrap();
        net.add_observation("4", d, c, 7.384, 3.0).unwrap();
        net.add_observation("5", a, d, 2.270, 2.5).unwrap();
        net
    }

    #[test]
    fn visits_in_breadth_first_order() {
        let net = sample_network();
        let steps: Vec<_> = net.breadth_first().collect();
        let names: Vec<_> = steps
            .iter()
            .map(|s| net.observation(s.observation).name.as_str())
            .collect();
        assert_eq!(names, vec!["1", "3", "5", "2", "4"]);

        let kinds: Vec<_> = steps.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EdgeKind::Tree,
                EdgeKind::Tree,
                EdgeKind::Tree,
                EdgeKind::NonTree,
                EdgeKind::NonTree
            ]
        );
    }

    #[test]
    fn traversal_is_restartable() {
        let net = sample_network();
        let first: Vec<_> = net.breadth_first().collect();
        let second: Vec<_> = net.breadth_first().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn unreachable_sources_are_not_yielded() {
        let mut net = Network::new();
        let a = net.add_control("A", 0.0);
        let b = net.add_unknown("B");
        let c = net.add_unknown("C");
        net.add_observation("ab", a, b, 1.0, 1.0).unwrap();
        net.add_observation("cb", c, b, 1.0, 1.0).unwrap();

        let mut bfs = net.breadth_first();
        let steps: Vec<_> = bfs.by_ref().collect();
        assert_eq!(steps.len(), 1);
        assert!(bfs.is_discovered(b));
        assert!(!bfs.is_discovered(c));
    }

    #[test]
    fn self_loop_is_a_non_tree_edge() {
        let mut net = Network::new();
        let a = net.add_control("A", 0.0);
        net.add_observation("aa", a, a, 0.0, 1.0).unwrap();
        let step = net.breadth_first().next().unwrap();
        assert!(step.is_self_loop());
        assert_eq!(step.kind, EdgeKind::NonTree);
    }
}
