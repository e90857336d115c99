// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::prelude::*;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

/// The graph file format, also used as the generation request payload.
pub mod serialization;

/// Serde helpers for the `{x, y}` / `{x, y, z}` vector encoding.
pub mod serde_compat;

slotmap::new_key_type! { pub struct IslandId; }
slotmap::new_key_type! { pub struct BridgeId; }

impl IslandId {
    pub fn display_id(self) -> String {
        format!("{:?}", self.0)
    }
}

impl BridgeId {
    pub fn display_id(self) -> String {
        format!("{:?}", self.0)
    }
}

/// Ways in which a graph edit can be rejected. A rejected edit never
/// modifies the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("an island cannot be connected to itself")]
    SelfConnection,
    #[error("island {} does not exist in this graph", .0.display_id())]
    UnknownIsland(IslandId),
    #[error("bridge {} does not exist in this graph", .0.display_id())]
    UnknownBridge(BridgeId),
}

/// The shape parameters of an island. These are passed verbatim to the
/// generation service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IslandParams {
    pub width: f32,
    pub length: f32,
    pub elevation: f32,
}

impl Default for IslandParams {
    fn default() -> Self {
        Self {
            width: 100.0,
            length: 100.0,
            elevation: 100.0,
        }
    }
}

/// An island in the terrain graph. Islands become standalone landmasses
/// after generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Island {
    /// Centre of the island, in canvas space.
    pub position: Vec2,
    pub params: IslandParams,
}

impl Island {
    /// The footprint of this island on the canvas. Used for hit testing.
    pub fn rect(&self) -> Rect {
        Rect::from_center_size(
            self.position,
            Vec2::new(self.params.width, self.params.length),
        )
    }
}

/// A bridge joins two distinct islands. The pair is unordered: `a` and `b`
/// only differ in how they are written to the graph file (`inNode` and
/// `outNode` respectively).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bridge {
    pub a: IslandId,
    pub b: IslandId,
}

impl Bridge {
    pub fn touches(&self, island: IslandId) -> bool {
        self.a == island || self.b == island
    }

    pub fn joins(&self, x: IslandId, y: IslandId) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }

    /// Returns the endpoint opposite to `island`, if `island` is an endpoint.
    pub fn other(&self, island: IslandId) -> Option<IslandId> {
        if self.a == island {
            Some(self.b)
        } else if self.b == island {
            Some(self.a)
        } else {
            None
        }
    }
}

/// The terrain graph. Islands and bridges live in generational arenas, so
/// handles stay valid (or become detectably stale) regardless of edits
/// elsewhere in the graph.
///
/// Insertion order is tracked separately because it is part of the contract
/// with the generation service: the file format and the mesh response are
/// both ordered by it.
#[derive(Default, Debug, Clone)]
pub struct IslandGraph {
    islands: SlotMap<IslandId, Island>,
    bridges: SlotMap<BridgeId, Bridge>,
    island_order: Vec<IslandId>,
    bridge_order: Vec<BridgeId>,
}

impl IslandGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_island(&mut self, position: Vec2, params: IslandParams) -> IslandId {
        let id = self.islands.insert(Island { position, params });
        self.island_order.push(id);
        id
    }

    /// Removes an island, along with every bridge touching it.
    pub fn remove_island(&mut self, id: IslandId) -> Result<Island, GraphError> {
        if !self.islands.contains_key(id) {
            return Err(GraphError::UnknownIsland(id));
        }

        // Two passes: the bridge list can't be edited while we walk it.
        let touching = self.bridges_of(id).collect_vec();
        for bridge_id in touching {
            self.remove_bridge(bridge_id)?;
        }

        self.island_order.retain(|x| *x != id);
        self.islands.remove(id).ok_or(GraphError::UnknownIsland(id))
    }

    pub fn add_bridge(&mut self, a: IslandId, b: IslandId) -> Result<BridgeId, GraphError> {
        if a == b {
            return Err(GraphError::SelfConnection);
        }
        for id in [a, b] {
            if !self.islands.contains_key(id) {
                return Err(GraphError::UnknownIsland(id));
            }
        }

        let id = self.bridges.insert(Bridge { a, b });
        self.bridge_order.push(id);
        Ok(id)
    }

    pub fn remove_bridge(&mut self, id: BridgeId) -> Result<Bridge, GraphError> {
        let bridge = self
            .bridges
            .remove(id)
            .ok_or(GraphError::UnknownBridge(id))?;
        self.bridge_order.retain(|x| *x != id);
        Ok(bridge)
    }

    /// Moves a single island by `delta`. This is what dragging a node does.
    pub fn move_island(&mut self, id: IslandId, delta: Vec2) -> Result<(), GraphError> {
        self.island_mut(id)?.position += delta;
        Ok(())
    }

    pub fn set_island_position(&mut self, id: IslandId, position: Vec2) -> Result<(), GraphError> {
        self.island_mut(id)?.position = position;
        Ok(())
    }

    pub fn set_island_params(
        &mut self,
        id: IslandId,
        params: IslandParams,
    ) -> Result<(), GraphError> {
        self.island_mut(id)?.params = params;
        Ok(())
    }

    /// Moves every island by `delta`. This is what dragging the canvas does.
    pub fn pan(&mut self, delta: Vec2) {
        for island in self.islands.values_mut() {
            island.position += delta;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn island(&self, id: IslandId) -> Option<&Island> {
        self.islands.get(id)
    }

    fn island_mut(&mut self, id: IslandId) -> Result<&mut Island, GraphError> {
        self.islands
            .get_mut(id)
            .ok_or(GraphError::UnknownIsland(id))
    }

    pub fn bridge(&self, id: BridgeId) -> Option<&Bridge> {
        self.bridges.get(id)
    }

    pub fn contains_island(&self, id: IslandId) -> bool {
        self.islands.contains_key(id)
    }

    /// The bridge midpoint, in canvas space. Bridges don't store a position
    /// of their own.
    pub fn bridge_midpoint(&self, id: BridgeId) -> Option<Vec2> {
        let bridge = self.bridges.get(id)?;
        Some(midpoint(
            self.islands.get(bridge.a)?.position,
            self.islands.get(bridge.b)?.position,
        ))
    }

    /// Iterates the islands in insertion order.
    pub fn islands(&self) -> impl Iterator<Item = (IslandId, &Island)> + '_ {
        self.island_order
            .iter_cpy()
            .map(move |id| (id, &self.islands[id]))
    }

    /// Iterates the bridges in insertion order.
    pub fn bridges(&self) -> impl Iterator<Item = (BridgeId, &Bridge)> + '_ {
        self.bridge_order
            .iter_cpy()
            .map(move |id| (id, &self.bridges[id]))
    }

    /// All the bridges with `island` as one of its endpoints, in order.
    pub fn bridges_of(&self, island: IslandId) -> impl Iterator<Item = BridgeId> + '_ {
        self.bridge_order
            .iter_cpy()
            .filter(move |id| self.bridges[*id].touches(island))
    }

    pub fn island_ids(&self) -> &[IslandId] {
        &self.island_order
    }

    pub fn bridge_ids(&self) -> &[BridgeId] {
        &self.bridge_order
    }

    pub fn island_index(&self, id: IslandId) -> Option<usize> {
        self.island_order.index_of(&id)
    }

    pub fn island_by_index(&self, idx: usize) -> Option<IslandId> {
        self.island_order.get(idx).copied()
    }

    pub fn bridge_by_index(&self, idx: usize) -> Option<BridgeId> {
        self.bridge_order.get(idx).copied()
    }

    pub fn num_islands(&self) -> usize {
        self.island_order.len()
    }

    pub fn num_bridges(&self) -> usize {
        self.bridge_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.island_order.is_empty()
    }

    /// Returns the topmost island under `point`. Islands added last are drawn
    /// on top, so they are tested first.
    pub fn island_at(&self, point: Vec2) -> Option<IslandId> {
        self.island_order
            .iter()
            .rev()
            .copied()
            .find(|id| self.islands[*id].rect().contains(point))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn graph_with(positions: &[(f32, f32)]) -> (IslandGraph, Vec<IslandId>) {
        let mut graph = IslandGraph::new();
        let ids = positions
            .iter()
            .map(|(x, y)| graph.add_island(Vec2::new(*x, *y), IslandParams::default()))
            .collect();
        (graph, ids)
    }

    #[test]
    fn removing_island_removes_its_bridges() {
        let (mut graph, ids) = graph_with(&[(0.0, 0.0), (100.0, 0.0), (200.0, 0.0)]);
        graph.add_bridge(ids[0], ids[1]).unwrap();
        graph.add_bridge(ids[1], ids[2]).unwrap();
        assert_eq!(graph.num_bridges(), 2);

        graph.remove_island(ids[1]).unwrap();
        assert_eq!(graph.num_bridges(), 0);
        assert_eq!(graph.num_islands(), 2);
        assert_eq!(graph.island_ids(), &[ids[0], ids[2]]);
    }

    #[test]
    fn removing_island_keeps_unrelated_bridges() {
        let (mut graph, ids) = graph_with(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        graph.add_bridge(ids[0], ids[1]).unwrap();
        let kept = graph.add_bridge(ids[2], ids[3]).unwrap();
        graph.add_bridge(ids[1], ids[2]).unwrap();

        graph.remove_island(ids[1]).unwrap();
        assert_eq!(graph.bridge_ids(), &[kept]);
    }

    #[test]
    fn self_connection_is_rejected() {
        let (mut graph, ids) = graph_with(&[(0.0, 0.0)]);
        assert_eq!(
            graph.add_bridge(ids[0], ids[0]),
            Err(GraphError::SelfConnection)
        );
        assert_eq!(graph.num_bridges(), 0);
    }

    #[test]
    fn parallel_bridges_are_kept() {
        let (mut graph, ids) = graph_with(&[(0.0, 0.0), (10.0, 0.0)]);
        let first = graph.add_bridge(ids[0], ids[1]).unwrap();
        let second = graph.add_bridge(ids[1], ids[0]).unwrap();
        assert_ne!(first, second);
        assert_eq!(graph.bridge_ids(), &[first, second]);
        assert_eq!(graph.bridges_of(ids[0]).count(), 2);

        graph.remove_bridge(first).unwrap();
        assert_eq!(graph.bridge_ids(), &[second]);
        graph.remove_island(ids[1]).unwrap();
        assert_eq!(graph.num_bridges(), 0);
    }

    #[test]
    fn stale_handles_are_rejected() {
        let (mut graph, ids) = graph_with(&[(0.0, 0.0), (10.0, 0.0)]);
        let bridge = graph.add_bridge(ids[0], ids[1]).unwrap();
        graph.remove_island(ids[0]).unwrap();

        // The freed slot may be reused, but the old handle must not resolve.
        let new_island = graph.add_island(Vec2::ZERO, IslandParams::default());
        assert_ne!(new_island, ids[0]);
        assert_eq!(
            graph.remove_island(ids[0]),
            Err(GraphError::UnknownIsland(ids[0]))
        );
        assert_eq!(
            graph.remove_bridge(bridge),
            Err(GraphError::UnknownBridge(bridge))
        );
        assert_eq!(
            graph.add_bridge(ids[0], ids[1]),
            Err(GraphError::UnknownIsland(ids[0]))
        );
        assert_eq!(graph.num_islands(), 2);
    }

    #[test]
    fn midpoint_follows_endpoints() {
        let (mut graph, ids) = graph_with(&[(0.0, 0.0), (10.0, 20.0)]);
        let bridge = graph.add_bridge(ids[0], ids[1]).unwrap();
        assert_eq!(graph.bridge_midpoint(bridge), Some(Vec2::new(5.0, 10.0)));

        graph.move_island(ids[1], Vec2::new(10.0, 0.0)).unwrap();
        assert_eq!(graph.bridge_midpoint(bridge), Some(Vec2::new(10.0, 10.0)));

        graph.pan(Vec2::new(1.0, 1.0));
        assert_eq!(graph.bridge_midpoint(bridge), Some(Vec2::new(11.0, 11.0)));
    }

    #[test]
    fn placing_and_clearing() {
        let (mut graph, ids) = graph_with(&[(0.0, 0.0), (10.0, 0.0)]);
        let bridge = graph.add_bridge(ids[0], ids[1]).unwrap();
        graph
            .set_island_position(ids[1], Vec2::new(-10.0, 40.0))
            .unwrap();
        assert_eq!(graph.island(ids[1]).unwrap().position, Vec2::new(-10.0, 40.0));
        assert_eq!(graph.bridge_midpoint(bridge), Some(Vec2::new(-5.0, 20.0)));

        graph.remove_island(ids[0]).unwrap();
        assert_eq!(
            graph.set_island_position(ids[0], Vec2::ZERO),
            Err(GraphError::UnknownIsland(ids[0]))
        );

        graph.clear();
        assert!(graph.is_empty());
        assert_eq!(graph.num_bridges(), 0);
        assert!(graph.island(ids[1]).is_none());
        assert_eq!(graph.island_at(Vec2::ZERO), None);
    }

    #[test]
    fn hit_testing_prefers_topmost_island() {
        let (graph, ids) = graph_with(&[(0.0, 0.0), (40.0, 0.0)]);
        // Both 100x100 islands overlap at x = 20
        assert_eq!(graph.island_at(Vec2::new(20.0, 0.0)), Some(ids[1]));
        assert_eq!(graph.island_at(Vec2::new(-45.0, 0.0)), Some(ids[0]));
        assert_eq!(graph.island_at(Vec2::new(500.0, 0.0)), None);
    }

    #[test]
    fn bridge_endpoints() {
        let (mut graph, ids) = graph_with(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let bridge_id = graph.add_bridge(ids[0], ids[1]).unwrap();
        let bridge = graph.bridge(bridge_id).unwrap();
        assert!(bridge.joins(ids[1], ids[0]));
        assert_eq!(bridge.other(ids[0]), Some(ids[1]));
        assert_eq!(bridge.other(ids[2]), None);
        assert_eq!(graph.bridges_of(ids[2]).count(), 0);
    }
}
