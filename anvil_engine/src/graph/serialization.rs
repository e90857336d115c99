use std::path::Path;

use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

use super::serde_compat::vec2_xy;
use super::{BridgeId, IslandGraph, IslandId, IslandParams};
use crate::prelude::*;
use crate::storage::FileStorage;

/// The persisted form of an [`IslandGraph`]. The same document is sent to
/// the generation service as the request body.
///
/// Positions are stored relative to `world_pos_offset` (the canvas position
/// of the first island) and with the Y axis pointing up.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SerializedGraph {
    #[serde(with = "vec2_xy")]
    pub world_pos_offset: Vec2,
    #[serde(default)]
    pub nodes: Vec<SerializedNode>,
    #[serde(default)]
    pub connections: Vec<SerializedConnection>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SerializedNode {
    /// Position of this node in the graph's island order. Connections refer
    /// to nodes by this index.
    pub index: usize,
    #[serde(with = "vec2_xy")]
    pub pos: Vec2,
    pub length: f32,
    pub width: f32,
    pub elevation: f32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SerializedConnection {
    /// The bridge midpoint, relative to the graph origin.
    #[serde(with = "vec2_xy")]
    pub pos: Vec2,
    pub out_node: usize,
    pub in_node: usize,
}

/// Maps slotmap ids to serialized indices, and back.
#[derive(Debug, Clone, Default)]
pub struct IdMappings {
    id_to_idx: SecondaryMap<IslandId, usize>,
    idx_to_id: Vec<IslandId>,
    bridge_idx_to_id: Vec<BridgeId>,
}

impl IdMappings {
    pub fn from_graph(graph: &IslandGraph) -> Self {
        IdMappings {
            id_to_idx: graph.island_ids().iter_cpy().zip(0..).collect(),
            idx_to_id: graph.island_ids().to_vec(),
            bridge_idx_to_id: graph.bridge_ids().to_vec(),
        }
    }

    pub fn get_idx(&self, id: IslandId) -> Option<usize> {
        self.id_to_idx.get(id).copied()
    }

    pub fn get_id(&self, idx: usize) -> Option<IslandId> {
        self.idx_to_id.get(idx).copied()
    }

    pub fn get_bridge_id(&self, idx: usize) -> Option<BridgeId> {
        self.bridge_idx_to_id.get(idx).copied()
    }

    pub fn island_ids(&self) -> impl Iterator<Item = IslandId> + '_ {
        self.idx_to_id.iter_cpy()
    }

    pub fn bridge_ids(&self) -> impl Iterator<Item = BridgeId> + '_ {
        self.bridge_idx_to_id.iter_cpy()
    }

    pub fn num_islands(&self) -> usize {
        self.idx_to_id.len()
    }

    pub fn num_bridges(&self) -> usize {
        self.bridge_idx_to_id.len()
    }
}

impl SerializedGraph {
    /// Takes a snapshot of the graph. The snapshot is always rebuilt from
    /// scratch.
    ///
    /// An empty graph has no first island to take the origin from. In that
    /// case the origin is the zero vector.
    #[profiling::function]
    pub fn from_runtime(graph: &IslandGraph) -> (Self, IdMappings) {
        let mappings = IdMappings::from_graph(graph);
        let origin = graph
            .islands()
            .next()
            .map(|(_, island)| island.position)
            .unwrap_or(Vec2::ZERO);

        let nodes = graph
            .islands()
            .enumerate()
            .map(|(index, (_, island))| SerializedNode {
                index,
                pos: island.position.to_graph_space(origin),
                length: island.params.length,
                width: island.params.width,
                elevation: island.params.elevation,
            })
            .collect();

        let connections = graph
            .bridges()
            .map(|(_, bridge)| {
                let mid = midpoint(
                    graph.islands[bridge.a].position,
                    graph.islands[bridge.b].position,
                );
                SerializedConnection {
                    pos: mid.to_graph_space(origin),
                    in_node: mappings.id_to_idx[bridge.a],
                    out_node: mappings.id_to_idx[bridge.b],
                }
            })
            .collect();

        (
            Self {
                world_pos_offset: origin,
                nodes,
                connections,
            },
            mappings,
        )
    }

    /// Rebuilds the graph described by this snapshot. Nodes are placed in the
    /// order given by their `index` field and connections are resolved
    /// against that order. Any inconsistency rejects the whole snapshot.
    #[profiling::function]
    pub fn into_runtime(self) -> Result<(IslandGraph, IdMappings)> {
        let origin = self.world_pos_offset;
        let num_nodes = self.nodes.len();

        let mut slots: Vec<Option<SerializedNode>> = vec![None; num_nodes];
        for node in self.nodes {
            let index = node.index;
            let slot = slots.get_mut(index).ok_or_else(|| {
                anyhow!("Node index {index} is out of range for a graph with {num_nodes} nodes")
            })?;
            if slot.is_some() {
                bail!("Node index {index} appears more than once");
            }
            *slot = Some(node);
        }

        let mut graph = IslandGraph::new();
        // Every slot is filled at this point: n distinct indices below n.
        for node in slots.into_iter().flatten() {
            graph.add_island(
                node.pos.to_canvas_space(origin),
                IslandParams {
                    width: node.width,
                    length: node.length,
                    elevation: node.elevation,
                },
            );
        }

        for (i, connection) in self.connections.iter().enumerate() {
            let resolve = |idx: usize| {
                graph.island_by_index(idx).ok_or_else(|| {
                    anyhow!("Connection {i} refers to node {idx}, but there are only {num_nodes}")
                })
            };
            let a = resolve(connection.in_node)?;
            let b = resolve(connection.out_node)?;
            graph
                .add_bridge(a, b)
                .with_context(|| format!("Connection {i} is not valid"))?;
        }

        let mappings = IdMappings::from_graph(&graph);
        Ok((graph, mappings))
    }

    pub fn load_from_string(data: &str) -> Result<Self> {
        serde_json::from_str(data).context("Could not parse graph file")
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads a snapshot. Returns `None` when the file does not exist.
    pub fn read_from(storage: &impl FileStorage, path: impl AsRef<Path>) -> Result<Option<Self>> {
        match storage.read_text(path.as_ref())? {
            Some(data) => Ok(Some(Self::load_from_string(&data)?)),
            None => Ok(None),
        }
    }

    /// Overwrites the file at `path` with this snapshot.
    pub fn write_to(&self, storage: &impl FileStorage, path: impl AsRef<Path>) -> Result<()> {
        storage.write_text(path.as_ref(), &self.to_json_string()?)
    }
}

/// Loads the graph at `path`. A missing, unreadable or invalid file is not an
/// error: it is logged, and an empty graph is returned instead.
pub fn load_or_empty(storage: &impl FileStorage, path: impl AsRef<Path>) -> IslandGraph {
    let path = path.as_ref();
    let loaded = SerializedGraph::read_from(storage, path)
        .and_then(|snapshot| snapshot.map(SerializedGraph::into_runtime).transpose());
    match loaded {
        Ok(Some((graph, _))) => {
            log::info!(
                "Loaded {} islands and {} bridges from {}",
                graph.num_islands(),
                graph.num_bridges(),
                path.display()
            );
            graph
        }
        Ok(None) => {
            log::info!("No graph at {}, starting empty", path.display());
            IslandGraph::new()
        }
        Err(err) => {
            log::warn!("Could not load {}, starting empty: {err:#}", path.display());
            IslandGraph::new()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::storage::MemoryStorage;

    fn params(width: f32, length: f32, elevation: f32) -> IslandParams {
        IslandParams {
            width,
            length,
            elevation,
        }
    }

    fn sample_graph() -> IslandGraph {
        let mut graph = IslandGraph::new();
        let a = graph.add_island(Vec2::new(300.0, 200.0), params(100.0, 80.0, 12.0));
        let b = graph.add_island(Vec2::new(450.0, 260.0), params(60.0, 60.0, 30.0));
        let c = graph.add_island(Vec2::new(120.5, 410.25), params(140.0, 90.0, 5.5));
        graph.add_bridge(a, b).unwrap();
        graph.add_bridge(c, b).unwrap();
        graph
    }

    fn assert_snapshots_close(a: &SerializedGraph, b: &SerializedGraph) {
        assert!(a.world_pos_offset.approx_eq(&b.world_pos_offset, EPSILON));
        assert_eq!(a.nodes.len(), b.nodes.len());
        for (x, y) in a.nodes.iter().zip(&b.nodes) {
            assert_eq!(x.index, y.index);
            assert!(x.pos.approx_eq(&y.pos, EPSILON));
            assert_eq!((x.width, x.length, x.elevation), (y.width, y.length, y.elevation));
        }
        assert_eq!(a.connections.len(), b.connections.len());
        for (x, y) in a.connections.iter().zip(&b.connections) {
            assert!(x.pos.approx_eq(&y.pos, EPSILON));
            assert_eq!((x.in_node, x.out_node), (y.in_node, y.out_node));
        }
    }

    #[test]
    fn roundtrip_preserves_graph() {
        let graph = sample_graph();
        let (saved, _) = SerializedGraph::from_runtime(&graph);
        let json = saved.to_json_string().unwrap();
        let (loaded, _) = SerializedGraph::load_from_string(&json)
            .unwrap()
            .into_runtime()
            .unwrap();

        assert_eq!(loaded.num_islands(), graph.num_islands());
        for ((_, x), (_, y)) in graph.islands().zip(loaded.islands()) {
            assert!(x.position.approx_eq(&y.position, EPSILON));
            assert_eq!(x.params, y.params);
        }

        // Endpoints are compared by resolved identity, through the order.
        let endpoints = |g: &IslandGraph| {
            g.bridges()
                .map(|(_, b)| (g.island_index(b.a).unwrap(), g.island_index(b.b).unwrap()))
                .collect_vec()
        };
        assert_eq!(endpoints(&graph), endpoints(&loaded));
        assert_eq!(endpoints(&loaded), vec![(0, 1), (2, 1)]);

        let (resaved, _) = SerializedGraph::from_runtime(&loaded);
        assert_snapshots_close(&saved, &resaved);
    }

    #[test]
    fn y_axis_is_inverted_relative_to_origin() {
        let mut graph = IslandGraph::new();
        graph.add_island(Vec2::new(0.0, 10.0), IslandParams::default());
        graph.add_island(Vec2::new(0.0, 50.0), IslandParams::default());

        let (saved, _) = SerializedGraph::from_runtime(&graph);
        assert_eq!(saved.world_pos_offset, Vec2::new(0.0, 10.0));
        assert_eq!(saved.nodes[0].pos, Vec2::ZERO);
        assert_eq!(saved.nodes[1].pos, Vec2::new(0.0, -40.0));

        let (loaded, _) = saved.into_runtime().unwrap();
        let positions = loaded.islands().map(|(_, i)| i.position).collect_vec();
        assert_eq!(positions, vec![Vec2::new(0.0, 10.0), Vec2::new(0.0, 50.0)]);
    }

    #[test]
    fn connection_position_is_relative_midpoint() {
        let mut graph = IslandGraph::new();
        let a = graph.add_island(Vec2::new(100.0, 100.0), IslandParams::default());
        let b = graph.add_island(Vec2::new(200.0, 300.0), IslandParams::default());
        graph.add_bridge(a, b).unwrap();

        let (saved, _) = SerializedGraph::from_runtime(&graph);
        let connection = &saved.connections[0];
        assert_eq!(connection.pos, Vec2::new(50.0, -100.0));
        assert_eq!((connection.in_node, connection.out_node), (0, 1));
    }

    #[test]
    fn empty_graph_uses_zero_origin() {
        let (saved, mappings) = SerializedGraph::from_runtime(&IslandGraph::new());
        assert_eq!(saved.world_pos_offset, Vec2::ZERO);
        assert!(saved.nodes.is_empty());
        assert!(saved.connections.is_empty());
        assert_eq!(mappings.num_islands(), 0);

        let (loaded, _) = saved.clone().into_runtime().unwrap();
        assert!(loaded.is_empty());
        assert_eq!(SerializedGraph::from_runtime(&loaded).0, saved);
    }

    #[test]
    fn file_uses_expected_field_names() {
        let (saved, _) = SerializedGraph::from_runtime(&sample_graph());
        let value: serde_json::Value =
            serde_json::from_str(&saved.to_json_string().unwrap()).unwrap();

        assert!(value["worldPosOffset"]["x"].is_number());
        let node = &value["nodes"][1];
        for key in ["index", "pos", "length", "width", "elevation"] {
            assert!(!node[key].is_null(), "missing node field {key}");
        }
        let connection = &value["connections"][0];
        assert_eq!(connection["inNode"], 0);
        assert_eq!(connection["outNode"], 1);
        assert!(connection["pos"]["y"].is_number());
    }

    #[test]
    fn nodes_are_placed_by_index() {
        let data = r#"{
            "worldPosOffset": {"x": 10, "y": 10},
            "nodes": [
                {"index": 1, "pos": {"x": 5, "y": 0}, "length": 1, "width": 2, "elevation": 3},
                {"index": 0, "pos": {"x": 0, "y": 0}, "length": 4, "width": 5, "elevation": 6}
            ],
            "connections": [{"pos": {"x": 0, "y": 0}, "outNode": 1, "inNode": 0}]
        }"#;
        let (graph, mappings) = SerializedGraph::load_from_string(data)
            .unwrap()
            .into_runtime()
            .unwrap();

        let first = graph.island(mappings.get_id(0).unwrap()).unwrap();
        assert_eq!(first.position, Vec2::new(10.0, 10.0));
        assert_eq!(first.params, params(5.0, 4.0, 6.0));
        let second = graph.island(mappings.get_id(1).unwrap()).unwrap();
        assert_eq!(second.position, Vec2::new(15.0, 10.0));
        assert_eq!(graph.num_bridges(), 1);
    }

    #[test]
    fn inconsistent_snapshots_are_rejected() {
        let node = |index| SerializedNode {
            index,
            pos: Vec2::ZERO,
            length: 1.0,
            width: 1.0,
            elevation: 1.0,
        };
        let connection = |in_node, out_node| SerializedConnection {
            pos: Vec2::ZERO,
            in_node,
            out_node,
        };
        let snapshot = |nodes, connections| SerializedGraph {
            world_pos_offset: Vec2::ZERO,
            nodes,
            connections,
        };

        assert!(snapshot(vec![node(0), node(2)], vec![]).into_runtime().is_err());
        assert!(snapshot(vec![node(0), node(0)], vec![]).into_runtime().is_err());
        assert!(snapshot(vec![node(0), node(1)], vec![connection(0, 2)])
            .into_runtime()
            .is_err());
        assert!(snapshot(vec![node(0), node(1)], vec![connection(1, 1)])
            .into_runtime()
            .is_err());
        assert!(snapshot(vec![node(1), node(0)], vec![connection(0, 1)])
            .into_runtime()
            .is_ok());
    }

    #[test]
    fn parallel_connections_survive_loading() {
        let data = r#"{
            "worldPosOffset": {"x": 0.0, "y": 0.0},
            "nodes": [
                {"index": 0, "pos": {"x": 0.0, "y": 0.0}, "length": 100.0, "width": 100.0, "elevation": 100.0},
                {"index": 1, "pos": {"x": 200.0, "y": 0.0}, "length": 100.0, "width": 100.0, "elevation": 100.0}
            ],
            "connections": [
                {"pos": {"x": 100.0, "y": 0.0}, "outNode": 1, "inNode": 0},
                {"pos": {"x": 100.0, "y": 0.0}, "outNode": 0, "inNode": 1}
            ]
        }"#;
        let storage = MemoryStorage::with_file("graph.json", data);
        let graph = load_or_empty(&storage, "graph.json");
        assert_eq!(graph.num_islands(), 2);
        assert_eq!(graph.num_bridges(), 2);

        let (saved, _) = SerializedGraph::from_runtime(&graph);
        let pairs = saved
            .connections
            .iter()
            .map(|c| (c.in_node, c.out_node))
            .collect_vec();
        assert_eq!(pairs, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn missing_or_corrupt_files_load_as_empty() {
        let storage = MemoryStorage::with_file("corrupt.json", "{ not json");
        assert!(load_or_empty(&storage, "missing.json").is_empty());
        assert!(load_or_empty(&storage, "corrupt.json").is_empty());

        let bad_index = r#"{"worldPosOffset": {"x": 0, "y": 0},
            "nodes": [], "connections": [{"pos": {"x": 0, "y": 0}, "outNode": 0, "inNode": 1}]}"#;
        let storage = MemoryStorage::with_file("bad.json", bad_index);
        assert!(load_or_empty(&storage, "bad.json").is_empty());
    }

    #[test]
    fn written_file_loads_back() {
        let storage = MemoryStorage::new();
        let (saved, _) = SerializedGraph::from_runtime(&sample_graph());
        saved.write_to(&storage, "graph.json").unwrap();

        let graph = load_or_empty(&storage, "graph.json");
        assert_eq!(graph.num_islands(), 3);
        assert_eq!(graph.num_bridges(), 2);
    }
}
