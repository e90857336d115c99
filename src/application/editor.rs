use anvil_engine::generation::mesh_data::TerrainLayout;
use anvil_engine::generation::serialization_strategy::SerializationStrategy;
use anvil_engine::generation::GenerationClient;
use anvil_engine::graph::serialization::{load_or_empty, SerializedGraph};
use anvil_engine::graph::{BridgeId, GraphError, IslandGraph, IslandId, IslandParams};
use anvil_engine::scene::{populate_scene, ScenePopulator};
use anvil_engine::storage::FileStorage;

use crate::config::EditorConfig;
use crate::prelude::*;

/// Every island has two connection points. A bridge is made by selecting
/// the in point of one island and the out point of another, in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPointKind {
    In,
    Out,
}

/// An editing session over a single graph file.
pub struct TerrainEditor<St: FileStorage> {
    config: EditorConfig,
    storage: St,
    graph: IslandGraph,
    selected_in: Option<IslandId>,
    selected_out: Option<IslandId>,
    dirty: bool,
}

impl<St: FileStorage> TerrainEditor<St> {
    /// Opens the configured graph file. A missing or broken file starts an
    /// empty graph.
    pub fn open(config: EditorConfig, storage: St) -> Self {
        let graph = load_or_empty(&storage, &config.graph_path);
        Self {
            config,
            storage,
            graph,
            selected_in: None,
            selected_out: None,
            dirty: false,
        }
    }

    pub fn graph(&self) -> &IslandGraph {
        &self.graph
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn storage(&self) -> &St {
        &self.storage
    }

    /// Whether there are edits that haven't been written yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The pending connection points, as `(in, out)`.
    pub fn selection(&self) -> (Option<IslandId>, Option<IslandId>) {
        (self.selected_in, self.selected_out)
    }

    pub fn clear_selection(&mut self) {
        self.selected_in = None;
        self.selected_out = None;
    }

    /// Creates an island with the default shape at a canvas position.
    pub fn add_island_at(&mut self, point: Vec2) -> Result<IslandId> {
        self.add_island(point, self.config.default_island)
    }

    pub fn add_island(&mut self, point: Vec2, params: IslandParams) -> Result<IslandId> {
        let id = self.graph.add_island(point, params);
        log::debug!("Added island {} at {point}", id.display_id());
        self.changed()?;
        Ok(id)
    }

    pub fn remove_island(&mut self, id: IslandId) -> Result<()> {
        self.graph.remove_island(id)?;
        if self.selected_in == Some(id) || self.selected_out == Some(id) {
            self.clear_selection();
        }
        self.changed()
    }

    pub fn connect(&mut self, a: IslandId, b: IslandId) -> Result<BridgeId> {
        let bridge = self.graph.add_bridge(a, b)?;
        self.changed()?;
        Ok(bridge)
    }

    /// Selects a connection point. Once an in point and an out point are
    /// selected the selection is cleared, and if they belong to different
    /// islands a bridge is built between them.
    pub fn click_connection_point(
        &mut self,
        island: IslandId,
        kind: ConnectionPointKind,
    ) -> Result<Option<BridgeId>> {
        if !self.graph.contains_island(island) {
            return Err(GraphError::UnknownIsland(island).into());
        }
        match kind {
            ConnectionPointKind::In => self.selected_in = Some(island),
            ConnectionPointKind::Out => self.selected_out = Some(island),
        }

        match (self.selected_in, self.selected_out) {
            (Some(a), Some(b)) => {
                self.clear_selection();
                if a == b {
                    Ok(None)
                } else {
                    self.connect(a, b).map(Some)
                }
            }
            _ => Ok(None),
        }
    }

    /// The island drawn on top at a canvas position, if any.
    pub fn island_under(&self, point: Vec2) -> Option<IslandId> {
        self.graph.island_at(point)
    }

    /// Like [`Self::click_connection_point`], for a click at a canvas
    /// position. Clicking empty canvas does nothing.
    pub fn click_connection_point_at(
        &mut self,
        point: Vec2,
        kind: ConnectionPointKind,
    ) -> Result<Option<BridgeId>> {
        match self.island_under(point) {
            Some(island) => self.click_connection_point(island, kind),
            None => Ok(None),
        }
    }

    pub fn remove_bridge(&mut self, id: BridgeId) -> Result<()> {
        self.graph.remove_bridge(id)?;
        self.changed()
    }

    pub fn drag_island(&mut self, id: IslandId, delta: Vec2) -> Result<()> {
        self.graph.move_island(id, delta)?;
        self.changed()
    }

    pub fn pan_canvas(&mut self, delta: Vec2) -> Result<()> {
        self.graph.pan(delta);
        self.changed()
    }

    pub fn set_island_params(&mut self, id: IslandId, params: IslandParams) -> Result<()> {
        self.graph.set_island_params(id, params)?;
        self.changed()
    }

    fn changed(&mut self) -> Result<()> {
        self.dirty = true;
        if self.config.auto_save {
            self.save()?;
        }
        Ok(())
    }

    /// Overwrites the graph file with the current graph.
    #[profiling::function]
    pub fn save(&mut self) -> Result<()> {
        let (snapshot, _) = SerializedGraph::from_runtime(&self.graph);
        snapshot
            .write_to(&self.storage, &self.config.graph_path)
            .with_context(|| format!("Could not save {}", self.config.graph_path.display()))?;
        log::debug!(
            "Saved {} islands and {} bridges to {}",
            self.graph.num_islands(),
            self.graph.num_bridges(),
            self.config.graph_path.display()
        );
        self.dirty = false;
        Ok(())
    }

    /// Ends the session, writing any pending edits.
    pub fn close(mut self) -> Result<()> {
        if self.dirty {
            self.save()?;
        }
        Ok(())
    }

    /// Saves the graph, requests terrain for it and hands the result to
    /// `scene`. The graph can't be edited until this returns.
    pub async fn generate<S: SerializationStrategy>(
        &mut self,
        client: &GenerationClient<S>,
        scene: &mut impl ScenePopulator,
    ) -> Result<TerrainLayout> {
        self.save()?;
        let layout = client.generate(&self.graph).await?;
        populate_scene(&layout, scene, self.config.distance_scalar)
            .context("Could not populate the scene")?;
        Ok(layout)
    }
}
