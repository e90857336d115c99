use serde::{Deserialize, Serialize};

use super::GenerationError;
use crate::graph::serde_compat::{vec3_xyz, vec3_xyz_seq};
use crate::graph::serialization::IdMappings;
use crate::graph::{BridgeId, IslandId};
use crate::prelude::*;

/// A single mesh produced by the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshRecord {
    #[serde(with = "vec3_xyz")]
    pub world_pos: Vec3,
    #[serde(with = "vec3_xyz_seq")]
    pub verts: Vec<Vec3>,
    /// Triangle list, three indices per triangle.
    pub indices: Vec<u32>,
}

impl MeshRecord {
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Checks the index buffer describes whole triangles over existing
    /// vertices.
    pub fn validate(&self) -> Result<(), String> {
        if self.indices.len() % 3 != 0 {
            return Err(format!(
                "{} indices do not form whole triangles",
                self.indices.len()
            ));
        }
        let num_verts = self.verts.len();
        if let Some(bad) = self.indices.iter().find(|i| **i as usize >= num_verts) {
            return Err(format!(
                "index {bad} is out of range for {num_verts} vertices"
            ));
        }
        Ok(())
    }
}

/// The generation service response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTerrain {
    pub terrain: Vec<MeshRecord>,
}

/// Generated meshes, matched back to the graph elements they were made for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerrainLayout {
    pub islands: Vec<(IslandId, MeshRecord)>,
    pub bridges: Vec<(BridgeId, MeshRecord)>,
}

impl TerrainLayout {
    /// The service answers with one record per island, in island order,
    /// followed by one record per bridge, in bridge order. Nothing in the
    /// response tags which is which, so the counts must match exactly.
    #[profiling::function]
    pub fn split(records: Vec<MeshRecord>, mappings: &IdMappings) -> Result<Self, GenerationError> {
        let num_islands = mappings.num_islands();
        let num_bridges = mappings.num_bridges();
        let expected = num_islands + num_bridges;
        if records.len() != expected {
            return Err(GenerationError::Protocol(format!(
                "expected {expected} mesh records ({num_islands} islands and {num_bridges} bridges), received {}",
                records.len()
            )));
        }

        for (i, record) in records.iter().enumerate() {
            record
                .validate()
                .map_err(|msg| GenerationError::Protocol(format!("mesh record {i}: {msg}")))?;
        }

        let mut records = records.into_iter();
        let islands = mappings.island_ids().zip(records.by_ref()).collect();
        let bridges = mappings.bridge_ids().zip(records).collect();
        Ok(TerrainLayout { islands, bridges })
    }

    pub fn num_records(&self) -> usize {
        self.islands.len() + self.bridges.len()
    }

    pub fn island_mesh(&self, id: IslandId) -> Option<&MeshRecord> {
        self.islands
            .iter()
            .find(|(island, _)| *island == id)
            .map(|(_, mesh)| mesh)
    }

    pub fn bridge_mesh(&self, id: BridgeId) -> Option<&MeshRecord> {
        self.bridges
            .iter()
            .find(|(bridge, _)| *bridge == id)
            .map(|(_, mesh)| mesh)
    }
}
