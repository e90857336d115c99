// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt::Write;

use crate::generation::mesh_data::TerrainLayout;
use crate::prelude::*;

/// Receives generated meshes. Implemented by whatever turns them into
/// something visible: an engine scene, a file, a test recorder...
pub trait ScenePopulator {
    fn instantiate_island(&mut self, position: Vec3, verts: &[Vec3], indices: &[u32]) -> Result<()>;
    fn instantiate_bridge(&mut self, position: Vec3, verts: &[Vec3], indices: &[u32]) -> Result<()>;
    /// Called once, after every island and bridge has been instantiated.
    fn apply_colliders(&mut self) -> Result<()>;
}

/// Hands every mesh in `layout` to `scene`, islands first. World positions
/// coming from the service are divided by `distance_scalar`.
pub fn populate_scene(
    layout: &TerrainLayout,
    scene: &mut impl ScenePopulator,
    distance_scalar: f32,
) -> Result<()> {
    if distance_scalar == 0.0 || !distance_scalar.is_finite() {
        bail!("Invalid distance scalar: {distance_scalar}");
    }

    for (_, mesh) in &layout.islands {
        scene.instantiate_island(mesh.world_pos / distance_scalar, &mesh.verts, &mesh.indices)?;
    }
    for (_, mesh) in &layout.bridges {
        scene.instantiate_bridge(mesh.world_pos / distance_scalar, &mesh.verts, &mesh.indices)?;
    }
    scene.apply_colliders()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneObjectKind {
    Island,
    Bridge,
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub kind: SceneObjectKind,
    pub position: Vec3,
    pub verts: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub has_collider: bool,
}

/// Collects generated meshes and exports them as a Wavefront OBJ document,
/// one object per island or bridge. Vertices are written in world space:
/// `(position + vertex) * scale`.
#[derive(Debug, Clone)]
pub struct ObjScene {
    pub scale: f32,
    objects: Vec<SceneObject>,
}

impl ObjScene {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            objects: Vec::new(),
        }
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn count(&self, kind: SceneObjectKind) -> usize {
        self.objects.iter().filter(|o| o.kind == kind).count()
    }

    fn push(&mut self, kind: SceneObjectKind, position: Vec3, verts: &[Vec3], indices: &[u32]) {
        let label = match kind {
            SceneObjectKind::Island => "Island",
            SceneObjectKind::Bridge => "Bridge",
        };
        let name = format!("{label} ({})", self.count(kind) + 1);
        self.objects.push(SceneObject {
            name,
            kind,
            position,
            verts: verts.to_vec(),
            indices: indices.to_vec(),
            has_collider: false,
        });
    }

    pub fn to_obj_string(&self) -> Result<String> {
        let mut obj = String::new();
        writeln!(obj, "# Generated terrain: {} objects", self.objects.len())?;

        // OBJ indices are 1-based and global to the file.
        let mut base = 1;
        for object in &self.objects {
            writeln!(obj, "o {}", object.name)?;
            if object.has_collider {
                writeln!(obj, "# collider: mesh")?;
            }
            for v in &object.verts {
                let p = (object.position + *v) * self.scale;
                writeln!(obj, "v {} {} {}", p.x, p.y, p.z)?;
            }
            for tri in object.indices.chunks_exact(3) {
                writeln!(
                    obj,
                    "f {} {} {}",
                    base + tri[0] as usize,
                    base + tri[1] as usize,
                    base + tri[2] as usize
                )?;
            }
            base += object.verts.len();
        }
        Ok(obj)
    }
}

impl ScenePopulator for ObjScene {
    fn instantiate_island(&mut self, position: Vec3, verts: &[Vec3], indices: &[u32]) -> Result<()> {
        self.push(SceneObjectKind::Island, position, verts, indices);
        Ok(())
    }

    fn instantiate_bridge(&mut self, position: Vec3, verts: &[Vec3], indices: &[u32]) -> Result<()> {
        self.push(SceneObjectKind::Bridge, position, verts, indices);
        Ok(())
    }

    fn apply_colliders(&mut self) -> Result<()> {
        for object in &mut self.objects {
            object.has_collider = true;
        }
        Ok(())
    }
}
