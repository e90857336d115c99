use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::mesh_data::{GeneratedTerrain, MeshRecord};
use crate::graph::serialization::{SerializedConnection, SerializedGraph, SerializedNode};
use crate::prelude::*;

/// Parameter value (width, length or elevation) that maps to one world unit.
pub const ISLAND_UNIT: f32 = 100.0;

/// The route the generation service listens on.
pub const GENERATE_ROUTE: &str = "/Generate/";

const CUBE_VERTS: [[f32; 3]; 8] = [
    [1.0, 1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, 1.0],
    [1.0, -1.0, 1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, -1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, -1.0, 1.0],
];

#[rustfmt::skip]
const CUBE_INDICES: [u32; 36] = [
    4, 2, 0,
    2, 7, 3,
    6, 5, 7,
    1, 7, 5,
    0, 3, 1,
    4, 1, 5,
    4, 6, 2,
    2, 6, 7,
    6, 4, 5,
    1, 3, 7,
    0, 2, 3,
    4, 0, 1,
];

/// A box centred at `world_pos`, `2 * half_extents` in size.
fn cuboid(world_pos: Vec3, half_extents: Vec3) -> MeshRecord {
    MeshRecord {
        world_pos,
        verts: CUBE_VERTS
            .iter()
            .map(|v| Vec3::from(*v) * half_extents)
            .collect(),
        indices: CUBE_INDICES.to_vec(),
    }
}

/// Graph space is 2D with Y pointing up. The generated world lies on the
/// XZ plane.
fn graph_to_world(pos: Vec2) -> Vec3 {
    Vec3::new(pos.x, 0.0, pos.y)
}

fn island_mesh(node: &SerializedNode) -> MeshRecord {
    let extents = Vec3::new(node.width, node.elevation, node.length) / ISLAND_UNIT;
    cuboid(graph_to_world(node.pos), extents)
}

fn bridge_mesh(connection: &SerializedConnection) -> MeshRecord {
    cuboid(graph_to_world(connection.pos), Vec3::new(1.0, 0.25, 1.0))
}

/// Produces one mesh per node, in node index order, followed by one mesh per
/// connection, in connection order.
pub fn generate_terrain(graph: &SerializedGraph) -> Result<GeneratedTerrain> {
    let num_nodes = graph.nodes.len();
    let mut islands: Vec<Option<MeshRecord>> = vec![None; num_nodes];
    for node in &graph.nodes {
        let slot = islands
            .get_mut(node.index)
            .ok_or_else(|| anyhow!("Node index {} is out of range", node.index))?;
        if slot.is_some() {
            bail!("Node index {} appears more than once", node.index);
        }
        *slot = Some(island_mesh(node));
    }

    let mut terrain = islands.into_iter().flatten().collect_vec();
    for (i, connection) in graph.connections.iter().enumerate() {
        if connection.in_node >= num_nodes || connection.out_node >= num_nodes {
            bail!("Connection {i} refers to a missing node");
        }
        terrain.push(bridge_mesh(connection));
    }

    Ok(GeneratedTerrain { terrain })
}

async fn generate(
    Json(graph): Json<SerializedGraph>,
) -> Result<(StatusCode, Json<GeneratedTerrain>), (StatusCode, String)> {
    log::debug!(
        "Generating {} islands and {} bridges",
        graph.nodes.len(),
        graph.connections.len()
    );
    match generate_terrain(&graph) {
        // Existing clients expect 202 Accepted here
        Ok(terrain) => Ok((StatusCode::ACCEPTED, Json(terrain))),
        Err(err) => {
            log::warn!("Rejected generation request: {err:#}");
            Err((StatusCode::UNPROCESSABLE_ENTITY, format!("{err:#}")))
        }
    }
}

pub fn router() -> Router {
    Router::new().route(GENERATE_ROUTE, post(generate).put(generate))
}

/// The URL a [`GenerationClient`](super::GenerationClient) should use to
/// reach a service bound at `addr`.
pub fn generate_url(addr: SocketAddr) -> String {
    format!("http://{addr}{GENERATE_ROUTE}")
}

/// Serves the reference generation service until the process is stopped.
pub async fn serve(addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Could not bind {addr}"))?;
    log::info!(
        "Reference generation service listening on {}",
        generate_url(listener.local_addr()?)
    );
    axum::serve(listener, router())
        .await
        .context("Error running the reference generation service")
}

/// Starts the service on a free local port, in the background.
pub async fn spawn_on_ephemeral_port() -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .await
        .context("Could not bind a local port")?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router()).await {
            log::error!("Reference generation service stopped: {err}");
        }
    });
    Ok((addr, handle))
}
