use std::path::Path;

use anvil_engine::generation::reference_service;
use anvil_engine::generation::GenerationClient;
use anvil_engine::graph::{BridgeId, IslandGraph, IslandId, IslandParams};
use anvil_engine::scene::ObjScene;
use anvil_engine::storage::{DiskStorage, FileStorage};

use super::editor::TerrainEditor;
use crate::cli_args::Command;
use crate::config::EditorConfig;
use crate::prelude::*;

pub async fn run_command(command: &Command, config: EditorConfig) -> Result<()> {
    match command {
        Command::Serve { addr } => reference_service::serve(*addr).await,
        Command::Show => {
            let editor = TerrainEditor::open(config, DiskStorage);
            print!("{}", describe_graph(editor.graph()));
            Ok(())
        }
        Command::Generate { obj } => {
            let mut editor = TerrainEditor::open(config, DiskStorage);
            generate(&mut editor, obj.as_deref()).await?;
            editor.close()
        }
        edit => {
            let mut editor = TerrainEditor::open(config, DiskStorage);
            apply_edit(&mut editor, edit)?;
            if editor.config().auto_generate {
                generate(&mut editor, None).await?;
            }
            editor.close()
        }
    }
}

fn island_at_index(graph: &IslandGraph, index: usize) -> Result<IslandId> {
    graph.island_by_index(index).ok_or_else(|| {
        anyhow!(
            "There is no island {index}, the graph has {}",
            graph.num_islands()
        )
    })
}

fn bridge_at_index(graph: &IslandGraph, index: usize) -> Result<BridgeId> {
    graph.bridge_by_index(index).ok_or_else(|| {
        anyhow!(
            "There is no bridge {index}, the graph has {}",
            graph.num_bridges()
        )
    })
}

fn with_overrides(
    mut params: IslandParams,
    width: Option<f32>,
    length: Option<f32>,
    elevation: Option<f32>,
) -> IslandParams {
    params.width = width.unwrap_or(params.width);
    params.length = length.unwrap_or(params.length);
    params.elevation = elevation.unwrap_or(params.elevation);
    params
}

pub fn apply_edit<St: FileStorage>(editor: &mut TerrainEditor<St>, command: &Command) -> Result<()> {
    match *command {
        Command::AddIsland {
            x,
            y,
            width,
            length,
            elevation,
        } => {
            let params = with_overrides(editor.config().default_island, width, length, elevation);
            editor.add_island(Vec2::new(x, y), params)?;
            println!("Added island {}", editor.graph().num_islands() - 1);
        }
        Command::RemoveIsland { index } => {
            let id = island_at_index(editor.graph(), index)?;
            let num_bridges = editor.graph().bridges_of(id).count();
            editor.remove_island(id)?;
            println!("Removed island {index} and {num_bridges} bridges");
        }
        Command::Connect { a, b } => {
            let a = island_at_index(editor.graph(), a)?;
            let b = island_at_index(editor.graph(), b)?;
            editor.connect(a, b)?;
            println!("Added bridge {}", editor.graph().num_bridges() - 1);
        }
        Command::Disconnect { index } => {
            let id = bridge_at_index(editor.graph(), index)?;
            editor.remove_bridge(id)?;
            println!("Removed bridge {index}");
        }
        Command::MoveIsland { index, dx, dy } => {
            let id = island_at_index(editor.graph(), index)?;
            editor.drag_island(id, Vec2::new(dx, dy))?;
        }
        Command::Pan { dx, dy } => editor.pan_canvas(Vec2::new(dx, dy))?,
        Command::SetParams {
            index,
            width,
            length,
            elevation,
        } => {
            let id = island_at_index(editor.graph(), index)?;
            let current = editor
                .graph()
                .island(id)
                .map(|island| island.params)
                .ok_or_else(|| anyhow!("Island {index} vanished"))?;
            editor.set_island_params(id, with_overrides(current, width, length, elevation))?;
        }
        Command::Show | Command::Generate { .. } | Command::Serve { .. } => {
            bail!("{command:?} does not edit the graph")
        }
    }
    Ok(())
}

async fn generate<St: FileStorage>(editor: &mut TerrainEditor<St>, obj: Option<&Path>) -> Result<()> {
    let client = GenerationClient::json(
        editor.config().service_url.as_str(),
        editor.config().request_timeout(),
    )?;
    let mut scene = ObjScene::new(editor.config().terrain_scale);
    let layout = editor.generate(&client, &mut scene).await?;
    println!(
        "Generated {} island meshes and {} bridge meshes",
        layout.islands.len(),
        layout.bridges.len()
    );

    if let Some(path) = obj {
        DiskStorage.write_text(path, &scene.to_obj_string()?)?;
        log::info!("Wrote {} objects to {}", scene.objects().len(), path.display());
    }
    Ok(())
}

/// A plain text listing of the graph, in file order.
pub fn describe_graph(graph: &IslandGraph) -> String {
    let mut out = format!(
        "{} islands, {} bridges\n",
        graph.num_islands(),
        graph.num_bridges()
    );
    for (i, (_, island)) in graph.islands().enumerate() {
        let IslandParams {
            width,
            length,
            elevation,
        } = island.params;
        out += &format!(
            "  island {i}: at ({}, {}), {width} x {length}, elevation {elevation}\n",
            island.position.x, island.position.y
        );
    }
    for (i, (_, bridge)) in graph.bridges().enumerate() {
        let index_of = |id: IslandId| {
            graph
                .island_index(id)
                .map_or_else(|| "?".to_string(), |idx| idx.to_string())
        };
        out += &format!("  bridge {i}: {} - {}\n", index_of(bridge.a), index_of(bridge.b));
    }
    out
}
