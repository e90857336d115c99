use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use once_cell::sync::Lazy;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Loads editor settings from the given RON file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The graph file to edit. Overrides the configured one.
    #[arg(long, global = true)]
    pub graph: Option<PathBuf>,

    /// The generation service endpoint. Overrides the configured one.
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Don't write the graph after every edit, only when the command ends
    #[arg(long, global = true)]
    pub no_auto_save: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Island and bridge indices refer to the order in the graph file.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Lists the islands and bridges in the graph
    Show,
    /// Adds an island at the given canvas position
    #[command(allow_negative_numbers = true)]
    AddIsland {
        x: f32,
        y: f32,
        #[arg(long)]
        width: Option<f32>,
        #[arg(long)]
        length: Option<f32>,
        #[arg(long)]
        elevation: Option<f32>,
    },
    /// Removes an island, and every bridge touching it
    RemoveIsland { index: usize },
    /// Builds a bridge between two islands
    Connect { a: usize, b: usize },
    /// Removes a bridge
    Disconnect { index: usize },
    /// Drags an island by the given canvas offset
    #[command(allow_negative_numbers = true)]
    MoveIsland { index: usize, dx: f32, dy: f32 },
    /// Pans the whole canvas
    #[command(allow_negative_numbers = true)]
    Pan { dx: f32, dy: f32 },
    /// Changes the shape of an island. Omitted values are kept.
    SetParams {
        index: usize,
        #[arg(long)]
        width: Option<f32>,
        #[arg(long)]
        length: Option<f32>,
        #[arg(long)]
        elevation: Option<f32>,
    },
    /// Sends the graph to the generation service
    Generate {
        /// Also exports the generated terrain as a Wavefront OBJ file
        #[arg(long)]
        obj: Option<PathBuf>,
    },
    /// Runs the reference generation service
    Serve {
        #[arg(long, default_value = "127.0.0.1:105")]
        addr: SocketAddr,
    },
}

/// CLI args are stored in a lazy static variable so they're accessible from
/// everywhere. Arguments are parsed on first access.
pub static CLI_ARGS: Lazy<Args> = Lazy::new(Args::parse);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn negative_offsets_are_not_flags() {
        let args = Args::try_parse_from(["anvil_editor", "move-island", "2", "-10", "-4.5"]).unwrap();
        assert_eq!(
            args.command,
            Command::MoveIsland {
                index: 2,
                dx: -10.0,
                dy: -4.5
            }
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["anvil_editor", "show", "--graph", "x.json", "--no-auto-save"])
                .unwrap();
        assert_eq!(args.graph, Some(PathBuf::from("x.json")));
        assert!(args.no_auto_save);
        assert!(!args.verbose);
    }
}
