// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Some useful re-exports.
pub mod prelude;

/// Command line arguments.
pub mod cli_args;

/// Editor settings, from a RON file and the command line.
pub mod config;

pub mod application;

use prelude::*;

fn main() {
    #[cfg(feature = "tracy")]
    let _client = profiling::tracy_client::Client::start();

    let args = &*cli_args::CLI_ARGS;

    // Setup logging. RUST_LOG still takes precedence.
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(err) = run(args) {
        log::error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(args: &cli_args::Args) -> Result<()> {
    let config = config::EditorConfig::load(args.config.as_deref())?.with_overrides(args);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Could not start the async runtime")?;
    runtime.block_on(application::commands::run_command(&args.command, config))
}
