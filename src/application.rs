// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// The graph editing session: selection, persistence and generation.
pub mod editor;

/// Maps command line subcommands onto editor actions.
pub mod commands;
