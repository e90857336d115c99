// Copyright (C) 2022 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Some useful re-exports
pub mod prelude;

/// The island graph core datatypes
pub mod graph;

/// Talking to the terrain generation service.
pub mod generation;

/// Handing generated meshes over to a scene.
pub mod scene;

pub mod storage;
