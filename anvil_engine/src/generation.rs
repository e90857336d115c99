// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use derive_more::Display;

use crate::graph::serialization::SerializedGraph;
use crate::graph::IslandGraph;
use crate::prelude::*;

/// Pluggable wire formats for the generation protocol.
pub mod serialization_strategy;

/// HTTP transport, parameterized over the wire format.
pub mod http_client;

/// Mesh records returned by the service, and how they map onto the graph.
pub mod mesh_data;

/// An in-process stand-in for the generation service.
pub mod reference_service;

use http_client::HttpClient;
use mesh_data::{GeneratedTerrain, TerrainLayout};
use serialization_strategy::{JsonSerialization, SerializationStrategy};

/// Why a generation request did not produce a terrain layout. None of these
/// are fatal: the caller decides how to report them.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("a generation request is already in flight")]
    Busy,
    #[error("could not reach the generation service: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("the generation service answered with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not encode the generation request: {0:#}")]
    Encode(anyhow::Error),
    #[error("could not decode the generation response: {0:#}")]
    Decode(anyhow::Error),
    #[error("the generation response does not match the graph: {0}")]
    Protocol(String),
}

/// At most one request is in flight per client:
/// `Idle -> Requesting -> Idle | Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum GenerationState {
    #[display(fmt = "idle")]
    Idle,
    #[display(fmt = "requesting")]
    Requesting,
    #[display(fmt = "failed: {}", _0)]
    Failed(String),
}

/// Sends graphs to the generation service and matches the returned meshes
/// back to islands and bridges.
pub struct GenerationClient<S = JsonSerialization> {
    http: HttpClient<S>,
    url: String,
    state: Mutex<GenerationState>,
}

impl GenerationClient<JsonSerialization> {
    pub fn json(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        Self::new(url, JsonSerialization, timeout)
    }
}

impl<S: SerializationStrategy> GenerationClient<S> {
    pub fn new(url: impl Into<String>, strategy: S, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self::with_http_client(url, HttpClient::new(strategy, timeout)?))
    }

    pub fn with_http_client(url: impl Into<String>, http: HttpClient<S>) -> Self {
        Self {
            http,
            url: url.into(),
            state: Mutex::new(GenerationState::Idle),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> GenerationState {
        self.lock_state().clone()
    }

    pub fn is_busy(&self) -> bool {
        *self.lock_state() == GenerationState::Requesting
    }

    fn lock_state(&self) -> MutexGuard<'_, GenerationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Generates terrain for `graph`.
    ///
    /// The graph stays borrowed until the response has been matched against
    /// it, so it can't be edited while the request is in flight. A second
    /// call while one is outstanding fails with [`GenerationError::Busy`].
    /// Dropping the returned future cancels the request and returns the
    /// client to [`GenerationState::Idle`].
    pub async fn generate(&self, graph: &IslandGraph) -> Result<TerrainLayout, GenerationError> {
        let guard = self.begin_request()?;

        let (payload, mappings) = SerializedGraph::from_runtime(graph);
        log::info!(
            "Requesting terrain for {} islands and {} bridges from {}",
            mappings.num_islands(),
            mappings.num_bridges(),
            self.url
        );

        let result = self
            .http
            .post::<_, GeneratedTerrain>(&self.url, &payload)
            .await
            .and_then(|response| TerrainLayout::split(response.terrain, &mappings));

        match &result {
            Ok(layout) => {
                log::info!("Received {} meshes", layout.num_records());
                guard.finish(GenerationState::Idle);
            }
            Err(err) => {
                log::warn!("Terrain generation failed: {err}");
                guard.finish(GenerationState::Failed(err.to_string()));
            }
        }
        result
    }

    fn begin_request(&self) -> Result<RequestGuard<'_>, GenerationError> {
        let mut state = self.lock_state();
        if *state == GenerationState::Requesting {
            log::warn!("Ignoring generation request: another one is in flight");
            return Err(GenerationError::Busy);
        }
        *state = GenerationState::Requesting;
        Ok(RequestGuard {
            state: &self.state,
            finished: false,
        })
    }
}

/// Holds the `Requesting` state for the duration of a request.
struct RequestGuard<'a> {
    state: &'a Mutex<GenerationState>,
    finished: bool,
}

impl RequestGuard<'_> {
    fn finish(mut self, outcome: GenerationState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = outcome;
        self.finished = true;
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            log::debug!("Generation request cancelled");
            *self.state.lock().unwrap_or_else(PoisonError::into_inner) = GenerationState::Idle;
        }
    }
}
