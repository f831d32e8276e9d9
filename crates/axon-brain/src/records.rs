// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Runtime records of one brain: link and neuron states plus counters
//!
//! Records are created at build time from the blueprint and are only ever
//! mutated by the maintainer's control loop. Everyone else reads snapshots.

use ahash::AHashMap;
use serde::Serialize;
use std::fmt;

use crate::blueprint::{LinkSpec, NeuronParts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LinkState {
    Init,
    /// Source neuron is running; the link may be cast when it finishes
    Wait,
    /// Signal delivered, waiting for the destination to consume it
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NeuronState {
    Inactive,
    Activated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BrainState {
    Shutdown,
    Sleeping,
    Running,
}

impl fmt::Display for BrainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BrainState::Shutdown => "Shutdown",
            BrainState::Sleeping => "Sleeping",
            BrainState::Running => "Running",
        })
    }
}

/// attempted / succeeded / failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkStatus {
    pub state: LinkState,
    pub counters: Counters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NeuronStatus {
    pub state: NeuronState,
    pub counters: Counters,
}

/// Number of records in each state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub inactive: usize,
    pub activated: usize,
    pub init: usize,
    pub wait: usize,
    pub ready: usize,
}

impl StateCounts {
    /// Nothing running and no signal in flight
    pub fn is_idle(&self) -> bool {
        self.activated == 0 && self.wait == 0 && self.ready == 0
    }
}

#[derive(Debug)]
pub(crate) struct LinkRecord {
    pub dest: String,
    pub state: LinkState,
    pub counters: Counters,
}

#[derive(Debug)]
pub(crate) struct NeuronRecord {
    pub trigger_groups: Vec<Vec<String>>,
    pub cast_groups: AHashMap<String, Vec<String>>,
    /// Union of all cast groups
    pub cast_links: Vec<String>,
    pub state: NeuronState,
    pub counters: Counters,
    /// Bumped on every activation; results of older runs are discarded
    pub generation: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Graph {
    pub neurons: AHashMap<String, NeuronRecord>,
    pub links: AHashMap<String, LinkRecord>,
}

impl Graph {
    pub fn new<'a>(
        neurons: impl IntoIterator<Item = &'a NeuronParts>,
        links: impl IntoIterator<Item = &'a LinkSpec>,
    ) -> Self {
        let mut graph = Graph::default();

        for link in links {
            graph.links.insert(
                link.id().to_string(),
                LinkRecord {
                    dest: link.dest().to_string(),
                    state: LinkState::Init,
                    counters: Counters::default(),
                },
            );
        }

        for neuron in neurons {
            let cast_groups: AHashMap<String, Vec<String>> = neuron
                .cast_groups
                .iter()
                .map(|(name, links)| (name.clone(), links.iter().cloned().collect()))
                .collect();
            let mut cast_links: Vec<String> = cast_groups.values().flatten().cloned().collect();
            cast_links.sort();
            cast_links.dedup();

            graph.neurons.insert(
                neuron.id.clone(),
                NeuronRecord {
                    trigger_groups: neuron
                        .trigger_groups
                        .iter()
                        .map(|g| g.iter().cloned().collect())
                        .collect(),
                    cast_groups,
                    cast_links,
                    state: NeuronState::Inactive,
                    counters: Counters::default(),
                    generation: 0,
                },
            );
        }

        graph
    }

    pub fn link_status(&self, id: &str) -> Option<LinkStatus> {
        self.links.get(id).map(|l| LinkStatus {
            state: l.state,
            counters: l.counters,
        })
    }

    pub fn neuron_status(&self, id: &str) -> Option<NeuronStatus> {
        self.neurons.get(id).map(|n| NeuronStatus {
            state: n.state,
            counters: n.counters,
        })
    }

    pub fn counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for neuron in self.neurons.values() {
            match neuron.state {
                NeuronState::Inactive => counts.inactive += 1,
                NeuronState::Activated => counts.activated += 1,
            }
        }
        for link in self.links.values() {
            match link.state {
                LinkState::Init => counts.init += 1,
                LinkState::Wait => counts.wait += 1,
                LinkState::Ready => counts.ready += 1,
            }
        }
        counts
    }

    /// Every link back to Init, every neuron back to Inactive. Counters stay.
    pub fn reset(&mut self) {
        for link in self.links.values_mut() {
            link.state = LinkState::Init;
        }
        for neuron in self.neurons.values_mut() {
            neuron.state = NeuronState::Inactive;
        }
    }
}
