// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Events flowing through the maintainer's control queue

use crossbeam::channel::Sender;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum EventKind {
    Link,
    Neuron,
    Brain,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::Link => "link",
            EventKind::Neuron => "neuron",
            EventKind::Brain => "brain",
        })
    }
}

/// How a cast-anyway request came about
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CastMode {
    /// Requested by a running processor whose selector chose `group`
    Anyway { group: String },
    /// Backoff retry; the selector is consulted again
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EventAction {
    LinkReady,
    NeuronTryActivate,
    NeuronTryInactivate,
    /// Processor succeeded and its selector chose `group`
    NeuronTryCast { generation: u64, group: String },
    NeuronFailed { generation: u64 },
    /// Only honoured while activation `generation` is still current
    NeuronCastAnyway { generation: u64, mode: CastMode },
    /// `forced` sleeps (End reached) skip the idle check
    BrainSleep { forced: bool },
    BrainShutdown,
}

impl EventAction {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            EventAction::LinkReady => "link-ready",
            EventAction::NeuronTryActivate => "neuron-try-activate",
            EventAction::NeuronTryInactivate => "neuron-try-inactivate",
            EventAction::NeuronTryCast { .. } => "neuron-try-cast",
            EventAction::NeuronFailed { .. } => "neuron-failed",
            EventAction::NeuronCastAnyway { .. } => "neuron-cast-anyway",
            EventAction::BrainSleep { .. } => "brain-sleep",
            EventAction::BrainShutdown => "brain-shutdown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MaintainEvent {
    pub kind: EventKind,
    /// Link or neuron ID; empty for brain events
    pub id: String,
    pub action: EventAction,
}

impl MaintainEvent {
    pub(crate) fn link(id: impl Into<String>, action: EventAction) -> Self {
        Self {
            kind: EventKind::Link,
            id: id.into(),
            action,
        }
    }

    pub(crate) fn neuron(id: impl Into<String>, action: EventAction) -> Self {
        Self {
            kind: EventKind::Neuron,
            id: id.into(),
            action,
        }
    }

    pub(crate) fn brain(action: EventAction) -> Self {
        Self {
            kind: EventKind::Brain,
            id: String::new(),
            action,
        }
    }
}

/// Everything the control loop receives
#[derive(Debug)]
pub(crate) enum ControlMessage {
    Event(MaintainEvent),
    /// Mark links Ready, then acknowledge on `done`
    Trig {
        link_ids: Vec<String>,
        done: Sender<()>,
    },
}

/// One activation handed to a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunRequest {
    pub neuron_id: String,
    pub generation: u64,
}
