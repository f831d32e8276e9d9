// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Activation algorithm: trigger-group evaluation and cast selection
//!
//! | Event                                      | Link role | Transition   |
//! |--------------------------------------------|-----------|--------------|
//! | trig / upstream casts this link's group    | any       | -> Ready     |
//! | destination activates                      | in-link   | Ready -> Init|
//! | source activates                           | out-link  | -> Wait      |
//! | source finishes, group not selected        | out-link  | Wait -> Init |
//! | source finishes, group selected            | out-link  | Wait -> Ready|
//!
//! These are pure state transitions on [`Graph`]; the maintainer turns the
//! returned link IDs into events.

use tracing::debug;

use crate::blueprint::END_NEURON_ID;
use crate::error::{BrainError, BrainResult};
use crate::records::{Graph, LinkState, NeuronState};

/// Outcome of trying to activate a neuron
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Activation {
    NotQualified,
    /// The End neuron qualified: the brain must go to sleep
    EndReached,
    /// Neuron activated; run its processor for this generation
    Run { generation: u64 },
}

/// Links touched by a cast-anyway request
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct CastAnyway {
    /// Newly Ready links
    pub ready: Vec<String>,
    /// Links that were already Ready and get re-signalled
    pub resent: Vec<String>,
}

impl Graph {
    /// Mark a link Ready from outside. Returns `false` if it already was.
    pub fn mark_ready(&mut self, link_id: &str) -> BrainResult<bool> {
        let link = self
            .links
            .get_mut(link_id)
            .ok_or_else(|| BrainError::not_found("link", link_id))?;
        if link.state == LinkState::Ready {
            return Ok(false);
        }
        link.state = LinkState::Ready;
        Ok(true)
    }

    pub fn link_destination(&self, link_id: &str) -> Option<&str> {
        self.links.get(link_id).map(|l| l.dest.as_str())
    }

    /// Activated with exactly this generation
    pub fn is_current(&self, neuron_id: &str, generation: u64) -> bool {
        self.neurons
            .get(neuron_id)
            .map_or(false, |n| n.state == NeuronState::Activated && n.generation == generation)
    }

    /// Activate the neuron if all links of any one trigger group are Ready.
    pub fn try_activate(&mut self, neuron_id: &str) -> BrainResult<Activation> {
        let Graph { neurons, links } = self;
        let neuron = neurons
            .get_mut(neuron_id)
            .ok_or_else(|| BrainError::not_found("neuron", neuron_id))?;

        if neuron.state == NeuronState::Activated {
            return Ok(Activation::NotQualified);
        }
        let qualified = neuron.trigger_groups.iter().any(|group| {
            !group.is_empty()
                && group
                    .iter()
                    .all(|id| links.get(id).map_or(false, |l| l.state == LinkState::Ready))
        });
        if !qualified {
            return Ok(Activation::NotQualified);
        }
        if neuron_id == END_NEURON_ID {
            return Ok(Activation::EndReached);
        }

        neuron.state = NeuronState::Activated;
        neuron.generation += 1;
        neuron.counters.attempted += 1;

        for id in neuron.trigger_groups.iter().flatten() {
            if let Some(link) = links.get_mut(id) {
                link.state = LinkState::Init;
            }
        }
        for id in &neuron.cast_links {
            if let Some(link) = links.get_mut(id) {
                link.state = LinkState::Wait;
            }
        }

        Ok(Activation::Run {
            generation: neuron.generation,
        })
    }

    /// Processor succeeded and `group` was selected.
    ///
    /// Returns the links that became Ready, or `None` if the run is stale.
    pub fn finish_success(&mut self, neuron_id: &str, generation: u64, group: &str) -> Option<Vec<String>> {
        if !self.is_current(neuron_id, generation) {
            return None;
        }
        let Graph { neurons, links } = self;
        let neuron = neurons.get_mut(neuron_id)?;
        neuron.state = NeuronState::Inactive;
        neuron.counters.succeeded += 1;

        let selected: &[String] = match neuron.cast_groups.get(group) {
            Some(ids) => ids,
            None => {
                debug!(neuron_id, group, "selected cast group does not exist, nothing cast");
                &[]
            }
        };

        let mut ready = Vec::new();
        for id in &neuron.cast_links {
            let Some(link) = links.get_mut(id) else {
                continue;
            };
            if selected.contains(id) {
                link.counters.attempted += 1;
                if link.state == LinkState::Wait {
                    link.state = LinkState::Ready;
                    link.counters.succeeded += 1;
                    ready.push(id.clone());
                }
            } else if link.state == LinkState::Wait {
                link.state = LinkState::Init;
            }
        }
        Some(ready)
    }

    /// Processor failed: nothing is cast, waiting out-links fall back to Init.
    ///
    /// Returns `false` if the run is stale.
    pub fn finish_failure(&mut self, neuron_id: &str, generation: u64) -> bool {
        if !self.is_current(neuron_id, generation) {
            return false;
        }
        let Graph { neurons, links } = self;
        let Some(neuron) = neurons.get_mut(neuron_id) else {
            return false;
        };
        neuron.state = NeuronState::Inactive;
        neuron.counters.failed += 1;

        for id in &neuron.cast_links {
            if let Some(link) = links.get_mut(id) {
                if link.state == LinkState::Wait {
                    link.state = LinkState::Init;
                    link.counters.failed += 1;
                }
            }
        }
        true
    }

    /// Cast `group` while the neuron keeps running.
    ///
    /// Selected links in Wait or Init become Ready, selected links already
    /// Ready are reported for re-signalling, every other out-link goes to Wait.
    pub fn cast_anyway(&mut self, neuron_id: &str, group: &str) -> BrainResult<CastAnyway> {
        let Graph { neurons, links } = self;
        let neuron = neurons
            .get(neuron_id)
            .ok_or_else(|| BrainError::not_found("neuron", neuron_id))?;
        let selected: &[String] = match neuron.cast_groups.get(group) {
            Some(ids) => ids,
            None => &[],
        };

        let mut outcome = CastAnyway::default();
        for id in &neuron.cast_links {
            let Some(link) = links.get_mut(id) else {
                continue;
            };
            if selected.contains(id) {
                link.counters.attempted += 1;
                match link.state {
                    LinkState::Ready => outcome.resent.push(id.clone()),
                    LinkState::Init | LinkState::Wait => {
                        link.state = LinkState::Ready;
                        link.counters.succeeded += 1;
                        outcome.ready.push(id.clone());
                    }
                }
            } else {
                link.state = LinkState::Wait;
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::{Blueprint, DEFAULT_CAST_GROUP};
    use crate::context::BrainContext;
    use crate::records::LinkState::*;

    fn noop(_ctx: &BrainContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn graph_of(bp: &Blueprint) -> Graph {
        let (_, neurons, links) = bp.clone().into_parts();
        let parts: Vec<_> = neurons.into_iter().map(|n| n.into_parts()).collect();
        Graph::new(&parts, &links)
    }

    fn state(graph: &Graph, link: &str) -> LinkState {
        graph.link_status(link).unwrap().state
    }

    #[test]
    fn test_fan_in_needs_whole_group() {
        let mut bp = Blueprint::new();
        let n = bp.add_neuron(noop);
        let l1 = bp.add_entry_link_to(&n).unwrap();
        let l2 = bp.add_entry_link_to(&n).unwrap();
        let l3 = bp.add_entry_link_to(&n).unwrap();
        bp.add_trigger_group(&n, &[&l1, &l2]).unwrap();
        let mut graph = graph_of(&bp);

        graph.mark_ready(&l1).unwrap();
        assert_eq!(graph.try_activate(&n).unwrap(), Activation::NotQualified);

        graph.mark_ready(&l2).unwrap();
        assert_eq!(graph.try_activate(&n).unwrap(), Activation::Run { generation: 1 });
        assert_eq!(state(&graph, &l1), Init);
        assert_eq!(state(&graph, &l2), Init);

        // an activated neuron never re-qualifies
        graph.mark_ready(&l3).unwrap();
        assert_eq!(graph.try_activate(&n).unwrap(), Activation::NotQualified);
        assert_eq!(state(&graph, &l3), Ready);
    }

    #[test]
    fn test_activation_resets_every_trigger_group() {
        let mut bp = Blueprint::new();
        let n = bp.add_neuron(noop);
        let l1 = bp.add_entry_link_to(&n).unwrap();
        let l2 = bp.add_entry_link_to(&n).unwrap();
        let mut graph = graph_of(&bp);

        graph.mark_ready(&l1).unwrap();
        graph.mark_ready(&l2).unwrap();
        assert!(matches!(graph.try_activate(&n).unwrap(), Activation::Run { .. }));
        assert_eq!(state(&graph, &l1), Init);
        assert_eq!(state(&graph, &l2), Init);
    }

    #[test]
    fn test_selected_group_casts_and_others_fall_back() {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(noop);
        let b = bp.add_neuron(noop);
        let c = bp.add_neuron(noop);
        let entry = bp.add_entry_link_to(&a).unwrap();
        let ab = bp.add_link(&a, &b).unwrap();
        let ac = bp.add_link(&a, &c).unwrap();
        bp.add_cast_group(&a, "to-b", &[&ab]).unwrap();
        let mut graph = graph_of(&bp);

        graph.mark_ready(&entry).unwrap();
        let Activation::Run { generation } = graph.try_activate(&a).unwrap() else {
            panic!("neuron should run");
        };
        assert_eq!(state(&graph, &ab), Wait);
        assert_eq!(state(&graph, &ac), Wait);

        let ready = graph.finish_success(&a, generation, "to-b").unwrap();
        assert_eq!(ready, vec![ab.clone()]);
        assert_eq!(state(&graph, &ab), Ready);
        assert_eq!(state(&graph, &ac), Init);

        let status = graph.link_status(&ab).unwrap();
        assert_eq!(status.counters.attempted, 1);
        assert_eq!(status.counters.succeeded, 1);
        let neuron = graph.neuron_status(&a).unwrap();
        assert_eq!(neuron.state, NeuronState::Inactive);
        assert_eq!(neuron.counters.succeeded, 1);
    }

    #[test]
    fn test_unknown_group_casts_nothing() {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(noop);
        let b = bp.add_neuron(noop);
        let entry = bp.add_entry_link_to(&a).unwrap();
        let ab = bp.add_link(&a, &b).unwrap();
        let mut graph = graph_of(&bp);

        graph.mark_ready(&entry).unwrap();
        graph.try_activate(&a).unwrap();
        let ready = graph.finish_success(&a, 1, "NOT-Defined").unwrap();

        assert!(ready.is_empty());
        assert_eq!(state(&graph, &ab), Init);
        assert!(graph.counts().is_idle());
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(noop);
        let b = bp.add_neuron(noop);
        let entry = bp.add_entry_link_to(&a).unwrap();
        bp.add_link(&a, &b).unwrap();
        let mut graph = graph_of(&bp);

        graph.mark_ready(&entry).unwrap();
        graph.try_activate(&a).unwrap();
        graph.reset();

        assert!(graph.finish_success(&a, 1, DEFAULT_CAST_GROUP).is_none());
        assert!(!graph.finish_failure(&a, 1));
        assert_eq!(graph.neuron_status(&a).unwrap().counters.succeeded, 0);
    }

    #[test]
    fn test_failure_returns_wait_links_to_init() {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(noop);
        let b = bp.add_neuron(noop);
        let entry = bp.add_entry_link_to(&a).unwrap();
        let ab = bp.add_link(&a, &b).unwrap();
        let mut graph = graph_of(&bp);

        graph.mark_ready(&entry).unwrap();
        graph.try_activate(&a).unwrap();
        assert!(graph.finish_failure(&a, 1));

        assert_eq!(state(&graph, &ab), Init);
        assert_eq!(graph.link_status(&ab).unwrap().counters.failed, 1);
        assert_eq!(graph.neuron_status(&a).unwrap().counters.failed, 1);
        assert!(graph.counts().is_idle());
    }

    #[test]
    fn test_end_neuron_requests_sleep() {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(noop);
        let end = bp.add_end_link_from(&a).unwrap();
        let mut graph = graph_of(&bp);

        graph.mark_ready(&end).unwrap();
        assert_eq!(graph.try_activate(END_NEURON_ID).unwrap(), Activation::EndReached);
    }

    #[test]
    fn test_cast_anyway() {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(noop);
        let b = bp.add_neuron(noop);
        let c = bp.add_neuron(noop);
        let entry = bp.add_entry_link_to(&a).unwrap();
        let ab = bp.add_link(&a, &b).unwrap();
        let ac = bp.add_link(&a, &c).unwrap();
        bp.add_cast_group(&a, "to-b", &[&ab]).unwrap();
        let mut graph = graph_of(&bp);

        graph.mark_ready(&entry).unwrap();
        graph.try_activate(&a).unwrap();

        let first = graph.cast_anyway(&a, "to-b").unwrap();
        assert_eq!(first.ready, vec![ab.clone()]);
        assert!(first.resent.is_empty());
        assert_eq!(state(&graph, &ac), Wait);

        let second = graph.cast_anyway(&a, "to-b").unwrap();
        assert!(second.ready.is_empty());
        assert_eq!(second.resent, vec![ab.clone()]);

        // the processor is still running
        assert!(graph.is_current(&a, 1));
    }

    #[test]
    fn test_mark_ready_is_idempotent() {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(noop);
        let entry = bp.add_entry_link_to(&a).unwrap();
        let mut graph = graph_of(&bp);

        assert!(graph.mark_ready(&entry).unwrap());
        assert!(!graph.mark_ready(&entry).unwrap());
        assert!(graph.mark_ready("missing").is_err());
    }

    #[test]
    fn test_graph_routes_links_to_destinations() {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(noop);
        let b = bp.add_neuron(noop);
        let entry = bp.add_entry_link_to(&a).unwrap();
        let ab = bp.add_link(&a, &b).unwrap();
        let graph = graph_of(&bp);

        assert_eq!(graph.link_destination(&entry), Some(a.as_str()));
        assert_eq!(graph.link_destination(&ab), Some(b.as_str()));
        assert_eq!(graph.link_destination("missing"), None);
        assert_eq!(graph.links.len(), 2);
    }
}
