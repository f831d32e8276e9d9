// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Blueprint: the immutable description of a brain's graph
//!
//! Neurons are connected by directed links. Each neuron owns:
//! - trigger groups: sets of in-links; the neuron qualifies for activation
//!   once every link of any one group is Ready
//! - cast groups: named sets of out-links; after a run the selector picks one
//!   group and only its links carry the signal on
//!
//! Trigger groups are kept minimal: no group may contain another. Every
//! in-link starts out as its own singleton group, and every out-link starts
//! out in [`DEFAULT_CAST_GROUP`].
//!
//! All mutating calls validate first and change nothing on error.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::brain::Brain;
use crate::context::{BrainContext, BrainContextReader};
use crate::error::{BrainError, BrainResult};
use crate::options::BrainOptions;
use crate::processor::{EmptyProcessor, FuncProcessor, FuncSelector, Processor, Selector};

/// Cast group every neuron has; out-links not placed elsewhere live here
pub const DEFAULT_CAST_GROUP: &str = "__DEFAULT_CAST_GROUP__";
/// ID of the End neuron created by the first end link
pub const END_NEURON_ID: &str = "__END_NEURON__";
/// Source of entry links, triggered from outside the brain
pub const ENTRY_SIGNAL: &str = "__EXTERNAL_SIGNAL__";

pub type Labels = BTreeMap<String, String>;

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A neuron as described by the blueprint
#[derive(Clone)]
pub struct NeuronSpec {
    id: String,
    labels: Labels,
    processor: Box<dyn Processor>,
    selector: Option<Box<dyn Selector>>,
    trigger_groups: Vec<BTreeSet<String>>,
    cast_groups: BTreeMap<String, BTreeSet<String>>,
    in_links: BTreeSet<String>,
    out_links: BTreeSet<String>,
}

impl NeuronSpec {
    fn new(
        id: String,
        labels: Labels,
        processor: Box<dyn Processor>,
        selector: Option<Box<dyn Selector>>,
    ) -> Self {
        let mut cast_groups = BTreeMap::new();
        cast_groups.insert(DEFAULT_CAST_GROUP.to_string(), BTreeSet::new());
        Self {
            id,
            labels,
            processor,
            selector,
            trigger_groups: Vec::new(),
            cast_groups,
            in_links: BTreeSet::new(),
            out_links: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn trigger_groups(&self) -> &[BTreeSet<String>] {
        &self.trigger_groups
    }

    pub fn cast_groups(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.cast_groups
    }

    pub fn cast_group(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.cast_groups.get(name)
    }

    pub fn in_links(&self) -> &BTreeSet<String> {
        &self.in_links
    }

    pub fn out_links(&self) -> &BTreeSet<String> {
        &self.out_links
    }

    pub fn has_selector(&self) -> bool {
        self.selector.is_some()
    }

    pub fn is_end(&self) -> bool {
        self.id == END_NEURON_ID
    }

    pub(crate) fn into_parts(self) -> NeuronParts {
        NeuronParts {
            id: self.id,
            labels: self.labels,
            processor: self.processor,
            selector: self.selector,
            trigger_groups: self.trigger_groups,
            cast_groups: self.cast_groups,
        }
    }

    fn in_cast_group(&self, link_id: &str) -> bool {
        self.cast_groups.values().any(|g| g.contains(link_id))
    }

    fn in_trigger_group(&self, link_id: &str) -> bool {
        self.trigger_groups.iter().any(|g| g.contains(link_id))
    }
}

impl fmt::Debug for NeuronSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeuronSpec")
            .field("id", &self.id)
            .field("labels", &self.labels)
            .field("trigger_groups", &self.trigger_groups)
            .field("cast_groups", &self.cast_groups)
            .field("has_selector", &self.selector.is_some())
            .finish()
    }
}

/// A neuron taken apart for building runtime records
pub(crate) struct NeuronParts {
    pub id: String,
    pub labels: Labels,
    pub processor: Box<dyn Processor>,
    pub selector: Option<Box<dyn Selector>>,
    pub trigger_groups: Vec<BTreeSet<String>>,
    pub cast_groups: BTreeMap<String, BTreeSet<String>>,
}

/// A directed link between two neurons (or from outside / to the End)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkSpec {
    id: String,
    labels: Labels,
    src: String,
    dest: String,
}

impl LinkSpec {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Source neuron ID, or [`ENTRY_SIGNAL`] for entry links
    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn dest(&self) -> &str {
        &self.dest
    }

    pub fn is_entry(&self) -> bool {
        self.src == ENTRY_SIGNAL
    }

    pub fn is_end(&self) -> bool {
        self.dest == END_NEURON_ID
    }
}

/// Optional settings for [`Blueprint::add_neuron_with`]
#[derive(Default)]
pub struct NeuronOptions {
    id: Option<String>,
    labels: Labels,
    selector: Option<Box<dyn Selector>>,
}

impl NeuronOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_selector(mut self, selector: impl Selector + 'static) -> Self {
        self.selector = Some(Box::new(selector));
        self
    }
}

/// Optional settings for [`Blueprint::add_link_with`]
#[derive(Debug, Clone, Default)]
pub struct LinkOptions {
    id: Option<String>,
    labels: Labels,
}

impl LinkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

#[derive(Clone, Copy)]
enum Direction {
    In,
    Out,
}

/// Graph description from which brains are built
///
/// Building deep-copies the blueprint, so editing it afterwards does not
/// affect brains already built.
#[derive(Clone)]
pub struct Blueprint {
    id: String,
    labels: Labels,
    neurons: BTreeMap<String, NeuronSpec>,
    links: BTreeMap<String, LinkSpec>,
}

impl Default for Blueprint {
    fn default() -> Self {
        Self::new()
    }
}

impl Blueprint {
    pub fn new() -> Self {
        Self {
            id: new_id(),
            labels: Labels::new(),
            neurons: BTreeMap::new(),
            links: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Labels are inherited by every brain built from this blueprint.
    pub fn set_labels(&mut self, labels: Labels) {
        self.labels = labels;
    }

    // ---------------------------------------------------------------------
    // Neurons
    // ---------------------------------------------------------------------

    /// Add a neuron running `process_fn`; returns its generated ID.
    pub fn add_neuron<F>(&mut self, process_fn: F) -> String
    where
        F: Fn(&BrainContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = new_id();
        let spec = NeuronSpec::new(
            id.clone(),
            Labels::new(),
            Box::new(FuncProcessor::new(process_fn)),
            None,
        );
        self.neurons.insert(id.clone(), spec);
        id
    }

    /// Add a neuron with an explicit processor and options.
    ///
    /// Fails with `InvalidTopology` if the requested ID is taken or reserved.
    pub fn add_neuron_with(
        &mut self,
        processor: impl Processor + 'static,
        options: NeuronOptions,
    ) -> BrainResult<String> {
        let id = options.id.unwrap_or_else(new_id);
        if id == END_NEURON_ID || id == ENTRY_SIGNAL {
            return Err(BrainError::InvalidTopology(format!(
                "neuron id '{}' is reserved",
                id
            )));
        }
        if self.neurons.contains_key(&id) {
            return Err(BrainError::InvalidTopology(format!(
                "neuron '{}' already exists",
                id
            )));
        }

        let spec = NeuronSpec::new(id.clone(), options.labels, Box::new(processor), options.selector);
        self.neurons.insert(id.clone(), spec);
        Ok(id)
    }

    pub fn neuron(&self, id: &str) -> Option<&NeuronSpec> {
        self.neurons.get(id)
    }

    pub fn has_neuron(&self, id: &str) -> bool {
        self.neurons.contains_key(id)
    }

    pub fn neurons(&self) -> impl Iterator<Item = &NeuronSpec> {
        self.neurons.values()
    }

    pub fn end_neuron_id(&self) -> Option<&str> {
        self.neurons.get(END_NEURON_ID).map(|n| n.id.as_str())
    }

    // ---------------------------------------------------------------------
    // Links
    // ---------------------------------------------------------------------

    pub fn add_link(&mut self, src: &str, dest: &str) -> BrainResult<String> {
        self.add_link_with(src, dest, LinkOptions::default())
    }

    pub fn add_link_with(&mut self, src: &str, dest: &str, options: LinkOptions) -> BrainResult<String> {
        if src == END_NEURON_ID {
            return Err(BrainError::InvalidTopology(
                "the end neuron cannot have out-links".to_string(),
            ));
        }
        if src != ENTRY_SIGNAL && !self.neurons.contains_key(src) {
            return Err(BrainError::not_found("neuron", src));
        }
        if !self.neurons.contains_key(dest) {
            return Err(BrainError::not_found("neuron", dest));
        }
        let id = options.id.unwrap_or_else(new_id);
        if self.links.contains_key(&id) {
            return Err(BrainError::InvalidTopology(format!(
                "link '{}' already exists",
                id
            )));
        }

        if let Some(source) = self.neurons.get_mut(src) {
            source.out_links.insert(id.clone());
            if let Some(default) = source.cast_groups.get_mut(DEFAULT_CAST_GROUP) {
                default.insert(id.clone());
            }
        }
        if let Some(destination) = self.neurons.get_mut(dest) {
            destination.in_links.insert(id.clone());
            destination.trigger_groups.push(BTreeSet::from([id.clone()]));
        }

        self.links.insert(
            id.clone(),
            LinkSpec {
                id: id.clone(),
                labels: options.labels,
                src: src.to_string(),
                dest: dest.to_string(),
            },
        );
        Ok(id)
    }

    /// Add a link triggered from outside the brain (see [`Brain::entry`]).
    pub fn add_entry_link_to(&mut self, dest: &str) -> BrainResult<String> {
        self.add_link(ENTRY_SIGNAL, dest)
    }

    /// Add a link to the End neuron, creating the End neuron on first use.
    ///
    /// A signal reaching the End neuron puts the whole brain to sleep.
    pub fn add_end_link_from(&mut self, src: &str) -> BrainResult<String> {
        if !self.neurons.contains_key(src) {
            return Err(BrainError::not_found("neuron", src));
        }
        if !self.neurons.contains_key(END_NEURON_ID) {
            let end = NeuronSpec::new(
                END_NEURON_ID.to_string(),
                Labels::new(),
                Box::new(EmptyProcessor),
                None,
            );
            self.neurons.insert(END_NEURON_ID.to_string(), end);
        }
        self.add_link(src, END_NEURON_ID)
    }

    pub fn link(&self, id: &str) -> Option<&LinkSpec> {
        self.links.get(id)
    }

    pub fn has_link(&self, id: &str) -> bool {
        self.links.contains_key(id)
    }

    pub fn links(&self) -> impl Iterator<Item = &LinkSpec> {
        self.links.values()
    }

    pub fn entry_links(&self) -> Vec<&LinkSpec> {
        self.links.values().filter(|l| l.is_entry()).collect()
    }

    pub fn end_links(&self) -> Vec<&LinkSpec> {
        self.links.values().filter(|l| l.is_end()).collect()
    }

    pub fn in_links(&self, neuron_id: &str) -> BrainResult<Vec<&LinkSpec>> {
        let neuron = self.require_neuron(neuron_id)?;
        Ok(neuron.in_links.iter().filter_map(|id| self.links.get(id)).collect())
    }

    pub fn out_links(&self, neuron_id: &str) -> BrainResult<Vec<&LinkSpec>> {
        let neuron = self.require_neuron(neuron_id)?;
        Ok(neuron.out_links.iter().filter_map(|id| self.links.get(id)).collect())
    }

    /// `None` for entry links
    pub fn source_neuron(&self, link_id: &str) -> BrainResult<Option<&NeuronSpec>> {
        let link = self.require_link(link_id)?;
        Ok(self.neurons.get(&link.src))
    }

    pub fn destination_neuron(&self, link_id: &str) -> BrainResult<&NeuronSpec> {
        let link = self.require_link(link_id)?;
        self.require_neuron(&link.dest)
    }

    // ---------------------------------------------------------------------
    // Trigger groups
    // ---------------------------------------------------------------------

    /// Make `link_ids` fire the neuron only together.
    ///
    /// Rejected if an existing group already contains the new one; existing
    /// groups contained in the new one are dropped.
    pub fn add_trigger_group<S: AsRef<str>>(&mut self, neuron_id: &str, link_ids: &[S]) -> BrainResult<()> {
        let group = self.incident_links(neuron_id, link_ids, Direction::In)?;
        if group.is_empty() {
            return Err(BrainError::InvalidTopology(
                "trigger group needs at least one link".to_string(),
            ));
        }

        let neuron = self.require_neuron_mut(neuron_id)?;
        if let Some(existing) = neuron.trigger_groups.iter().find(|g| group.is_subset(g)) {
            return Err(BrainError::InvalidTopology(format!(
                "trigger group {:?} is already covered by {:?}",
                group, existing
            )));
        }
        neuron.trigger_groups.retain(|g| !g.is_subset(&group));
        neuron.trigger_groups.push(group);
        Ok(())
    }

    /// Remove the trigger group made of exactly `link_ids`.
    ///
    /// In-links left in no group become singleton groups again.
    pub fn delete_trigger_group<S: AsRef<str>>(&mut self, neuron_id: &str, link_ids: &[S]) -> BrainResult<()> {
        let group = self.incident_links(neuron_id, link_ids, Direction::In)?;

        let neuron = self.require_neuron_mut(neuron_id)?;
        neuron.trigger_groups.retain(|g| *g != group);

        let orphans: Vec<String> = neuron
            .in_links
            .iter()
            .filter(|id| !neuron.in_trigger_group(id))
            .cloned()
            .collect();
        for orphan in orphans {
            neuron.trigger_groups.push(BTreeSet::from([orphan]));
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Cast groups
    // ---------------------------------------------------------------------

    /// Put out-links into the cast group `name`, creating it if needed.
    ///
    /// The links leave the default group but stay in any other named group.
    pub fn add_cast_group<S: AsRef<str>>(&mut self, neuron_id: &str, name: &str, link_ids: &[S]) -> BrainResult<()> {
        if name.is_empty() {
            return Err(BrainError::InvalidTopology(
                "cast group name must not be empty".to_string(),
            ));
        }
        let links = self.incident_links(neuron_id, link_ids, Direction::Out)?;

        let neuron = self.require_neuron_mut(neuron_id)?;
        if name != DEFAULT_CAST_GROUP {
            if let Some(default) = neuron.cast_groups.get_mut(DEFAULT_CAST_GROUP) {
                default.retain(|id| !links.contains(id));
            }
        }
        neuron
            .cast_groups
            .entry(name.to_string())
            .or_default()
            .extend(links);
        Ok(())
    }

    /// Remove a named cast group; its links that belong nowhere else go back
    /// to the default group. The default group itself cannot be deleted.
    pub fn delete_cast_group(&mut self, neuron_id: &str, name: &str) -> BrainResult<()> {
        if name == DEFAULT_CAST_GROUP {
            return Err(BrainError::InvalidTopology(
                "the default cast group cannot be deleted".to_string(),
            ));
        }
        let neuron = self.require_neuron_mut(neuron_id)?;
        let removed = neuron
            .cast_groups
            .remove(name)
            .ok_or_else(|| BrainError::not_found("cast group", name))?;

        let orphans: Vec<String> = removed
            .into_iter()
            .filter(|id| !neuron.in_cast_group(id))
            .collect();
        neuron
            .cast_groups
            .entry(DEFAULT_CAST_GROUP.to_string())
            .or_default()
            .extend(orphans);
        Ok(())
    }

    pub fn bind_selector(&mut self, neuron_id: &str, selector: impl Selector + 'static) -> BrainResult<()> {
        let neuron = self.require_neuron_mut(neuron_id)?;
        neuron.selector = Some(Box::new(selector));
        Ok(())
    }

    /// Bind a closure as the neuron's selector
    pub fn bind_select_fn<F>(&mut self, neuron_id: &str, select_fn: F) -> BrainResult<()>
    where
        F: Fn(&dyn BrainContextReader) -> String + Send + Sync + 'static,
    {
        self.bind_selector(neuron_id, FuncSelector::new(select_fn))
    }

    // ---------------------------------------------------------------------
    // Build
    // ---------------------------------------------------------------------

    /// Build a brain with the default configuration
    pub fn build(&self) -> BrainResult<Brain> {
        self.build_with(BrainOptions::default())
    }

    pub fn build_with(&self, options: BrainOptions) -> BrainResult<Brain> {
        Brain::from_blueprint(self.clone(), options)
    }

    pub(crate) fn into_parts(self) -> (Labels, Vec<NeuronSpec>, Vec<LinkSpec>) {
        (
            self.labels,
            self.neurons.into_values().collect(),
            self.links.into_values().collect(),
        )
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn require_neuron(&self, id: &str) -> BrainResult<&NeuronSpec> {
        self.neurons
            .get(id)
            .ok_or_else(|| BrainError::not_found("neuron", id))
    }

    fn require_neuron_mut(&mut self, id: &str) -> BrainResult<&mut NeuronSpec> {
        self.neurons
            .get_mut(id)
            .ok_or_else(|| BrainError::not_found("neuron", id))
    }

    fn require_link(&self, id: &str) -> BrainResult<&LinkSpec> {
        self.links
            .get(id)
            .ok_or_else(|| BrainError::not_found("link", id))
    }

    /// Resolve link IDs, checking each one enters (or leaves) the neuron.
    fn incident_links<S: AsRef<str>>(
        &self,
        neuron_id: &str,
        link_ids: &[S],
        direction: Direction,
    ) -> BrainResult<BTreeSet<String>> {
        self.require_neuron(neuron_id)?;

        let mut resolved = BTreeSet::new();
        for link_id in link_ids {
            let link = self.require_link(link_id.as_ref())?;
            let incident = match direction {
                Direction::In => link.dest == neuron_id,
                Direction::Out => link.src == neuron_id,
            };
            if !incident {
                let role = match direction {
                    Direction::In => "into",
                    Direction::Out => "out of",
                };
                return Err(BrainError::InvalidTopology(format!(
                    "link '{}' does not lead {} neuron '{}'",
                    link.id, role, neuron_id
                )));
            }
            resolved.insert(link.id.clone());
        }
        Ok(resolved)
    }
}

impl fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("id", &self.id)
            .field("labels", &self.labels)
            .field("neurons", &self.neurons.values().collect::<Vec<_>>())
            .field("links", &self.links.values().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_ctx: &BrainContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    /// a -> n via links "A", "B" and "C"
    fn fan_in() -> (Blueprint, String) {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(noop);
        let n = bp.add_neuron(noop);
        for id in ["A", "B", "C"] {
            bp.add_link_with(&a, &n, LinkOptions::new().with_id(id)).unwrap();
        }
        (bp, n)
    }

    #[test]
    fn test_links_start_as_singleton_groups() {
        let (bp, n) = fan_in();
        let groups = bp.neuron(&n).unwrap().trigger_groups();
        assert_eq!(groups.len(), 3);
        for id in ["A", "B", "C"] {
            assert!(groups.contains(&set(&[id])));
        }
    }

    #[test]
    fn test_superset_group_replaces_subsets() {
        let (mut bp, n) = fan_in();
        bp.add_trigger_group(&n, &["A", "B"]).unwrap();

        let groups = bp.neuron(&n).unwrap().trigger_groups();
        assert_eq!(groups.len(), 2);
        assert!(groups.contains(&set(&["A", "B"])));
        assert!(groups.contains(&set(&["C"])));

        bp.add_trigger_group(&n, &["A", "B", "C"]).unwrap();
        assert_eq!(bp.neuron(&n).unwrap().trigger_groups(), [set(&["A", "B", "C"])]);
    }

    #[test]
    fn test_subset_or_equal_group_rejected() {
        let (mut bp, n) = fan_in();
        bp.add_trigger_group(&n, &["A", "B"]).unwrap();

        let equal = bp.add_trigger_group(&n, &["B", "A"]);
        assert!(matches!(equal, Err(BrainError::InvalidTopology(_))));

        let subset = bp.add_trigger_group(&n, &["A"]);
        assert!(matches!(subset, Err(BrainError::InvalidTopology(_))));
        assert_eq!(bp.neuron(&n).unwrap().trigger_groups().len(), 2);
    }

    #[test]
    fn test_trigger_group_needs_in_links() {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(noop);
        let b = bp.add_neuron(noop);
        let ab = bp.add_link(&a, &b).unwrap();
        let before = bp.neuron(&a).unwrap().trigger_groups().to_vec();

        assert!(matches!(
            bp.add_trigger_group(&a, &[&ab]),
            Err(BrainError::InvalidTopology(_))
        ));
        assert!(matches!(
            bp.add_trigger_group(&b, &["missing"]),
            Err(BrainError::NotFound { kind: "link", .. })
        ));
        assert!(matches!(
            bp.add_trigger_group("missing", &[&ab]),
            Err(BrainError::NotFound { kind: "neuron", .. })
        ));
        assert_eq!(bp.neuron(&a).unwrap().trigger_groups(), before.as_slice());
    }

    #[test]
    fn test_delete_trigger_group_restores_singletons() {
        let (mut bp, n) = fan_in();
        bp.add_trigger_group(&n, &["A", "B"]).unwrap();
        bp.delete_trigger_group(&n, &["A", "B"]).unwrap();

        let groups = bp.neuron(&n).unwrap().trigger_groups();
        assert_eq!(groups.len(), 3);
        for id in ["A", "B", "C"] {
            assert!(groups.contains(&set(&[id])));
        }
    }

    #[test]
    fn test_out_links_join_default_cast_group() {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(noop);
        let b = bp.add_neuron(noop);
        let c = bp.add_neuron(noop);
        let ab = bp.add_link(&a, &b).unwrap();
        let ac = bp.add_link(&a, &c).unwrap();

        let neuron = bp.neuron(&a).unwrap();
        assert_eq!(neuron.cast_group(DEFAULT_CAST_GROUP), Some(&set(&[&ab, &ac])));
        assert_eq!(neuron.out_links(), &set(&[&ab, &ac]));
        assert_eq!(bp.out_links(&a).unwrap().len(), 2);
        assert_eq!(bp.in_links(&b).unwrap()[0].id(), ab);
    }

    #[test]
    fn test_named_cast_groups_overlap_but_leave_default() {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(noop);
        let b = bp.add_neuron(noop);
        let c = bp.add_neuron(noop);
        let d = bp.add_neuron(noop);
        let ab = bp.add_link(&a, &b).unwrap();
        let ac = bp.add_link(&a, &c).unwrap();
        let ad = bp.add_link(&a, &d).unwrap();

        bp.add_cast_group(&a, "x", &[&ab, &ac]).unwrap();
        bp.add_cast_group(&a, "y", &[&ac]).unwrap();

        let neuron = bp.neuron(&a).unwrap();
        assert_eq!(neuron.cast_group("x"), Some(&set(&[&ab, &ac])));
        assert_eq!(neuron.cast_group("y"), Some(&set(&[&ac])));
        assert_eq!(neuron.cast_group(DEFAULT_CAST_GROUP), Some(&set(&[&ad])));

        // deleting "x" orphans ab only; ac is still in "y"
        bp.delete_cast_group(&a, "x").unwrap();
        let neuron = bp.neuron(&a).unwrap();
        assert!(neuron.cast_group("x").is_none());
        assert_eq!(neuron.cast_group(DEFAULT_CAST_GROUP), Some(&set(&[&ab, &ad])));
    }

    #[test]
    fn test_cast_group_errors_leave_blueprint_unchanged() {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(noop);
        let b = bp.add_neuron(noop);
        let ab = bp.add_link(&a, &b).unwrap();

        assert!(matches!(
            bp.add_cast_group(&b, "x", &[&ab]),
            Err(BrainError::InvalidTopology(_))
        ));
        assert!(matches!(
            bp.delete_cast_group(&a, DEFAULT_CAST_GROUP),
            Err(BrainError::InvalidTopology(_))
        ));
        assert!(matches!(
            bp.delete_cast_group(&a, "nope"),
            Err(BrainError::NotFound { kind: "cast group", .. })
        ));
        assert_eq!(
            bp.neuron(&a).unwrap().cast_group(DEFAULT_CAST_GROUP),
            Some(&set(&[&ab]))
        );
        assert!(bp.neuron(&b).unwrap().cast_group("x").is_none());
    }

    #[test]
    fn test_entry_and_end_links() {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(noop);
        let entry = bp.add_entry_link_to(&a).unwrap();
        let end1 = bp.add_end_link_from(&a).unwrap();
        let end2 = bp.add_end_link_from(&a).unwrap();

        assert_eq!(bp.end_neuron_id(), Some(END_NEURON_ID));
        assert_eq!(bp.neurons().filter(|n| n.is_end()).count(), 1);
        assert_eq!(bp.entry_links().len(), 1);
        assert_eq!(bp.end_links().len(), 2);
        assert!(bp.source_neuron(&entry).unwrap().is_none());
        assert!(bp.destination_neuron(&end1).unwrap().is_end());
        assert_eq!(bp.link(&end2).unwrap().src(), a);

        assert!(matches!(
            bp.add_link(END_NEURON_ID, &a),
            Err(BrainError::InvalidTopology(_))
        ));
        assert!(matches!(
            bp.add_entry_link_to("missing"),
            Err(BrainError::NotFound { .. })
        ));
    }

    #[test]
    fn test_explicit_ids_must_be_unique() {
        let mut bp = Blueprint::new();
        bp.add_neuron_with(EmptyProcessor, NeuronOptions::new().with_id("a"))
            .unwrap();
        bp.add_neuron_with(EmptyProcessor, NeuronOptions::new().with_id("b").with_label("role", "sink"))
            .unwrap();

        assert!(bp
            .add_neuron_with(EmptyProcessor, NeuronOptions::new().with_id("a"))
            .is_err());
        assert!(bp
            .add_neuron_with(EmptyProcessor, NeuronOptions::new().with_id(END_NEURON_ID))
            .is_err());

        bp.add_link_with("a", "b", LinkOptions::new().with_id("ab")).unwrap();
        assert!(bp.add_link_with("a", "b", LinkOptions::new().with_id("ab")).is_err());
        assert_eq!(bp.neuron("b").unwrap().labels().get("role").map(String::as_str), Some("sink"));
        assert!(bp.has_link("ab"));
    }

    #[test]
    fn test_clone_is_independent() {
        let (mut bp, n) = fan_in();
        let copy = bp.clone();
        bp.add_trigger_group(&n, &["A", "B"]).unwrap();
        bp.bind_select_fn(&n, |_| "x".to_string()).unwrap();

        assert_eq!(copy.neuron(&n).unwrap().trigger_groups().len(), 3);
        assert!(!copy.neuron(&n).unwrap().has_selector());
        assert!(bp.neuron(&n).unwrap().has_selector());
        assert_eq!(copy.id(), bp.id());
    }
}
