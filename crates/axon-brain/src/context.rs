// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The handle a running processor gets
//!
//! A [`BrainContext`] lives exactly as long as one activation of one neuron
//! and is only used from the worker running it.

use crossbeam::channel::Sender;

use axon_memory::MemoryValue;

use crate::blueprint::Labels;
use crate::brain::BrainShared;
use crate::error::{BrainError, BrainResult};
use crate::event::{CastMode, ControlMessage, EventAction, MaintainEvent};
use crate::processor::{DefaultSelector, Selector};

/// Read-only view handed to selectors
pub trait BrainContextReader {
    fn get_memory(&self, key: &str) -> Option<MemoryValue>;
    fn exist_memory(&self, key: &str) -> bool;
    fn current_neuron_id(&self) -> &str;
    fn current_neuron_labels(&self) -> &Labels;
    fn brain_id(&self) -> &str;
    fn brain_labels(&self) -> &Labels;
}

/// Memory and identity of one neuron inside its brain
#[derive(Clone, Copy)]
pub(crate) struct NeuronView<'a> {
    shared: &'a BrainShared,
    neuron_id: &'a str,
    labels: &'a Labels,
}

impl<'a> NeuronView<'a> {
    pub(crate) fn new(shared: &'a BrainShared, neuron_id: &'a str, labels: &'a Labels) -> Self {
        Self {
            shared,
            neuron_id,
            labels,
        }
    }
}

impl BrainContextReader for NeuronView<'_> {
    fn get_memory(&self, key: &str) -> Option<MemoryValue> {
        self.shared.memory()?.get(key)
    }

    fn exist_memory(&self, key: &str) -> bool {
        self.shared.memory().map_or(false, |m| m.exists(key))
    }

    fn current_neuron_id(&self) -> &str {
        self.neuron_id
    }

    fn current_neuron_labels(&self) -> &Labels {
        self.labels
    }

    fn brain_id(&self) -> &str {
        &self.shared.id
    }

    fn brain_labels(&self) -> &Labels {
        &self.shared.labels
    }
}

/// Run `selector`, or [`DefaultSelector`] for neurons without one
pub(crate) fn select_cast_group(selector: Option<&dyn Selector>, reader: &dyn BrainContextReader) -> String {
    selector.unwrap_or(&DefaultSelector).select(reader)
}

pub struct BrainContext<'a> {
    shared: &'a BrainShared,
    view: NeuronView<'a>,
    generation: u64,
    control: &'a Sender<ControlMessage>,
    selector: Option<&'a dyn Selector>,
}

impl<'a> BrainContext<'a> {
    pub(crate) fn new(
        shared: &'a BrainShared,
        neuron_id: &'a str,
        labels: &'a Labels,
        generation: u64,
        control: &'a Sender<ControlMessage>,
        selector: Option<&'a dyn Selector>,
    ) -> Self {
        Self {
            shared,
            view: NeuronView::new(shared, neuron_id, labels),
            generation,
            control,
            selector,
        }
    }

    /// Store a value; the brain memory is created on first use.
    pub fn set_memory(&self, key: &str, value: impl Into<MemoryValue>) -> BrainResult<()> {
        self.shared.ensure_memory()?.set(key, value.into())?;
        Ok(())
    }

    pub fn delete_memory(&self, key: &str) -> BrainResult<()> {
        if let Some(memory) = self.shared.memory() {
            memory.delete(key)?;
        }
        Ok(())
    }

    pub fn clear_memory(&self) -> BrainResult<()> {
        if let Some(memory) = self.shared.memory() {
            memory.clear()?;
        }
        Ok(())
    }

    /// Ask for a cast decision now, while the processor keeps running.
    ///
    /// The selector is consulted immediately. Links of the selected group
    /// become Ready; those already Ready are signalled again with backoff
    /// until their destination picks them up.
    pub fn continue_cast(&self) -> BrainResult<()> {
        let group = self.select_group();
        let neuron_id = self.view.neuron_id;
        tracing::debug!(neuron_id = %neuron_id, group = %group, "continue cast");

        let event = MaintainEvent::neuron(
            neuron_id,
            EventAction::NeuronCastAnyway {
                generation: self.generation,
                mode: CastMode::Anyway { group },
            },
        );
        self.control
            .send(ControlMessage::Event(event))
            .map_err(|_| BrainError::Maintainer("control loop has stopped".to_string()))
    }

    pub(crate) fn select_group(&self) -> String {
        select_cast_group(self.selector, &self.view)
    }
}

impl BrainContextReader for BrainContext<'_> {
    fn get_memory(&self, key: &str) -> Option<MemoryValue> {
        self.view.get_memory(key)
    }

    fn exist_memory(&self, key: &str) -> bool {
        self.view.exist_memory(key)
    }

    fn current_neuron_id(&self) -> &str {
        self.view.neuron_id
    }

    fn current_neuron_labels(&self) -> &Labels {
        self.view.labels
    }

    fn brain_id(&self) -> &str {
        self.view.brain_id()
    }

    fn brain_labels(&self) -> &Labels {
        self.view.brain_labels()
    }
}
