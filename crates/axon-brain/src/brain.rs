// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Built, runnable brain.

A [`Brain`] owns an immutable copy of its blueprint's topology, the runtime
records of every link and neuron, and (lazily) a memory store. Its maintainer
threads start on the first trig and stop on [`Brain::shutdown`] or on drop.

```text
Shutdown --trig--> Sleeping --events--> Running --idle / End--> Sleeping
    ^                                                              |
    +------------------------- shutdown ---------------------------+
```
*/

use ahash::AHashMap;
use crossbeam::channel;
use parking_lot::{Condvar, Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use axon_config::{validate_config, AxonConfig};
use axon_memory::{open_store, MemoryFactory, MemoryStore, MemoryValue};

use crate::blueprint::{Blueprint, Labels, NeuronParts, NeuronSpec};
use crate::error::{BrainError, BrainResult};
use crate::event::ControlMessage;
use crate::maintainer::Maintainer;
use crate::options::BrainOptions;
use crate::processor::{Processor, Selector};
use crate::records::{BrainState, Graph, LinkStatus, NeuronStatus, StateCounts};

/// Per-neuron runtime pieces used by workers
pub(crate) struct NeuronSlot {
    pub labels: Labels,
    /// Locked for the whole run: one activation of a neuron at a time
    pub processor: Mutex<Box<dyn Processor>>,
    pub selector: Option<Box<dyn Selector>>,
}

/// State shared between the [`Brain`] handle and its maintainer threads
pub(crate) struct BrainShared {
    pub id: String,
    pub labels: Labels,
    pub config: AxonConfig,
    pub graph: Mutex<Graph>,
    pub slots: AHashMap<String, NeuronSlot>,
    pub maintainer: Mutex<Option<Maintainer>>,
    entry_links: Vec<String>,
    state: Mutex<BrainState>,
    state_changed: Condvar,
    memory: RwLock<Option<Arc<dyn MemoryStore>>>,
    memory_factory: MemoryFactory,
    next_epoch: AtomicU64,
}

impl BrainShared {
    pub fn state(&self) -> BrainState {
        *self.state.lock()
    }

    /// Update the state and wake every waiter if it changed.
    pub fn set_state(&self, next: BrainState) {
        let mut state = self.state.lock();
        let previous = *state;
        if previous != next {
            info!(brain_id = %self.id, from = %previous, to = %next, "brain state changed");
            *state = next;
            self.state_changed.notify_all();
        }
    }

    pub fn memory(&self) -> Option<Arc<dyn MemoryStore>> {
        self.memory.read().clone()
    }

    /// The memory store, created on first use
    pub fn ensure_memory(&self) -> BrainResult<Arc<dyn MemoryStore>> {
        if let Some(memory) = self.memory() {
            return Ok(memory);
        }
        let mut slot = self.memory.write();
        if let Some(memory) = slot.as_ref() {
            return Ok(Arc::clone(memory));
        }
        let memory = (self.memory_factory)(&self.id)?;
        *slot = Some(Arc::clone(&memory));
        Ok(memory)
    }

    pub fn close_memory(&self) {
        let Some(memory) = self.memory.write().take() else {
            return;
        };
        if let Err(err) = memory.close() {
            warn!(brain_id = %self.id, error = %err, "failed to close memory store");
        }
    }
}

/// A runnable brain built from a [`Blueprint`]
///
/// Dropping the handle shuts the brain down.
pub struct Brain {
    inner: Arc<BrainShared>,
}

impl Brain {
    pub(crate) fn from_blueprint(blueprint: Blueprint, options: BrainOptions) -> BrainResult<Self> {
        let BrainOptions {
            config,
            id,
            memory_factory,
        } = options;
        validate_config(&config)?;

        let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let memory_factory: MemoryFactory = match memory_factory {
            Some(factory) => factory,
            None => {
                let memory_config = config.memory.clone();
                Arc::new(move |brain_id: &str| open_store(&memory_config, brain_id))
            }
        };

        let (labels, neurons, links) = blueprint.into_parts();
        let parts: Vec<NeuronParts> = neurons.into_iter().map(NeuronSpec::into_parts).collect();
        let graph = Graph::new(&parts, &links);
        let mut entry_links: Vec<String> = links
            .iter()
            .filter(|l| l.is_entry())
            .map(|l| l.id().to_string())
            .collect();
        entry_links.sort();

        let slots: AHashMap<String, NeuronSlot> = parts
            .into_iter()
            .map(|p| {
                let slot = NeuronSlot {
                    labels: p.labels,
                    processor: Mutex::new(p.processor),
                    selector: p.selector,
                };
                (p.id, slot)
            })
            .collect();

        info!(
            brain_id = %id,
            neurons = slots.len(),
            links = links.len(),
            entry_links = entry_links.len(),
            "brain built"
        );

        Ok(Self {
            inner: Arc::new(BrainShared {
                id,
                labels,
                config,
                graph: Mutex::new(graph),
                slots,
                maintainer: Mutex::new(None),
                entry_links,
                state: Mutex::new(BrainState::Shutdown),
                state_changed: Condvar::new(),
                memory: RwLock::new(None),
                memory_factory,
                next_epoch: AtomicU64::new(1),
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn labels(&self) -> &Labels {
        &self.inner.labels
    }

    pub fn state(&self) -> BrainState {
        self.inner.state()
    }

    // ---------------------------------------------------------------------
    // Triggering
    // ---------------------------------------------------------------------

    /// Trigger every entry link.
    pub fn entry(&self) -> BrainResult<()> {
        self.entry_with_memory(std::iter::empty::<(&str, MemoryValue)>())
    }

    /// Store `memories`, then trigger every entry link.
    ///
    /// The values are written into the same memory the triggered run sees,
    /// even when the brain is releasing itself after sleep.
    pub fn entry_with_memory<I, K, V>(&self, memories: I) -> BrainResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<MemoryValue>,
    {
        if self.inner.entry_links.is_empty() {
            return Err(BrainError::InvalidTopology("brain has no entry link".to_string()));
        }
        let memories = memories
            .into_iter()
            .map(|(key, value)| (key.as_ref().to_string(), value.into()))
            .collect();
        self.trig(self.inner.entry_links.clone(), memories)
    }

    /// Mark links Ready and let activation propagate.
    ///
    /// Starts the maintainer if needed and returns once the links have been
    /// marked; use [`Brain::wait`] for the run to finish. Unknown link IDs
    /// fail before anything is marked. Links that are already Ready stay
    /// Ready and produce no extra activation.
    pub fn trig_links<S: AsRef<str>>(&self, link_ids: &[S]) -> BrainResult<()> {
        let link_ids: Vec<String> = link_ids.iter().map(|s| s.as_ref().to_string()).collect();
        {
            let graph = self.inner.graph.lock();
            if let Some(missing) = link_ids.iter().find(|id| !graph.links.contains_key(id.as_str())) {
                return Err(BrainError::not_found("link", missing.as_str()));
            }
        }
        if link_ids.is_empty() {
            return Ok(());
        }
        self.trig(link_ids, Vec::new())
    }

    /// Memory setup and the trig request happen under the maintainer slot
    /// lock, which a teardown after sleep also holds while closing memory.
    fn trig(&self, link_ids: Vec<String>, memories: Vec<(String, MemoryValue)>) -> BrainResult<()> {
        let (done_tx, done_rx) = channel::bounded(1);
        {
            let mut slot = self.inner.maintainer.lock();
            if slot.is_none() {
                let epoch = self.inner.next_epoch.fetch_add(1, Ordering::Relaxed);
                let maintainer = Maintainer::start(&self.inner, epoch)?;
                *slot = Some(maintainer);
                self.inner.set_state(BrainState::Sleeping);
            }
            let memory = self.inner.ensure_memory()?;
            for (key, value) in memories {
                memory.set(&key, value)?;
            }

            let message = ControlMessage::Trig {
                link_ids,
                done: done_tx,
            };
            match slot.as_ref() {
                Some(maintainer) => maintainer.send(message)?,
                None => return Err(BrainError::Maintainer("maintainer not running".to_string())),
            }
        }

        done_rx
            .recv()
            .map_err(|_| BrainError::Maintainer("control loop stopped before marking links".to_string()))
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Block until the brain is no longer Running.
    pub fn wait(&self) {
        let mut state = self.inner.state.lock();
        while *state == BrainState::Running {
            self.inner.state_changed.wait(&mut state);
        }
    }

    /// Like [`Brain::wait`], giving up after `timeout`. `true` if not Running.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        while *state == BrainState::Running {
            if self.inner.state_changed.wait_until(&mut state, deadline).timed_out() {
                return *state != BrainState::Running;
            }
        }
        true
    }

    /// Stop the maintainer, close memory and reset every record.
    ///
    /// Running processors finish first. The brain can be triggered again
    /// afterwards with a fresh memory store. Counters are kept.
    pub fn shutdown(&self) {
        let maintainer = self.inner.maintainer.lock().take();
        if let Some(maintainer) = maintainer {
            maintainer.stop();
        }
        self.inner.graph.lock().reset();
        self.inner.close_memory();
        self.inner.set_state(BrainState::Shutdown);
    }

    // ---------------------------------------------------------------------
    // Memory
    // ---------------------------------------------------------------------

    pub fn set_memory(&self, key: &str, value: impl Into<MemoryValue>) -> BrainResult<()> {
        self.inner.ensure_memory()?.set(key, value.into())?;
        Ok(())
    }

    pub fn set_memories<I, K, V>(&self, memories: I) -> BrainResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<MemoryValue>,
    {
        let memory = self.inner.ensure_memory()?;
        for (key, value) in memories {
            memory.set(key.as_ref(), value.into())?;
        }
        Ok(())
    }

    pub fn get_memory(&self, key: &str) -> Option<MemoryValue> {
        self.inner.memory()?.get(key)
    }

    pub fn exist_memory(&self, key: &str) -> bool {
        self.inner.memory().map_or(false, |m| m.exists(key))
    }

    pub fn delete_memory(&self, key: &str) -> BrainResult<()> {
        if let Some(memory) = self.inner.memory() {
            memory.delete(key)?;
        }
        Ok(())
    }

    pub fn clear_memory(&self) -> BrainResult<()> {
        if let Some(memory) = self.inner.memory() {
            memory.clear()?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    pub fn neuron_status(&self, neuron_id: &str) -> Option<NeuronStatus> {
        self.inner.graph.lock().neuron_status(neuron_id)
    }

    pub fn link_status(&self, link_id: &str) -> Option<LinkStatus> {
        self.inner.graph.lock().link_status(link_id)
    }

    pub fn counts(&self) -> StateCounts {
        self.inner.graph.lock().counts()
    }
}

impl Drop for Brain {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Brain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Brain")
            .field("id", &self.inner.id)
            .field("labels", &self.inner.labels)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BrainContext;
    use crate::records::{LinkState, NeuronState};

    fn noop(_ctx: &BrainContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn chain() -> Blueprint {
        let mut bp = Blueprint::new();
        let a = bp.add_neuron(noop);
        let b = bp.add_neuron(noop);
        bp.add_entry_link_to(&a).unwrap();
        bp.add_link_with(&a, &b, crate::blueprint::LinkOptions::new().with_id("a-b"))
            .unwrap();
        bp.add_end_link_from(&b).unwrap();
        bp
    }

    #[test]
    fn test_new_brain_is_shutdown() {
        let brain = chain().build().unwrap();
        assert_eq!(brain.state(), BrainState::Shutdown);
        assert!(brain.get_memory("anything").is_none());
        assert_eq!(brain.link_status("a-b").unwrap().state, LinkState::Init);
    }

    #[test]
    fn test_explicit_id_and_labels() {
        let mut bp = chain();
        let mut labels = Labels::new();
        labels.insert("team".to_string(), "core".to_string());
        bp.set_labels(labels.clone());

        let brain = bp.build_with(BrainOptions::new().with_id("brain-1")).unwrap();
        assert_eq!(brain.id(), "brain-1");
        assert_eq!(brain.labels(), &labels);
    }

    #[test]
    fn test_trig_unknown_link_marks_nothing() {
        let brain = chain().build().unwrap();
        let err = brain.trig_links(&["a-b", "missing"]).unwrap_err();
        assert!(matches!(err, BrainError::NotFound { kind: "link", .. }));
        assert_eq!(brain.state(), BrainState::Shutdown);
        assert_eq!(brain.link_status("a-b").unwrap().state, LinkState::Init);
    }

    #[test]
    fn test_entry_without_entry_links() {
        let mut bp = Blueprint::new();
        bp.add_neuron(noop);
        let brain = bp.build().unwrap();
        assert!(matches!(brain.entry(), Err(BrainError::InvalidTopology(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AxonConfig::default();
        config.maintainer.worker_num = 0;
        let err = chain()
            .build_with(BrainOptions::new().with_config(config))
            .unwrap_err();
        assert!(matches!(err, BrainError::Config(_)));
    }

    #[test]
    fn test_run_to_sleep_and_shutdown() {
        let brain = chain().build().unwrap();
        brain.entry_with_memory([("name", "axon")]).unwrap();
        assert!(brain.wait_timeout(Duration::from_secs(5)));
        brain.wait();

        assert_eq!(brain.state(), BrainState::Sleeping);
        assert!(brain.counts().is_idle());
        assert_eq!(brain.get_memory("name"), Some(MemoryValue::from("axon")));

        brain.shutdown();
        assert_eq!(brain.state(), BrainState::Shutdown);
        assert!(brain.get_memory("name").is_none());
        for neuron in brain.inner.graph.lock().neurons.values() {
            assert_eq!(neuron.state, NeuronState::Inactive);
        }
    }

    #[test]
    fn test_memory_api_before_start() {
        let brain = chain().build().unwrap();
        assert!(!brain.exist_memory("k"));
        brain.delete_memory("k").unwrap();

        brain.set_memories([("a", 1i64), ("b", 2i64)]).unwrap();
        assert!(brain.exist_memory("a"));
        brain.delete_memory("a").unwrap();
        assert!(!brain.exist_memory("a"));
        brain.clear_memory().unwrap();
        assert!(!brain.exist_memory("b"));
    }
}
