// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Event maintainer: one control loop plus a pool of neuron workers
//!
//! # Design
//! - Bounded control queue: link/neuron/brain events and trig requests.
//!   Callers block when it is full.
//! - Bounded run queue feeding `worker_num` workers that execute processors.
//! - The control loop is the only writer of link and neuron records. Events
//!   it raises itself go to a local backlog instead of its own queue, and runs
//!   that do not fit the run queue wait in a local overflow, so the loop
//!   never blocks on a queue it has to drain.
//! - Cast-anyway retries sit in a delay queue ordered by due time.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use std::any::Any;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn};

use crate::activation::Activation;
use crate::brain::BrainShared;
use crate::context::{select_cast_group, BrainContext, NeuronView};
use crate::error::{BrainError, BrainResult};
use crate::event::{CastMode, ControlMessage, EventAction, EventKind, MaintainEvent, RunRequest};
use crate::rate_limiter::RateLimiter;
use crate::records::BrainState;

/// Longest the control loop sleeps without anything scheduled
const IDLE_TICK: Duration = Duration::from_millis(100);
/// Poll interval while runs wait for room in the run queue
const BUSY_TICK: Duration = Duration::from_millis(2);

/// Handle to the threads of a running maintainer
pub(crate) struct Maintainer {
    epoch: u64,
    control_tx: Sender<ControlMessage>,
    handles: Vec<JoinHandle<()>>,
}

impl Maintainer {
    /// Spawn the workers and the control loop.
    pub fn start(shared: &Arc<BrainShared>, epoch: u64) -> BrainResult<Self> {
        let config = &shared.config.maintainer;
        let (control_tx, control_rx) = channel::bounded(config.control_queue_len);
        let (run_tx, run_rx) = channel::bounded(config.run_queue_len);

        let mut handles = Vec::with_capacity(config.worker_num + 1);
        for index in 0..config.worker_num {
            let worker = Worker {
                shared: Arc::clone(shared),
                runs: run_rx.clone(),
                control: control_tx.clone(),
            };
            let handle = thread::Builder::new()
                .name(format!("axon-worker-{}", index))
                .spawn(move || worker.run())
                .map_err(|e| BrainError::Maintainer(format!("failed to spawn worker: {}", e)))?;
            handles.push(handle);
        }

        let control_loop = ControlLoop::new(Arc::clone(shared), epoch, control_rx, run_tx);
        let handle = thread::Builder::new()
            .name("axon-control".to_string())
            .spawn(move || control_loop.run())
            .map_err(|e| BrainError::Maintainer(format!("failed to spawn control loop: {}", e)))?;
        handles.push(handle);

        info!(
            brain_id = %shared.id,
            workers = config.worker_num,
            run_queue = config.run_queue_len,
            control_queue = config.control_queue_len,
            "maintainer started"
        );

        Ok(Self {
            epoch,
            control_tx,
            handles,
        })
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Blocks while the control queue is full.
    pub fn send(&self, message: ControlMessage) -> BrainResult<()> {
        self.control_tx
            .send(message)
            .map_err(|_| BrainError::Maintainer("control loop has stopped".to_string()))
    }

    /// Stop the control loop and wait for every thread to finish.
    ///
    /// Workers finish the processor they are running; nothing is cancelled.
    pub fn stop(self) {
        let Maintainer {
            control_tx,
            handles,
            ..
        } = self;

        let shutdown = MaintainEvent::brain(EventAction::BrainShutdown);
        if control_tx.send(ControlMessage::Event(shutdown)).is_err() {
            debug!("control loop already gone");
        }
        drop(control_tx);

        let current = thread::current().id();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            let name = handle.thread().name().unwrap_or("unnamed").to_string();
            if handle.join().is_err() {
                error!(thread = %name, "maintainer thread panicked");
            }
        }
    }
}

// ============================================================================
// Workers
// ============================================================================

struct Worker {
    shared: Arc<BrainShared>,
    runs: Receiver<RunRequest>,
    control: Sender<ControlMessage>,
}

impl Worker {
    fn run(self) {
        let span = info_span!("brain", brain_id = %self.shared.id);
        let _enter = span.enter();

        // Exits once the control loop drops the run queue
        while let Ok(request) = self.runs.recv() {
            self.execute(request);
        }
        debug!("worker stopped");
    }

    fn execute(&self, request: RunRequest) {
        let Some(slot) = self.shared.slots.get(&request.neuron_id) else {
            warn!(neuron_id = %request.neuron_id, "run requested for unknown neuron");
            return;
        };
        let generation = request.generation;
        let ctx = BrainContext::new(
            &self.shared,
            &request.neuron_id,
            &slot.labels,
            generation,
            &self.control,
            slot.selector.as_deref(),
        );

        debug!(neuron_id = %request.neuron_id, generation, "processor started");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut processor = slot.processor.lock();
            processor.process(&ctx)
        }))
        .unwrap_or_else(|payload| Err(anyhow::anyhow!("processor panicked: {}", panic_message(&*payload))));

        let action = match outcome {
            Ok(()) => match panic::catch_unwind(AssertUnwindSafe(|| ctx.select_group())) {
                Ok(group) => {
                    debug!(neuron_id = %request.neuron_id, group = %group, "processor succeeded");
                    EventAction::NeuronTryCast { generation, group }
                }
                Err(payload) => {
                    error!(
                        neuron_id = %request.neuron_id,
                        panic = %panic_message(&*payload),
                        "selector panicked"
                    );
                    EventAction::NeuronFailed { generation }
                }
            },
            Err(source) => {
                let err = BrainError::Processor {
                    neuron_id: request.neuron_id.clone(),
                    source,
                };
                error!(error = %err, "neuron run failed");
                EventAction::NeuronFailed { generation }
            }
        };

        let event = MaintainEvent::neuron(request.neuron_id, action);
        if self.control.send(ControlMessage::Event(event)).is_err() {
            debug!("control loop gone, run result dropped");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Control loop
// ============================================================================

/// An event due at a later time. Ordered so the earliest pops first.
struct Delayed {
    due: Instant,
    seq: u64,
    event: MaintainEvent,
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Delayed {}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Delayed {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

enum Flow {
    Continue,
    Exit,
}

struct ControlLoop {
    shared: Arc<BrainShared>,
    epoch: u64,
    inbox: Receiver<ControlMessage>,
    runs: Sender<RunRequest>,
    backlog: VecDeque<ControlMessage>,
    pending_runs: VecDeque<RunRequest>,
    delayed: BinaryHeap<Delayed>,
    next_seq: u64,
    limiter: RateLimiter,
    max_cast_retries: u32,
    shutdown_on_sleep: bool,
    teardown_pending: bool,
}

impl ControlLoop {
    fn new(
        shared: Arc<BrainShared>,
        epoch: u64,
        inbox: Receiver<ControlMessage>,
        runs: Sender<RunRequest>,
    ) -> Self {
        let config = shared.config.maintainer.clone();
        Self {
            shared,
            epoch,
            inbox,
            runs,
            backlog: VecDeque::new(),
            pending_runs: VecDeque::new(),
            delayed: BinaryHeap::new(),
            next_seq: 0,
            limiter: RateLimiter::new(config.retry_base_delay(), config.retry_max_delay()),
            max_cast_retries: config.max_cast_retries,
            shutdown_on_sleep: config.shutdown_on_sleep,
            teardown_pending: false,
        }
    }

    fn run(mut self) {
        let span = info_span!("brain", brain_id = %self.shared.id);
        let _enter = span.enter();

        loop {
            if !self.drain_inbox() {
                break;
            }
            self.flush_runs();

            if let Some(message) = self.backlog.pop_front() {
                match self.handle(message) {
                    Flow::Continue => continue,
                    Flow::Exit => break,
                }
            }

            if self.promote_due() {
                continue;
            }
            if self.teardown_pending && self.try_teardown() {
                break;
            }

            match self.inbox.recv_timeout(self.next_wakeup()) {
                Ok(message) => self.backlog.push_back(message),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("maintainer stopped");
    }

    /// Move everything queued into the backlog. `false` once all senders are gone.
    fn drain_inbox(&mut self) -> bool {
        loop {
            match self.inbox.try_recv() {
                Ok(message) => self.backlog.push_back(message),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return !self.backlog.is_empty(),
            }
        }
    }

    fn emit(&mut self, event: MaintainEvent) {
        self.backlog.push_back(ControlMessage::Event(event));
    }

    fn dispatch(&mut self, request: RunRequest) {
        if !self.pending_runs.is_empty() {
            self.pending_runs.push_back(request);
            return;
        }
        match self.runs.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(request)) => self.pending_runs.push_back(request),
            Err(TrySendError::Disconnected(request)) => {
                error!(neuron_id = %request.neuron_id, "no worker left to run neuron");
            }
        }
    }

    fn flush_runs(&mut self) {
        while let Some(request) = self.pending_runs.pop_front() {
            match self.runs.try_send(request) {
                Ok(()) => {}
                Err(TrySendError::Full(request)) => {
                    self.pending_runs.push_front(request);
                    break;
                }
                Err(TrySendError::Disconnected(request)) => {
                    error!(neuron_id = %request.neuron_id, "no worker left to run neuron");
                }
            }
        }
    }

    /// Move due retries into the backlog; `true` if any moved.
    fn promote_due(&mut self) -> bool {
        let now = Instant::now();
        let mut promoted = false;
        while self.delayed.peek().map_or(false, |d| d.due <= now) {
            if let Some(delayed) = self.delayed.pop() {
                self.emit(delayed.event);
                promoted = true;
            }
        }
        promoted
    }

    fn next_wakeup(&self) -> Duration {
        let mut timeout = IDLE_TICK;
        if let Some(next) = self.delayed.peek() {
            timeout = timeout.min(next.due.saturating_duration_since(Instant::now()));
        }
        if !self.pending_runs.is_empty() || self.teardown_pending {
            timeout = timeout.min(BUSY_TICK);
        }
        timeout
    }

    fn schedule_retry(&mut self, neuron_id: &str, generation: u64) {
        let delay = self.limiter.when(neuron_id);
        let event = MaintainEvent::neuron(
            neuron_id,
            EventAction::NeuronCastAnyway {
                generation,
                mode: CastMode::Retry,
            },
        );
        self.next_seq += 1;
        self.delayed.push(Delayed {
            due: Instant::now() + delay,
            seq: self.next_seq,
            event,
        });
        debug!(neuron_id, generation, delay_ms = delay.as_millis() as u64, "cast retry scheduled");
    }

    /// Sleep when nothing is running or in flight, otherwise Running.
    fn refresh(&mut self) {
        let counts = self.shared.graph.lock().counts();
        debug!(?counts, "state counts");
        if counts.is_idle() {
            self.emit(MaintainEvent::brain(EventAction::BrainSleep { forced: false }));
        } else {
            self.shared.set_state(BrainState::Running);
        }
    }

    fn handle(&mut self, message: ControlMessage) -> Flow {
        match message {
            ControlMessage::Trig { link_ids, done } => {
                self.handle_trig(&link_ids);
                // The caller may have given up waiting
                let _ = done.send(());
                Flow::Continue
            }
            ControlMessage::Event(event) => {
                debug!(kind = %event.kind, id = %event.id, event = event.action.name(), "handling event");
                let result = match event.kind {
                    EventKind::Link => self.handle_link(&event),
                    EventKind::Neuron => self.handle_neuron(&event),
                    EventKind::Brain => self.handle_brain(&event),
                };
                match result {
                    Ok(flow) => {
                        if event.kind != EventKind::Brain {
                            self.refresh();
                        }
                        flow
                    }
                    Err(err @ BrainError::UnsupportedEvent { .. }) => {
                        error!(error = %err, "event dropped");
                        Flow::Continue
                    }
                    Err(err) => {
                        warn!(error = %err, event = event.action.name(), "event failed");
                        self.refresh();
                        Flow::Continue
                    }
                }
            }
        }
    }

    fn handle_trig(&mut self, link_ids: &[String]) {
        self.teardown_pending = false;
        let mut newly_ready = Vec::with_capacity(link_ids.len());
        {
            let mut graph = self.shared.graph.lock();
            for link_id in link_ids {
                match graph.mark_ready(link_id) {
                    Ok(true) => newly_ready.push(link_id.clone()),
                    Ok(false) => debug!(link_id = %link_id, "link already ready"),
                    Err(err) => warn!(error = %err, "trig skipped"),
                }
            }
        }
        for link_id in newly_ready {
            self.emit(MaintainEvent::link(link_id, EventAction::LinkReady));
        }
        self.refresh();
    }

    fn handle_link(&mut self, event: &MaintainEvent) -> BrainResult<Flow> {
        match event.action {
            EventAction::LinkReady => {
                let dest = self
                    .shared
                    .graph
                    .lock()
                    .link_destination(&event.id)
                    .map(str::to_string)
                    .ok_or_else(|| BrainError::not_found("link", event.id.as_str()))?;
                self.emit(MaintainEvent::neuron(dest, EventAction::NeuronTryActivate));
            }
            _ => return Err(unsupported(event)),
        }
        Ok(Flow::Continue)
    }

    fn handle_neuron(&mut self, event: &MaintainEvent) -> BrainResult<Flow> {
        let neuron_id = event.id.as_str();
        match &event.action {
            EventAction::NeuronTryActivate => {
                if self.shared.state() != BrainState::Running {
                    debug!(neuron_id, "brain not running, activation skipped");
                    return Ok(Flow::Continue);
                }
                let activation = self.shared.graph.lock().try_activate(neuron_id)?;
                match activation {
                    Activation::NotQualified => {}
                    Activation::EndReached => {
                        info!("end neuron reached, brain going to sleep");
                        self.emit(MaintainEvent::brain(EventAction::BrainSleep { forced: true }));
                    }
                    Activation::Run { generation } => {
                        debug!(neuron_id, generation, "neuron activated");
                        self.dispatch(RunRequest {
                            neuron_id: neuron_id.to_string(),
                            generation,
                        });
                    }
                }
            }
            // Running processors cannot be interrupted
            EventAction::NeuronTryInactivate => {}
            EventAction::NeuronTryCast { generation, group } => {
                let cast = self
                    .shared
                    .graph
                    .lock()
                    .finish_success(neuron_id, *generation, group);
                match cast {
                    Some(ready) => {
                        for link_id in ready {
                            self.emit(MaintainEvent::link(link_id, EventAction::LinkReady));
                        }
                        self.emit(MaintainEvent::neuron(neuron_id, EventAction::NeuronTryActivate));
                    }
                    None => debug!(neuron_id, generation, "stale run result ignored"),
                }
            }
            EventAction::NeuronFailed { generation } => {
                if self.shared.graph.lock().finish_failure(neuron_id, *generation) {
                    self.emit(MaintainEvent::neuron(neuron_id, EventAction::NeuronTryActivate));
                } else {
                    debug!(neuron_id, generation, "stale run failure ignored");
                }
            }
            EventAction::NeuronCastAnyway { generation, mode } => {
                self.handle_cast_anyway(neuron_id, *generation, mode)?;
            }
            _ => return Err(unsupported(event)),
        }
        Ok(Flow::Continue)
    }

    fn handle_cast_anyway(&mut self, neuron_id: &str, generation: u64, mode: &CastMode) -> BrainResult<()> {
        if !self.shared.graph.lock().is_current(neuron_id, generation) {
            debug!(neuron_id, generation, "cast-anyway from a finished run ignored");
            self.limiter.forget(neuron_id);
            return Ok(());
        }
        let group = match mode {
            CastMode::Anyway { group } => group.clone(),
            CastMode::Retry => match self.reselect(neuron_id) {
                Some(group) => group,
                None => {
                    self.limiter.forget(neuron_id);
                    return Ok(());
                }
            },
        };

        let outcome = {
            let mut graph = self.shared.graph.lock();
            // The run may have finished while the selector ran
            if !graph.is_current(neuron_id, generation) {
                drop(graph);
                self.limiter.forget(neuron_id);
                return Ok(());
            }
            graph.cast_anyway(neuron_id, &group)?
        };
        for link_id in outcome.ready.iter().chain(&outcome.resent) {
            self.emit(MaintainEvent::link(link_id.clone(), EventAction::LinkReady));
        }

        if outcome.resent.is_empty() {
            self.limiter.forget(neuron_id);
            return Ok(());
        }
        let retries = self.limiter.num_requeues(neuron_id);
        if retries >= self.max_cast_retries {
            warn!(neuron_id, group = %group, retries, "links still ready, giving up re-signalling");
            self.limiter.forget(neuron_id);
        } else {
            self.schedule_retry(neuron_id, generation);
        }
        Ok(())
    }

    /// Consult the neuron's selector again for a backoff retry
    fn reselect(&self, neuron_id: &str) -> Option<String> {
        let slot = self.shared.slots.get(neuron_id)?;
        let view = NeuronView::new(&self.shared, neuron_id, &slot.labels);
        match panic::catch_unwind(AssertUnwindSafe(|| select_cast_group(slot.selector.as_deref(), &view))) {
            Ok(group) => Some(group),
            Err(payload) => {
                error!(neuron_id, panic = %panic_message(&*payload), "selector panicked on cast retry");
                None
            }
        }
    }

    fn handle_brain(&mut self, event: &MaintainEvent) -> BrainResult<Flow> {
        match event.action {
            EventAction::BrainSleep { forced } => {
                {
                    let mut graph = self.shared.graph.lock();
                    if !forced && !graph.counts().is_idle() {
                        debug!("work arrived, sleep cancelled");
                        return Ok(Flow::Continue);
                    }
                    graph.reset();
                }
                self.pending_runs.clear();
                self.delayed.clear();
                self.limiter.clear();
                self.shared.set_state(BrainState::Sleeping);
                if self.shutdown_on_sleep {
                    self.teardown_pending = true;
                }
                Ok(Flow::Continue)
            }
            EventAction::BrainShutdown => Ok(Flow::Exit),
            _ => Err(unsupported(event)),
        }
    }

    /// Release everything after sleeping, unless new work showed up.
    ///
    /// Callers only send while holding the maintainer slot, so once the slot
    /// is ours and the inbox is empty no message can be lost.
    fn try_teardown(&mut self) -> bool {
        let Some(mut slot) = self.shared.maintainer.try_lock() else {
            return false;
        };
        if slot.as_ref().map(Maintainer::epoch) != Some(self.epoch) {
            // Already taken by an explicit shutdown, which will stop us
            return false;
        }
        if !self.inbox.is_empty() {
            return false;
        }
        drop(slot.take());

        // Still holding the slot: a trig arriving now waits, then starts a
        // fresh maintainer with a fresh memory.
        self.shared.close_memory();
        self.shared.set_state(BrainState::Shutdown);
        drop(slot);
        info!("maintainer released after sleep");
        true
    }
}

fn unsupported(event: &MaintainEvent) -> BrainError {
    BrainError::UnsupportedEvent {
        kind: event.kind.to_string(),
        action: event.action.name().to_string(),
    }
}
