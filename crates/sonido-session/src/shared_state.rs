//! Shared atomic state (C9): lock-free host↔audio-thread signaling.
//!
//! Mirrors the `gesture_flags: Vec<AtomicU8>` fetch_or/swap pattern a
//! sonido plugin uses to hand gesture state from its GUI thread to its
//! audio thread — generalised here to the session's two directions of
//! traffic: plugins/control code requesting host attention
//! (`request_process`, `request_restart`), and the host requesting a
//! quiesced window from the audio thread (`suspend_processing`) before a
//! graph rebuild (§4.11).
//!
//! Holds all data behind an `Arc` so [`SharedState`] can be cloned into
//! `'static + Send` closures (host callback plumbing, §4.9) without
//! lifetime issues, the same reason the plugin crate's shared state wraps
//! its data in an `Arc`.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Node has requested `start_processing` and is waiting for the audio
/// thread to acknowledge it.
pub const START_REQUESTED: u8 = 1;
/// Audio thread has called `start_processing` on the node's plugin this
/// activation.
pub const STARTED: u8 = 2;
/// Node has requested `stop_processing` (plugin is sleeping and asked to be
/// taken off the active rotation).
pub const STOP_REQUESTED: u8 = 4;

struct Inner {
    /// Set by plugin/control code when it has audio to produce outside the
    /// normal block cadence (e.g. a MIDI-triggered note while transport is
    /// stopped) and wants the host to schedule a `process()` call.
    process_requested: AtomicBool,
    /// Set by the host when it wants the audio thread to stop touching the
    /// graph so a rebuild (`Graph::compact`, node insertion/removal) can run
    /// safely (§4.11).
    suspend_requested: AtomicBool,
    /// Set by the audio thread once per block while `suspend_requested` is
    /// observed true. The host must see this true for at least one full
    /// block before it is safe to mutate the graph.
    suspend_acknowledged: AtomicBool,
    /// Set when a plugin's parameter/extension change invalidates cached
    /// host-side layout (e.g. latency, port configuration) and a full
    /// re-activation is needed.
    restart_requested: AtomicBool,
    /// Per-node lifecycle ratchet flags, indexed by `NodeId::index()`.
    node_flags: Vec<AtomicU8>,
}

/// Shared lock-free state between the session's control-plane (host side)
/// and its audio-thread processor.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<Inner>,
}

impl SharedState {
    /// Create shared state sized for `node_count` graph nodes.
    pub fn new(node_count: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                process_requested: AtomicBool::new(false),
                suspend_requested: AtomicBool::new(false),
                suspend_acknowledged: AtomicBool::new(false),
                restart_requested: AtomicBool::new(false),
                node_flags: (0..node_count).map(|_| AtomicU8::new(0)).collect(),
            }),
        }
    }

    /// Number of node flag slots this instance was sized for.
    pub fn capacity(&self) -> usize {
        self.inner.node_flags.len()
    }

    /// Request that the host schedule a `process()`/`flush()` call.
    pub fn request_process(&self) {
        self.inner.process_requested.store(true, Ordering::Release);
    }

    /// Atomically read and clear the process-requested flag. The host polls
    /// this once per its own scheduling cycle.
    pub fn take_process_requested(&self) -> bool {
        self.inner.process_requested.swap(false, Ordering::AcqRel)
    }

    /// Request a restart (re-activation) of the processing graph.
    pub fn request_restart(&self) {
        self.inner.restart_requested.store(true, Ordering::Release);
    }

    /// Atomically read and clear the restart-requested flag.
    pub fn take_restart_requested(&self) -> bool {
        self.inner.restart_requested.swap(false, Ordering::AcqRel)
    }

    /// Host: ask the audio thread to stop touching the graph.
    pub fn request_suspend(&self) {
        self.inner.suspend_acknowledged.store(false, Ordering::Release);
        self.inner.suspend_requested.store(true, Ordering::Release);
    }

    /// Host: release a previously requested suspension.
    pub fn release_suspend(&self) {
        self.inner.suspend_requested.store(false, Ordering::Release);
        self.inner.suspend_acknowledged.store(false, Ordering::Release);
    }

    /// Audio thread: whether it should skip graph mutation/traversal this
    /// block and instead only acknowledge.
    pub fn is_suspend_requested(&self) -> bool {
        self.inner.suspend_requested.load(Ordering::Acquire)
    }

    /// Audio thread: called once per block while suspended, to signal this
    /// block observed the request and performed no graph work.
    pub fn acknowledge_suspend(&self) {
        self.inner.suspend_acknowledged.store(true, Ordering::Release);
    }

    /// Host: `true` once the audio thread has acknowledged at least one
    /// fully quiesced block — the earliest point a rebuild is safe (§4.11).
    pub fn is_quiesced(&self) -> bool {
        self.inner.suspend_requested.load(Ordering::Acquire)
            && self.inner.suspend_acknowledged.load(Ordering::Acquire)
    }

    /// Control-plane: mark a node as wanting `start_processing` called for
    /// it on the next activation.
    pub fn request_start(&self, node_index: usize) {
        if let Some(flags) = self.inner.node_flags.get(node_index) {
            flags.fetch_or(START_REQUESTED, Ordering::Release);
        }
    }

    /// Control-plane: mark a node as wanting `stop_processing` called for
    /// it (it went to sleep and should leave the active rotation).
    pub fn request_stop(&self, node_index: usize) {
        if let Some(flags) = self.inner.node_flags.get(node_index) {
            flags.fetch_or(STOP_REQUESTED, Ordering::Release);
        }
    }

    /// Audio thread: record that `start_processing` has run for this node.
    pub fn mark_started(&self, node_index: usize) {
        if let Some(flags) = self.inner.node_flags.get(node_index) {
            flags.fetch_and(!START_REQUESTED, Ordering::AcqRel);
            flags.fetch_or(STARTED, Ordering::Release);
        }
    }

    /// Audio thread: record that `stop_processing` has run for this node.
    pub fn mark_stopped(&self, node_index: usize) {
        if let Some(flags) = self.inner.node_flags.get(node_index) {
            flags.fetch_and(!(STOP_REQUESTED | STARTED), Ordering::AcqRel);
        }
    }

    /// Atomically read and clear a node's ratchet flags.
    pub fn take_node_flags(&self, node_index: usize) -> u8 {
        self.inner
            .node_flags
            .get(node_index)
            .map_or(0, |flags| flags.swap(0, Ordering::AcqRel))
    }

    /// Peek a node's ratchet flags without clearing them.
    pub fn node_flags(&self, node_index: usize) -> u8 {
        self.inner
            .node_flags
            .get(node_index)
            .map_or(0, |flags| flags.load(Ordering::Acquire))
    }

    /// `true` if `start_processing` has already run for this node.
    pub fn is_started(&self, node_index: usize) -> bool {
        self.node_flags(node_index) & STARTED != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_requested_roundtrips() {
        let state = SharedState::new(4);
        assert!(!state.take_process_requested());
        state.request_process();
        assert!(state.take_process_requested());
        assert!(!state.take_process_requested());
    }

    #[test]
    fn suspend_requires_acknowledgement_before_quiesced() {
        let state = SharedState::new(4);
        assert!(!state.is_quiesced());
        state.request_suspend();
        assert!(state.is_suspend_requested());
        assert!(!state.is_quiesced());
        state.acknowledge_suspend();
        assert!(state.is_quiesced());
        state.release_suspend();
        assert!(!state.is_suspend_requested());
        assert!(!state.is_quiesced());
    }

    #[test]
    fn node_lifecycle_flags() {
        let state = SharedState::new(2);
        assert!(!state.is_started(0));
        state.request_start(0);
        assert_eq!(state.node_flags(0) & START_REQUESTED, START_REQUESTED);
        state.mark_started(0);
        assert!(state.is_started(0));
        assert_eq!(state.node_flags(0) & START_REQUESTED, 0);
        state.request_stop(0);
        assert_eq!(state.node_flags(0) & STOP_REQUESTED, STOP_REQUESTED);
        state.mark_stopped(0);
        assert!(!state.is_started(0));
    }

    #[test]
    fn out_of_range_node_index_is_safe() {
        let state = SharedState::new(1);
        state.request_start(999);
        state.mark_started(999);
        assert_eq!(state.take_node_flags(999), 0);
    }
}
