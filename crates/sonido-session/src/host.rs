//! Host callback capability (C11): the object plugins use to talk back to
//! the host outside of `process()`'s return value.
//!
//! Grounded on the `host_notify: Option<Box<dyn Fn() + Send + Sync>>`
//! callback a sonido plugin's shared state holds to ask its CLAP host to
//! schedule a `process()`/`flush()` call — [`HostHandle`] is the
//! session-side mirror: plugins hold a cheap `Clone` of it and call back
//! into [`crate::shared_state::SharedState`] without needing to know
//! anything about threads or queues.

use crate::jobs::{self, JobPool};
use crate::shared_state::SharedState;
use std::cell::Cell;
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;

thread_local! {
    /// Set at the top of every audio callback invocation, and by every job
    /// pool worker thread, so `HostHandle::is_audio_thread` is cheap and
    /// correct regardless of which physical thread calls in.
    static IS_AUDIO_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Mark the calling thread as the audio thread for the remainder of its
/// lifetime (or until [`clear_audio_thread`] is called). The processor
/// calls this once, and [`crate::jobs::JobPool`] worker threads call it at
/// startup since they may run synth/FX tasks dispatched from a block.
pub fn mark_audio_thread() {
    IS_AUDIO_THREAD.with(|c| c.set(true));
}

/// Un-mark the calling thread as the audio thread. Exposed for tests that
/// reuse a thread across audio and non-audio roles.
pub fn clear_audio_thread() {
    IS_AUDIO_THREAD.with(|c| c.set(false));
}

/// `true` if the calling thread is currently the audio thread or a job pool
/// worker executing audio-thread work.
pub fn is_audio_thread() -> bool {
    IS_AUDIO_THREAD.with(Cell::get)
}

/// A callback queued from a non-main thread, to run on the main thread the
/// next time it pumps the queue.
type MainThreadCallback = Box<dyn FnOnce() + Send>;

/// The thread-pool extension (§4.7 point 2, §4.10): lets a plugin's
/// `process()` call fan `task_count` independent sub-tasks out across the
/// host's work-stealing pool and block until every one has run exactly once,
/// before `process()` itself returns.
pub struct ThreadPoolExtension<'a> {
    pool: &'a JobPool,
}

impl ThreadPoolExtension<'_> {
    /// Run `task_count` invocations of `task_fn(index)` to completion. Blocks
    /// the calling thread — which may itself already be a pool worker
    /// executing another plugin's task — helping rather than idling. The
    /// current thread's fanout nesting depth
    /// ([`crate::jobs::current_fanout_depth`]) is read automatically, so a
    /// sub-task that calls back into this extension is correctly counted as
    /// one level deeper; beyond the pool's recursion-depth cap, tasks run
    /// sequentially on the calling thread instead (§5). `task_fn` is
    /// `Arc`-wrapped so the pool can hand a cheap clone to each of its
    /// persistent workers instead of borrowing across the dispatch.
    pub fn request_exec(&self, task_count: usize, task_fn: Arc<dyn Fn(usize) + Send + Sync>) {
        self.pool.run_fanout(task_count, jobs::current_fanout_depth(), task_fn);
    }
}

/// Capability object passed to hosted plugins (§4.9): lets a plugin request
/// the host schedule a process call, request a restart, schedule a
/// main-thread callback, query its own thread identity, or fan work out
/// across the host's job pool. Cheap to clone — every field is either `Copy`
/// or reference-counted.
#[derive(Clone)]
pub struct HostHandle {
    shared: SharedState,
    main_thread_id: ThreadId,
    pending: Arc<Mutex<Vec<MainThreadCallback>>>,
    jobs: Option<Arc<JobPool>>,
}

impl HostHandle {
    /// Create a host handle. Must be constructed on what will be treated as
    /// the main/control thread — later `is_main_thread()` calls compare
    /// against the thread that called this. No thread-pool extension is
    /// available until [`HostHandle::with_jobs`] attaches one.
    pub fn new(shared: SharedState) -> Self {
        Self {
            shared,
            main_thread_id: std::thread::current().id(),
            pending: Arc::new(Mutex::new(Vec::new())),
            jobs: None,
        }
    }

    /// Attach the host's work-stealing pool, making the thread-pool extension
    /// available to plugins through [`HostHandle::thread_pool`].
    pub fn with_jobs(mut self, jobs: Arc<JobPool>) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Query the thread-pool extension (§4.7 point 2), if this handle was
    /// built with a job pool attached.
    pub fn thread_pool(&self) -> Option<ThreadPoolExtension<'_>> {
        self.jobs.as_deref().map(|pool| ThreadPoolExtension { pool })
    }

    /// `true` if the calling thread is the one that constructed this
    /// handle.
    pub fn is_main_thread(&self) -> bool {
        std::thread::current().id() == self.main_thread_id
    }

    /// `true` if the calling thread is the audio thread (or a job worker
    /// executing audio-thread work).
    pub fn is_audio_thread(&self) -> bool {
        is_audio_thread()
    }

    /// A plugin has audio to produce outside the normal block cadence and
    /// wants `process()` scheduled. Safe to call from any thread.
    pub fn request_process(&self) {
        self.shared.request_process();
    }

    /// A plugin's layout changed in a way that requires re-activation.
    pub fn request_restart(&self) {
        self.shared.request_restart();
    }

    /// Queue a closure to run on the main thread at the next
    /// [`HostHandle::pump_main_thread_callbacks`]. Safe to call from any
    /// thread, including the audio thread (the closure itself must still be
    /// allocation-free if it's expected to run promptly, but queuing it is
    /// not on the hot path).
    pub fn request_callback(&self, f: impl FnOnce() + Send + 'static) {
        self.pending.lock().unwrap().push(Box::new(f));
    }

    /// Run every queued main-thread callback. Must be called from the main
    /// thread (typically once per UI tick / idle callback). Panics in debug
    /// builds if called off the main thread would be a correctness bug, but
    /// rather than special-case that here, callers are expected to only
    /// invoke this from their main-thread idle loop, per the plugin ABI's
    /// own convention of trusting caller-declared thread roles.
    pub fn pump_main_thread_callbacks(&self) {
        let callbacks: Vec<_> = std::mem::take(&mut *self.pending.lock().unwrap());
        for cb in callbacks {
            cb();
        }
    }

    /// Query a named host extension other than the thread pool (which has
    /// its own typed accessor, [`HostHandle::thread_pool`], since it is
    /// actually implemented). The session stubs the rest of the CLAP
    /// host-extension surface — no GUI embedding, no timer, no undo, no
    /// params-rescan sink, no log extension — this always returns `None`, a
    /// shape matching a real host-extension registry so adapters can be
    /// written against the interface now and wired up later.
    pub fn extension(&self, _id: &str) -> Option<&'static dyn std::any::Any> {
        None
    }
}
