//! Work-stealing job pool (C8).
//!
//! Used for two things: parallel synth dispatch (§4.6 Phase 2) and the
//! plugin-side thread-pool extension fanout (§4.7 point 2, §5 "nested
//! thread-pool calls").
//!
//! Each worker owns a LIFO-ended [`crossbeam_deque::Worker`]: the owner pops
//! from the same end it pushes to (LIFO), while [`crossbeam_deque::Stealer`]s
//! always take from the opposite end — which is FIFO relative to push
//! order. That is exactly the "stolen LIFO from the owner's end and FIFO
//! from other ends" discipline §4.7 asks for, so the crate is used as-is
//! rather than hand-rolling a deque.

use crossbeam_deque::{Injector, Steal, Stealer, Worker};
use smallvec::SmallVec;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

pub(crate) type BoxedJob = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    static IN_WORKER: Cell<bool> = const { Cell::new(false) };
    /// Nesting depth of [`JobPool::run_fanout`] calls the *current thread* is
    /// executing inside, propagated explicitly into each fanned-out task
    /// closure (§5 "nested thread-pool calls") rather than inherited from the
    /// parent thread — the pool's worker threads are long-lived and run many
    /// unrelated jobs over their lifetime, so the depth has to travel with
    /// the job closure itself, set on entry and restored on exit, rather than
    /// live as a fixed per-thread value.
    static FANOUT_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// `true` if the calling thread is currently executing inside the job pool
/// (either a pool worker thread, or the audio thread while helping via
/// [`JobPool::wait`]).
pub fn in_jobs_worker() -> bool {
    IN_WORKER.with(|c| c.get())
}

/// Nesting depth of thread-pool-extension fanout the calling thread is
/// currently inside (0 if not inside any `run_fanout` task).
pub fn current_fanout_depth() -> usize {
    FANOUT_DEPTH.with(Cell::get)
}

/// A handle to a job scheduled via [`JobPool::schedule`]. `wait()` blocks
/// (by helping) until the job completes.
#[derive(Clone)]
pub struct JobHandle {
    done: Arc<AtomicBool>,
}

impl JobHandle {
    fn new() -> (Self, Arc<AtomicBool>) {
        let done = Arc::new(AtomicBool::new(false));
        (Self { done: done.clone() }, done)
    }

    /// Non-blocking completion check.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

struct Shared {
    injector: Injector<BoxedJob>,
    stealers: Vec<Stealer<BoxedJob>>,
    shutdown: AtomicBool,
    parking: (Mutex<()>, Condvar),
}

impl Shared {
    fn find_job(&self, local: &Worker<BoxedJob>) -> Option<BoxedJob> {
        if let Some(job) = local.pop() {
            return Some(job);
        }
        loop {
            match self.injector.steal_batch_and_pop(local) {
                Steal::Success(job) => return Some(job),
                Steal::Retry => continue,
                Steal::Empty => break,
            }
        }
        for stealer in &self.stealers {
            loop {
                match stealer.steal() {
                    Steal::Success(job) => return Some(job),
                    Steal::Retry => continue,
                    Steal::Empty => break,
                }
            }
        }
        None
    }

    fn wake_all(&self) {
        let (_lock, cvar) = &self.parking;
        cvar.notify_all();
    }
}

/// Fixed-size work-stealing thread pool. The audio thread participates as an
/// implicit extra "worker" by calling [`JobPool::wait`], which helps by
/// stealing and running queued jobs rather than parking (§5: "`wait(job)`
/// implements help-first stealing").
pub struct JobPool {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
    /// Maximum nesting depth for thread-pool-extension fanout requests
    /// (§4.7, §5). Beyond this, tasks run sequentially on the caller.
    pub recursion_depth_cap: usize,
}

impl JobPool {
    /// Spawn `worker_count` OS threads participating in the pool.
    pub fn new(worker_count: usize, recursion_depth_cap: usize) -> Self {
        let worker_count = worker_count.clamp(1, 16);
        let workers: Vec<Worker<BoxedJob>> = (0..worker_count).map(|_| Worker::new_lifo()).collect();
        let stealers = workers.iter().map(Worker::stealer).collect();
        let shared = Arc::new(Shared {
            injector: Injector::new(),
            stealers,
            shutdown: AtomicBool::new(false),
            parking: (Mutex::new(()), Condvar::new()),
        });

        let handles = workers
            .into_iter()
            .map(|local| {
                let shared = shared.clone();
                std::thread::spawn(move || worker_loop(shared, local))
            })
            .collect();

        Self {
            shared,
            handles,
            recursion_depth_cap,
        }
    }

    /// Schedule a closure on the pool's global injector queue. Returns a
    /// handle the caller can `wait()` on.
    pub fn schedule(&self, f: impl FnOnce() + Send + 'static) -> JobHandle {
        let (handle, done) = JobHandle::new();
        let job: BoxedJob = Box::new(move || {
            f();
            done.store(true, Ordering::Release);
        });
        self.shared.injector.push(job);
        self.shared.wake_all();
        handle
    }

    /// Block the calling thread until `handle` completes, helping the pool
    /// by stealing and executing other queued jobs in the meantime rather
    /// than idling (§5 help-first stealing).
    pub fn wait(&self, handle: &JobHandle) {
        let was_worker = IN_WORKER.with(Cell::get);
        IN_WORKER.with(|c| c.set(true));
        let helper = Worker::new_fifo();
        while !handle.is_done() {
            if let Some(job) = self.shared.find_job(&helper) {
                job();
            } else {
                std::thread::yield_now();
            }
        }
        IN_WORKER.with(|c| c.set(was_worker));
    }

    /// Run `task_count` independent invocations of `task_fn(index)` to
    /// completion, fanning out across the pool's persistent workers, per the
    /// plugin thread-pool extension (§4.7 point 2). `depth` is the current
    /// nesting depth of thread-pool requests (0 for a top-level call from the
    /// audio thread). `task_fn` is `Arc`-wrapped so each fanned-out job can
    /// hold its own cheap clone without needing to borrow across a thread
    /// boundary shorter than `'static`.
    ///
    /// Beyond `recursion_depth_cap`, or when `task_count` is small, tasks
    /// run sequentially on the calling thread. When the caller is already a
    /// pool worker, the fanout width is halved to reduce oversubscription.
    pub fn run_fanout(&self, task_count: usize, depth: usize, task_fn: Arc<dyn Fn(usize) + Send + Sync>) {
        if task_count == 0 {
            return;
        }
        if depth >= self.recursion_depth_cap {
            run_sequential_at_depth(task_count, depth, &*task_fn);
            return;
        }

        let mut fanout = self.handles.len().max(1);
        if in_jobs_worker() {
            fanout = (fanout / 2).max(1);
        }
        let fanout = fanout.min(task_count);

        if fanout <= 1 {
            run_sequential_at_depth(task_count, depth, &*task_fn);
            return;
        }

        let next_index = Arc::new(AtomicUsize::new(0));
        let child_depth = depth + 1;

        // Each sub-task is scheduled onto the pool's own injector rather than
        // a freshly spawned OS thread, so the same persistent workers created
        // once in `new` service every fanout call.
        let mut handles: SmallVec<[JobHandle; 16]> = SmallVec::new();
        for _ in 0..fanout {
            let next_index = next_index.clone();
            let task_fn = task_fn.clone();
            handles.push(self.schedule(move || {
                let was_worker = IN_WORKER.with(Cell::get);
                IN_WORKER.with(|c| c.set(true));
                let was_depth = FANOUT_DEPTH.with(Cell::get);
                FANOUT_DEPTH.with(|c| c.set(child_depth));
                loop {
                    let idx = next_index.fetch_add(1, Ordering::Relaxed);
                    if idx >= task_count {
                        break;
                    }
                    task_fn(idx);
                }
                FANOUT_DEPTH.with(|c| c.set(was_depth));
                IN_WORKER.with(|c| c.set(was_worker));
            }));
        }
        for handle in &handles {
            self.wait(handle);
        }
    }

    /// Dispatch a batch of fully-owned tasks across the pool's persistent
    /// workers and block until every one has completed (§4.6 Phase 2:
    /// "dispatch via C8 with one job per task and a root sync job"). Unlike
    /// [`JobPool::run_fanout`]'s shared `Fn(usize)`, each task here owns
    /// everything it touches outright — the parallel synth dispatch needs an
    /// exclusive `&mut` per task, which a shared closure can't express, so the
    /// caller moves that state in per task instead.
    pub fn run_batch<I>(&self, tasks: I)
    where
        I: IntoIterator<Item = BoxedJob>,
    {
        let mut handles: SmallVec<[JobHandle; 16]> = SmallVec::new();
        for task in tasks {
            handles.push(self.schedule(task));
        }
        for handle in &handles {
            self.wait(handle);
        }
    }

    /// Shut down the pool, joining all worker threads. Intended for clean
    /// process exit / test teardown.
    pub fn shutdown(mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.wake_all();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }

    /// Number of spawned worker threads.
    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }
}

/// Run every task inline on the calling thread, with `FANOUT_DEPTH` set to
/// `depth + 1` for the duration so a nested `request_exec` call from within
/// a task still sees the correct nesting depth even though no new thread was
/// spawned for this batch.
fn run_sequential_at_depth(task_count: usize, depth: usize, task_fn: &(dyn Fn(usize) + Send + Sync)) {
    let was_depth = FANOUT_DEPTH.with(Cell::get);
    FANOUT_DEPTH.with(|c| c.set(depth + 1));
    for i in 0..task_count {
        task_fn(i);
    }
    FANOUT_DEPTH.with(|c| c.set(was_depth));
}

fn worker_loop(shared: Arc<Shared>, local: Worker<BoxedJob>) {
    IN_WORKER.with(|c| c.set(true));
    let (lock, cvar) = &shared.parking;
    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }
        if let Some(job) = shared.find_job(&local) {
            job();
            continue;
        }
        let guard = lock.lock().unwrap();
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }
        let _ = cvar.wait_timeout(guard, std::time::Duration::from_millis(5));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn schedule_and_wait_runs_the_job() {
        let pool = JobPool::new(2, 4);
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let handle = pool.schedule(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        pool.wait(&handle);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        pool.shutdown();
    }

    #[test]
    fn fanout_runs_every_task_exactly_once() {
        let pool = JobPool::new(4, 4);
        let counts = Arc::new((0..8).map(|_| AtomicU32::new(0)).collect::<Vec<_>>());
        let c = counts.clone();
        let task: Arc<dyn Fn(usize) + Send + Sync> = Arc::new(move |i: usize| {
            c[i].fetch_add(1, Ordering::SeqCst);
        });
        pool.run_fanout(8, 0, task);
        for counter in counts.iter() {
            assert_eq!(counter.load(Ordering::SeqCst), 1);
        }
        pool.shutdown();
    }

    #[test]
    fn fanout_beyond_recursion_cap_runs_sequentially() {
        let pool = JobPool::new(4, 1);
        let counts = Arc::new((0..4).map(|_| AtomicU32::new(0)).collect::<Vec<_>>());
        let c = counts.clone();
        let task: Arc<dyn Fn(usize) + Send + Sync> = Arc::new(move |i: usize| {
            c[i].fetch_add(1, Ordering::SeqCst);
        });
        // depth already at the cap: must run on the calling thread.
        pool.run_fanout(4, 1, task);
        for counter in counts.iter() {
            assert_eq!(counter.load(Ordering::SeqCst), 1);
        }
        pool.shutdown();
    }

    #[test]
    fn run_batch_executes_every_owned_task_on_pool_workers() {
        let pool = JobPool::new(4, 4);
        let counts = Arc::new((0..6).map(|_| AtomicU32::new(0)).collect::<Vec<_>>());
        let tasks: Vec<BoxedJob> = (0..6)
            .map(|i| {
                let counts = counts.clone();
                Box::new(move || {
                    counts[i].fetch_add(1, Ordering::SeqCst);
                }) as BoxedJob
            })
            .collect();
        pool.run_batch(tasks);
        for counter in counts.iter() {
            assert_eq!(counter.load(Ordering::SeqCst), 1);
        }
        pool.shutdown();
    }
}
