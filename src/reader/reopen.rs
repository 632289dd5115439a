use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use parking_lot::{Condvar, Mutex};
use tracing::warn;
use crate::core::error::Result;

struct ReopenState {
    stop: bool,
    waiting_for: u64,    // highest generation a searcher asked for
    searching_gen: u64,  // generation visible to new searchers
}

struct Shared {
    state: Mutex<ReopenState>,
    wake: Condvar,
    reopened: Condvar,
}

/// Background thread that keeps the searcher snapshot fresh. It refreshes every
/// `max_stale` while nobody waits, and after `min_stale` once a searcher waits
/// on a generation that is not visible yet.
pub struct ReopenThread {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReopenThread {
    /// `refresh` installs a new snapshot if needed and returns the generation
    /// now visible to searchers.
    pub fn start<F>(
        name: &str,
        max_stale: Duration,
        min_stale: Duration,
        initial_generation: u64,
        mut refresh: F,
    ) -> Result<Self>
    where
        F: FnMut() -> Result<u64> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(ReopenState {
                stop: false,
                waiting_for: 0,
                searching_gen: initial_generation,
            }),
            wake: Condvar::new(),
            reopened: Condvar::new(),
        });

        let thread_shared = shared.clone();
        let handle = thread::Builder::new()
            .name(format!("reopen-{}", name))
            .spawn(move || {
                let shared = thread_shared;
                let mut last_reopen = Instant::now();
                loop {
                    {
                        let mut state = shared.state.lock();
                        loop {
                            if state.stop {
                                return;
                            }
                            let waiting = state.waiting_for > state.searching_gen;
                            let due = last_reopen + if waiting { min_stale } else { max_stale };
                            if Instant::now() >= due {
                                break;
                            }
                            shared.wake.wait_until(&mut state, due);
                        }
                    }

                    last_reopen = Instant::now();
                    match refresh() {
                        Ok(generation) => {
                            let mut state = shared.state.lock();
                            state.searching_gen = state.searching_gen.max(generation);
                            shared.reopened.notify_all();
                        }
                        Err(e) => warn!(error = %e, "index reopen failed"),
                    }
                }
            })?;

        Ok(ReopenThread {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn searching_generation(&self) -> u64 {
        self.shared.state.lock().searching_gen
    }

    /// Record a refresh done outside the thread, e.g. after a commit.
    pub fn refreshed(&self, generation: u64) {
        let mut state = self.shared.state.lock();
        state.searching_gen = state.searching_gen.max(generation);
        self.shared.reopened.notify_all();
    }

    /// Block until `generation` is visible to new searchers. Returns false on
    /// timeout or when the thread stops first.
    pub fn wait_for_generation(&self, generation: u64, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.shared.state.lock();
        if state.searching_gen >= generation {
            return true;
        }

        if generation > state.waiting_for {
            state.waiting_for = generation;
            // Shorten the current wait to min_stale
            self.shared.wake.notify_all();
        }

        while state.searching_gen < generation {
            if state.stop {
                return false;
            }
            match deadline {
                Some(deadline) => {
                    if self.shared.reopened.wait_until(&mut state, deadline).timed_out() {
                        return state.searching_gen >= generation;
                    }
                }
                None => self.shared.reopened.wait(&mut state),
            }
        }
        true
    }

    /// Stop and join the thread. Idempotent.
    pub fn stop(&self) {
        {
            let mut state = self.shared.state.lock();
            state.stop = true;
            self.shared.wake.notify_all();
            self.shared.reopened.notify_all();
        }
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("reopen thread panicked");
            }
        }
    }
}

impl Drop for ReopenThread {
    fn drop(&mut self) {
        self.stop();
    }
}
