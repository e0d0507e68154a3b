//! Runnable sinks for middleware that serialises callback work.
//!
//! Both sinks guarantee at most one runnable in flight at any instant.
//! The flush sink queues overflow; the skip sink drops it.
use std::collections::VecDeque;
use std::sync::Mutex;

use log::debug;

pub type Runnable = Box<dyn FnOnce() + Send>;

struct FlushState {
    queue: VecDeque<Runnable>,
    busy: bool,
}

/// A FIFO sink. Pushing onto an idle sink runs the runnable
/// immediately and marks the sink busy; each [`flush`](FlushSink::flush)
/// runs the next queued runnable, and a flush on an empty queue idles
/// the sink again.
pub struct FlushSink {
    state: Mutex<FlushState>,
}

impl FlushSink {
    pub fn new() -> Self {
        FlushSink {
            state: Mutex::new(FlushState {
                queue: VecDeque::new(),
                busy: false,
            }),
        }
    }

    pub fn push(&self, runnable: Runnable) {
        let run_now = {
            let mut state = self.state.lock().unwrap();
            if state.busy {
                state.queue.push_back(runnable);
                None
            } else {
                state.busy = true;
                Some(runnable)
            }
        };
        if let Some(runnable) = run_now {
            runnable();
        }
    }

    pub fn flush(&self) {
        let run_now = {
            let mut state = self.state.lock().unwrap();
            match state.queue.pop_front() {
                Some(runnable) => Some(runnable),
                None => {
                    state.busy = false;
                    None
                }
            }
        };
        if let Some(runnable) = run_now {
            runnable();
        }
    }

    /// Drop all queued runnables and idle the sink. Used on
    /// cancellation.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.queue.is_empty() {
            debug!("dropping {} queued runnables", state.queue.len());
        }
        state.queue.clear();
        state.busy = false;
    }

    pub fn is_empty(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.queue.is_empty() && !state.busy
    }
}

impl Default for FlushSink {
    fn default() -> Self {
        FlushSink::new()
    }
}

/// A boolean-gated sink. Pushing onto an idle sink runs the runnable
/// and marks the sink busy; runnables pushed while busy are dropped.
/// [`flush`](SkipSink::flush) idles the sink again.
pub struct SkipSink {
    busy: Mutex<bool>,
}

impl SkipSink {
    pub fn new() -> Self {
        SkipSink {
            busy: Mutex::new(false),
        }
    }

    pub fn push(&self, runnable: Runnable) {
        {
            let mut busy = self.busy.lock().unwrap();
            if *busy {
                debug!("sink busy; dropping runnable");
                return;
            }
            *busy = true;
        }
        runnable();
    }

    pub fn flush(&self) {
        *self.busy.lock().unwrap() = false;
    }

    /// Idle the sink. Used on cancellation.
    pub fn reset(&self) {
        self.flush();
    }
}

impl Default for SkipSink {
    fn default() -> Self {
        SkipSink::new()
    }
}
