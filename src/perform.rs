//! Performers bridge the continuation-based pipeline to a caller's
//! threading model.
use std::sync::{Arc, Condvar, Mutex};

use crate::error::Error;
use crate::pipe::Next;
use crate::runner::Runner;

/// Runs a continuation-based block and parks the calling thread until
/// the continuation resolves. Turns a callback engine into a
/// synchronous call.
pub struct WaitPerformer;

impl WaitPerformer {
    pub fn perform<F>(block: F) -> Option<Error>
    where
        F: FnOnce(Next),
    {
        let slot: Arc<(Mutex<Option<Option<Error>>>, Condvar)> =
            Arc::new((Mutex::new(None), Condvar::new()));
        let resolved = slot.clone();
        let next = Next::new(move |error| {
            let (lock, condvar) = &*resolved;
            *lock.lock().unwrap() = Some(error);
            condvar.notify_all();
        });
        block(next);
        let (lock, condvar) = &*slot;
        let mut outcome = lock.lock().unwrap();
        while outcome.is_none() {
            outcome = condvar.wait(outcome).unwrap();
        }
        outcome.take().unwrap()
    }
}

/// Schedules a continuation-based block on a [`Runner`] and hands the
/// outcome to a consumer. For hosts with their own scheduling surface.
pub struct RunnerPerformer {
    runner: Runner,
}

impl RunnerPerformer {
    pub fn new(runner: Runner) -> Self {
        RunnerPerformer { runner }
    }

    pub fn perform<F, C>(&mut self, block: F, consumer: C)
    where
        F: FnOnce(Next) + Send + 'static,
        C: FnOnce(Option<Error>) + Send + 'static,
    {
        self.runner.run(move || block(Next::new(consumer)));
    }
}
