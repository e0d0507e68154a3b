//! The continuation-passing pipeline.
//!
//! A [`Pipe`] receives the call cursor and a [`Next`] continuation. It
//! either completes and calls `next.ok()`, defers the call, fails
//! safely with `next.fail(error)`, or returns an error, which the
//! engine translates into `next.fail(error)` when the continuation is
//! still unspent.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;

use crate::call::Cursor;
use crate::error::Error;

type Continuation = Box<dyn FnOnce(Option<Error>) + Send>;

/// An at-most-once continuation.
///
/// The first resolution wins; later resolutions are dropped with a
/// debug log. Errors raised by a pipe after it has already resolved its
/// continuation therefore go nowhere; pipes own that ordering.
#[derive(Clone)]
pub struct Next {
    inner: Arc<Mutex<Option<Continuation>>>,
}

impl Next {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Option<Error>) + Send + 'static,
    {
        Next {
            inner: Arc::new(Mutex::new(Some(Box::new(f)))),
        }
    }

    /// Resolve successfully.
    pub fn ok(&self) {
        self.resolve(None)
    }

    /// Resolve with a failure.
    pub fn fail(&self, error: Error) {
        self.resolve(Some(error))
    }

    pub fn resolve(&self, error: Option<Error>) {
        let f = self.inner.lock().unwrap().take();
        match f {
            Some(f) => f(error),
            None => debug!("continuation already resolved; dropping {:?}", error),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.lock().unwrap().is_none()
    }
}

/// One stage of the pipeline.
pub trait Pipe: Send + Sync {
    /// Process `cursor`, resolving `next` now or later. Returning an
    /// error is equivalent to `next.fail(error)` while `next` is
    /// unspent.
    fn pipe(&self, cursor: Cursor, next: Next) -> Result<(), Error>;
}

impl<F> Pipe for F
where
    F: Fn(Cursor, Next) -> Result<(), Error> + Send + Sync,
{
    fn pipe(&self, cursor: Cursor, next: Next) -> Result<(), Error> {
        self(cursor, next)
    }
}

/// Chain pipes in order.
///
/// Each pipe's success advances to the following pipe; a failure
/// resolves the outer continuation directly and skips the rest. After
/// the last pipe succeeds the outer continuation resolves successfully.
pub fn combine(pipes: Vec<Arc<dyn Pipe>>) -> Combined {
    Combined {
        pipes: Arc::new(pipes),
    }
}

/// The pipe produced by [`combine`].
#[derive(Clone)]
pub struct Combined {
    pipes: Arc<Vec<Arc<dyn Pipe>>>,
}

impl Pipe for Combined {
    fn pipe(&self, cursor: Cursor, next: Next) -> Result<(), Error> {
        run_from(self.pipes.clone(), 0, cursor, next);
        Ok(())
    }
}

fn run_from(pipes: Arc<Vec<Arc<dyn Pipe>>>, index: usize, cursor: Cursor, outer: Next) {
    let pipe = match pipes.get(index) {
        Some(pipe) => pipe.clone(),
        None => return outer.ok(),
    };
    let continue_cursor = cursor.clone();
    let continue_outer = outer.clone();
    let next = Next::new(move |error| match error {
        Some(error) => continue_outer.resolve(Some(error)),
        None => run_from(pipes, index + 1, continue_cursor, continue_outer),
    });
    if let Err(error) = pipe.pipe(cursor, next.clone()) {
        next.resolve(Some(error));
    }
}

/// Race an inner pipe against a timer.
///
/// On expiry the call is cancelled through the engine handle and the
/// continuation resolves with [`Error::Timeout`]. Whichever side
/// resolves first wins; the loser's resolution is dropped.
pub struct TimeoutPipe<P> {
    inner: P,
    timeout: Duration,
}

impl<P> TimeoutPipe<P> {
    pub fn new(inner: P, timeout: Duration) -> Self {
        TimeoutPipe { inner, timeout }
    }
}

impl<P: Pipe> Pipe for TimeoutPipe<P> {
    fn pipe(&self, cursor: Cursor, next: Next) -> Result<(), Error> {
        let raced = Next::new(move |error| next.resolve(error));
        let timer = raced.clone();
        let timeout = self.timeout;
        let timed_cursor = cursor.clone();
        std::thread::spawn(move || {
            std::thread::sleep(timeout);
            if !timer.is_resolved() {
                timed_cursor.cancel();
                timer.resolve(Some(Error::Timeout));
            }
        });
        self.inner.pipe(cursor, raced)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::request::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recording_pipe(tag: &'static str) -> impl Pipe {
        move |cursor: Cursor, next: Next| -> Result<(), Error> {
            cursor.request(|r| {
                let seen = r.headers.get("x-seen").unwrap_or("").to_string();
                let seen = if seen.is_empty() {
                    tag.to_string()
                } else {
                    format!("{},{}", seen, tag)
                };
                r.headers.put("x-seen", &seen);
            });
            next.ok();
            Ok(())
        }
    }

    #[test]
    fn test_next_resolves_at_most_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let counted = count.clone();
        let next = Next::new(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        });
        next.ok();
        next.fail(Error::Cancelled);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(next.is_resolved());
    }

    #[test]
    fn test_combine_runs_in_order() {
        let cursor = Cursor::new(Request::new());
        let chain = combine(vec![
            Arc::new(recording_pipe("a")),
            Arc::new(recording_pipe("b")),
            Arc::new(recording_pipe("c")),
        ]);
        let outcome = Arc::new(Mutex::new(None));
        let seen = outcome.clone();
        chain
            .pipe(
                cursor.clone(),
                Next::new(move |error| {
                    *seen.lock().unwrap() = Some(error);
                }),
            )
            .unwrap();
        assert_eq!(*outcome.lock().unwrap(), Some(None));
        assert_eq!(
            cursor.request(|r| r.headers.get("x-seen").map(String::from)),
            Some("a,b,c".to_string())
        );
    }

    #[test]
    fn test_combine_empty_resolves_ok() {
        let outcome = Arc::new(Mutex::new(None));
        let seen = outcome.clone();
        combine(vec![])
            .pipe(
                Cursor::new(Request::new()),
                Next::new(move |error| {
                    *seen.lock().unwrap() = Some(error);
                }),
            )
            .unwrap();
        assert_eq!(*outcome.lock().unwrap(), Some(None));
    }

    #[test]
    fn test_failure_skips_later_pipes() {
        let failing = |_: Cursor, next: Next| -> Result<(), Error> {
            next.fail(Error::Unexpected("boom".to_string()));
            Ok(())
        };
        let cursor = Cursor::new(Request::new());
        let chain = combine(vec![
            Arc::new(recording_pipe("a")),
            Arc::new(failing),
            Arc::new(recording_pipe("c")),
        ]);
        let outcome = Arc::new(Mutex::new(None));
        let seen = outcome.clone();
        chain
            .pipe(
                cursor.clone(),
                Next::new(move |error| {
                    *seen.lock().unwrap() = error;
                }),
            )
            .unwrap();
        assert_eq!(
            *outcome.lock().unwrap(),
            Some(Error::Unexpected("boom".to_string()))
        );
        assert_eq!(
            cursor.request(|r| r.headers.get("x-seen").map(String::from)),
            Some("a".to_string())
        );
    }

    #[test]
    fn test_synchronous_error_becomes_next_failure() {
        let raising = |_: Cursor, _: Next| -> Result<(), Error> {
            Err(Error::Unexpected("boom".to_string()))
        };
        let cursor = Cursor::new(Request::new());
        let chain = combine(vec![
            Arc::new(recording_pipe("a")),
            Arc::new(recording_pipe("b")),
            Arc::new(raising),
        ]);
        let outcome = Arc::new(Mutex::new(None));
        let seen = outcome.clone();
        chain
            .pipe(
                cursor.clone(),
                Next::new(move |error| {
                    *seen.lock().unwrap() = error;
                }),
            )
            .unwrap();
        assert_eq!(
            *outcome.lock().unwrap(),
            Some(Error::Unexpected("boom".to_string()))
        );
        // Headers written by earlier pipes survive the failure.
        assert_eq!(
            cursor.request(|r| r.headers.get("x-seen").map(String::from)),
            Some("a,b".to_string())
        );
    }

    #[test]
    fn test_deferred_pipe_resumes_chain() {
        let deferring = |_: Cursor, next: Next| -> Result<(), Error> {
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                next.ok();
            });
            Ok(())
        };
        let cursor = Cursor::new(Request::new());
        let chain = combine(vec![Arc::new(deferring), Arc::new(recording_pipe("late"))]);
        let (sender, receiver) = std::sync::mpsc::channel();
        chain
            .pipe(
                cursor.clone(),
                Next::new(move |error| {
                    sender.send(error).unwrap();
                }),
            )
            .unwrap();
        assert_eq!(
            receiver.recv_timeout(Duration::from_secs(1)).unwrap(),
            None
        );
        assert_eq!(
            cursor.request(|r| r.headers.get("x-seen").map(String::from)),
            Some("late".to_string())
        );
    }

    #[test]
    fn test_timeout_pipe_fires_on_stalled_inner() {
        let stalled = |_: Cursor, _: Next| -> Result<(), Error> { Ok(()) };
        let timed = TimeoutPipe::new(stalled, Duration::from_millis(20));
        let (sender, receiver) = std::sync::mpsc::channel();
        timed
            .pipe(
                Cursor::new(Request::new()),
                Next::new(move |error| {
                    sender.send(error).unwrap();
                }),
            )
            .unwrap();
        assert_eq!(
            receiver.recv_timeout(Duration::from_secs(1)).unwrap(),
            Some(Error::Timeout)
        );
    }

    #[test]
    fn test_timeout_pipe_lets_fast_inner_win() {
        let fast = |_: Cursor, next: Next| -> Result<(), Error> {
            next.ok();
            Ok(())
        };
        let timed = TimeoutPipe::new(fast, Duration::from_millis(50));
        let (sender, receiver) = std::sync::mpsc::channel();
        timed
            .pipe(
                Cursor::new(Request::new()),
                Next::new(move |error| {
                    sender.send(error).unwrap();
                }),
            )
            .unwrap();
        assert_eq!(
            receiver.recv_timeout(Duration::from_secs(1)).unwrap(),
            None
        );
    }
}
