//! The client: an ordered callback registry, the event dispatcher, and
//! the driver that takes one call from `connect` through the pipeline
//! and transport to completion.
use std::any::Any;
use std::sync::Arc;

use log::error;

use crate::action::{self, Action};
use crate::call::{Cursor, State};
use crate::engine::{ClientEngine, EnginePipe};
use crate::error::Error;
use crate::middleware::Middleware;
use crate::perform::WaitPerformer;
use crate::pipe::{self, Next, Pipe};
use crate::request::Request;
use crate::response::Response;

type Predicate = Arc<dyn Fn(&str, &dyn Any) -> bool + Send + Sync>;
type ErasedCallback = Arc<dyn Fn(&dyn Any) -> Result<(), Error> + Send + Sync>;

#[derive(Clone)]
struct Pair {
    accept: Predicate,
    invoke: ErasedCallback,
}

/// A programmable HTTP client.
///
/// Configuration is code: register callbacks with [`on`](Client::on)
/// or a [`Middleware`], add pipeline stages with
/// [`pipe`](Client::pipe), then drive calls with
/// [`connect`](Client::connect) or [`send`](Client::send).
///
/// `Client` is a cheap handle: cloning shares the registered callbacks
/// and the engine, so it can travel into deferred continuations and
/// across threads.
///
/// Dispatch is thread-agnostic. The one ordering guarantee: within a
/// single [`perform`](Client::perform), callbacks run in registration
/// order, before `perform` returns.
#[derive(Clone)]
pub struct Client {
    pairs: Vec<Pair>,
    pipes: Vec<Arc<dyn Pipe>>,
    engine: Arc<dyn ClientEngine>,
}

impl Client {
    pub fn new<E: ClientEngine + 'static>(engine: E) -> Self {
        Client {
            pairs: Vec::new(),
            pipes: Vec::new(),
            engine: Arc::new(engine),
        }
    }

    /// Register `callback` for the events `action` accepts. Pairs fire
    /// in registration order.
    ///
    /// A callback whose parameter type does not match an accepted
    /// event's parameter is not called; the mismatch is dispatched as
    /// an exception instead.
    pub fn on<T, F>(&mut self, action: &Action<T>, callback: F) -> &mut Self
    where
        T: Any,
        F: Fn(&T) -> Result<(), Error> + Send + Sync + 'static,
    {
        let invoke: ErasedCallback = Arc::new(move |param: &dyn Any| {
            match param.downcast_ref::<T>() {
                Some(param) => callback(param),
                None => Err(Error::Internal(
                    "callback parameter type mismatch".to_string(),
                )),
            }
        });
        self.pairs.push(Pair {
            accept: action.predicate(),
            invoke,
        });
        self
    }

    /// Builder-style twin of [`on`](Client::on).
    pub fn with_callback<T, F>(mut self, action: &Action<T>, callback: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.on(action, callback);
        self
    }

    /// Append a pipeline stage. Stages run in order, ahead of the
    /// engine.
    pub fn pipe<P: Pipe + 'static>(&mut self, pipe: P) -> &mut Self {
        self.pipes.push(Arc::new(pipe));
        self
    }

    /// Builder-style twin of [`pipe`](Client::pipe).
    pub fn with_pipe<P: Pipe + 'static>(mut self, pipe: P) -> Self {
        self.pipe(pipe);
        self
    }

    /// Let `middleware` register its callbacks.
    pub fn with_middleware<M: Middleware>(mut self, middleware: M) -> Self {
        middleware.inject(&mut self);
        self
    }

    /// The number of registered callback pairs.
    pub fn callbacks(&self) -> usize {
        self.pairs.len()
    }

    /// Publish `action` with `param`: offer every trigger name to
    /// every registered pair, in registration order, and invoke the
    /// callbacks that accept.
    ///
    /// Callback failures never escape: they are re-dispatched as
    /// exceptions, and failures of exception callbacks themselves are
    /// swallowed into the log.
    pub fn perform<T: Any>(&self, action: &Action<T>, param: &T) {
        for pair in &self.pairs {
            for name in action.triggers() {
                if (pair.accept)(name.as_str(), param) {
                    if let Err(failure) = (pair.invoke)(param) {
                        if name == "exception" {
                            error!("exception callback failed: {}", failure);
                        } else {
                            self.exception(failure);
                        }
                    }
                }
            }
        }
    }

    /// Dispatch an error to the exception callbacks.
    pub fn exception(&self, failure: Error) {
        for pair in &self.pairs {
            if (pair.accept)("exception", &failure) {
                if let Err(nested) = (pair.invoke)(&failure) {
                    error!("exception callback failed: {}", nested);
                }
            }
        }
    }

    /// Drive one call through its lifecycle: publish `connect` and
    /// `request`, run the pipeline into the engine, then publish
    /// `response` and `connected`, or, on a terminal failure, the
    /// failure's sub-kind name followed by `disconnected` exactly
    /// once. The first error observed is recorded on the call.
    pub fn connect(&self, cursor: &Cursor, next: Next) {
        self.perform(&action::CONNECT, cursor);
        cursor.set_state(State::Requesting);
        self.perform(&action::REQUEST, cursor);

        let mut stages = self.pipes.clone();
        stages.push(Arc::new(EnginePipe(self.engine.clone())));
        let chain = pipe::combine(stages);

        let client = self.clone();
        let done = cursor.clone();
        let outer = Next::new(move |outcome: Option<Error>| match outcome {
            None => {
                done.set_state(State::Connected);
                client.perform(&action::RESPONSE, &done);
                client.perform(&action::CONNECTED, &done);
                done.set_state(State::Done);
                next.ok();
            }
            Some(failure) => {
                done.set_error(failure.clone());
                done.set_state(State::Disconnected);
                match failure.trigger() {
                    Some("not-sent") => client.perform(&action::NOT_SENT, &done),
                    Some("not-received") => client.perform(&action::NOT_RECEIVED, &done),
                    Some("malformed") => client.perform(&action::MALFORMED, &done),
                    Some("not-parsed") => client.perform(&action::NOT_PARSED, &done),
                    _ => (),
                }
                client.perform(&action::DISCONNECTED, &done);
                done.set_state(State::Done);
                next.fail(failure);
            }
        });
        if let Err(failure) = chain.pipe(cursor.clone(), outer.clone()) {
            outer.resolve(Some(failure));
        }
    }

    /// Perform one exchange synchronously.
    pub fn send(&self, request: Request) -> Result<Response, Error> {
        let cursor = Cursor::new(request);
        match WaitPerformer::perform(|next| self.connect(&cursor, next)) {
            None => Ok(cursor.response(|r| r.clone())),
            Some(failure) => Err(failure),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::StreamEngine;
    use crate::io::ReadWriteAdapter;
    use crate::response::StatusCode;
    use crate::uri::Uri;
    use std::sync::Mutex;

    fn canned_client(wire: &'static [u8]) -> Client {
        Client::new(StreamEngine::new(ReadWriteAdapter::new(wire, Vec::new())))
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> impl Fn(&Cursor) -> Result<(), Error> {
        let log = log.clone();
        let tag = tag.to_string();
        move |_| {
            log.lock().unwrap().push(tag.clone());
            Ok(())
        }
    }

    #[test]
    fn test_callbacks_fire_once_each_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut client = canned_client(b"");
        client
            .on(&action::CONNECTED, recorder(&log, "first"))
            .on(&action::CONNECTED, recorder(&log, "second"))
            .on(&action::CONNECTED, recorder(&log, "third"));
        client.perform(&action::CONNECTED, &Cursor::new(Request::new()));
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_callback_failure_dispatches_exception_and_later_callbacks_still_fire() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let mut client = canned_client(b"");
        let seen = errors.clone();
        client
            .on(&action::CONNECTED, |_: &Cursor| {
                Err(Error::Unexpected("boom".to_string()))
            })
            .on(&action::CONNECTED, recorder(&log, "after"))
            .on(&action::EXCEPTION, move |e: &Error| {
                seen.lock().unwrap().push(e.clone());
                Ok(())
            });
        client.perform(&action::CONNECTED, &Cursor::new(Request::new()));
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
        assert_eq!(
            *errors.lock().unwrap(),
            vec![Error::Unexpected("boom".to_string())]
        );
    }

    #[test]
    fn test_failing_exception_callback_is_swallowed() {
        let mut client = canned_client(b"");
        client.on(&action::EXCEPTION, |_: &Error| Err(Error::Cancelled));
        // Must neither panic nor recurse.
        client.exception(Error::Timeout);
    }

    #[test]
    fn test_wrong_parameter_type_does_not_reach_typed_callbacks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut client = canned_client(b"");
        client.on(&action::CONNECT, recorder(&log, "connect"));
        // Publish the `connect` name with a Response parameter: the
        // typed predicate refuses it.
        let publisher = Action::<Response>::regex("connect", &["connect"]).unwrap();
        client.perform(&publisher, &Response::new(200));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_status_named_events() {
        let hits = Arc::new(Mutex::new(0));
        let mut client = canned_client(b"");
        let seen = hits.clone();
        let success = Action::<Response>::regex(r"2\d\d", &[]).unwrap();
        client.on(&success, move |_: &Response| {
            *seen.lock().unwrap() += 1;
            Ok(())
        });

        let ok = Response::new(200);
        let publisher = Action::<Response>::regex(r"\d{3}", &[ok.line.status.as_str()]).unwrap();
        client.perform(&publisher, &ok);
        assert_eq!(*hits.lock().unwrap(), 1);

        let fail = Response::new(500);
        let publisher =
            Action::<Response>::regex(r"\d{3}", &[fail.line.status.as_str()]).unwrap();
        client.perform(&publisher, &fail);
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn test_all_does_not_hear_exceptions() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut client = canned_client(b"");
        client.on(&action::ALL, recorder(&log, "all"));
        client.on(&action::CONNECTED, |_: &Cursor| {
            Err(Error::Unexpected("boom".to_string()))
        });
        client.perform(&action::CONNECTED, &Cursor::new(Request::new()));
        // ALL heard `connected` but not the exception dispatch.
        assert_eq!(*log.lock().unwrap(), vec!["all"]);
    }

    #[test]
    fn test_send_runs_full_lifecycle_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut client = canned_client(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
        client
            .on(&action::CONNECT, recorder(&log, "connect"))
            .on(&action::REQUEST, recorder(&log, "request"))
            .on(&action::RESPONSE, recorder(&log, "response"))
            .on(&action::CONNECTED, recorder(&log, "connected"))
            .on(&action::DISCONNECTED, recorder(&log, "disconnected"));
        let response = client
            .send(Request::get(Uri::parse("http://example.com/").unwrap()))
            .unwrap();
        assert_eq!(response.line.status, StatusCode::OK);
        assert_eq!(response.text().unwrap(), "hi");
        assert_eq!(
            *log.lock().unwrap(),
            vec!["connect", "request", "response", "connected"]
        );
    }

    #[test]
    fn test_send_failure_publishes_subkind_then_disconnected_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut client = canned_client(b"NONSENSE\r\n\r\n");
        let seen = log.clone();
        client
            .on(&action::MALFORMED, recorder(&log, "malformed"))
            .on(&action::DISCONNECTED, move |cursor: &Cursor| {
                // Subscribing on the generic name only; hears exactly
                // one `disconnected` offer per failure.
                assert_eq!(cursor.state(), State::Disconnected);
                seen.lock().unwrap().push("disconnected".to_string());
                Ok(())
            })
            .on(&action::CONNECTED, recorder(&log, "connected"));
        let cursor = Cursor::new(Request::get(Uri::parse("http://example.com/").unwrap()));
        let outcome = WaitPerformer::perform(|next| client.connect(&cursor, next));
        match outcome {
            Some(Error::Malformed(_)) => (),
            other => panic!("expected Malformed, got {:?}", other),
        }
        // The superset DISCONNECTED subscriber hears both the sub-kind
        // and the generic offer; `malformed` fired ahead of it.
        assert_eq!(
            *log.lock().unwrap(),
            vec!["malformed", "disconnected", "disconnected"]
        );
        assert_eq!(cursor.state(), State::Done);
        match cursor.error() {
            Some(Error::Malformed(_)) => (),
            other => panic!("expected recorded Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_pipes_run_before_engine_and_mutate_the_request() {
        let mut client = canned_client(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        client.pipe(|cursor: Cursor, next: Next| -> Result<(), Error> {
            cursor.request(|r| {
                r.headers.put("X-Stage", "ran");
            });
            next.ok();
            Ok(())
        });
        let cursor = Cursor::new(Request::get(Uri::parse("http://example.com/").unwrap()));
        let outcome = WaitPerformer::perform(|next| client.connect(&cursor, next));
        assert_eq!(outcome, None);
        assert_eq!(
            cursor.request(|r| r.headers.get("x-stage").map(String::from)),
            Some("ran".to_string())
        );
    }

    #[test]
    fn test_failing_pipe_skips_engine() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut client = canned_client(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        client.pipe(|_: Cursor, _: Next| -> Result<(), Error> {
            Err(Error::Unexpected("rejected by stage".to_string()))
        });
        client.on(&action::CONNECTED, recorder(&log, "connected"));
        let outcome =
            client.send(Request::get(Uri::parse("http://example.com/").unwrap()));
        assert_eq!(
            outcome,
            Err(Error::Unexpected("rejected by stage".to_string()))
        );
        assert!(log.lock().unwrap().is_empty());
    }
}
