//! One HTTP exchange: the request, the response, the first error
//! observed, and an untyped extras map for engine- and middleware-
//! private state.
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::engine::{CancelToken, CANCEL_EXTRA};
use crate::error::Error;
use crate::request::{Method, Request};
use crate::response::{Response, StatusCode};
use crate::uri::Uri;

/// An insertion-ordered mapping of name to arbitrary shared value.
///
/// Values are stored behind `Arc`, so cloning the map is shallow.
#[derive(Clone, Default)]
pub struct Extras(Vec<(String, Arc<dyn Any + Send + Sync>)>);

impl Extras {
    pub fn new() -> Self {
        Extras(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    /// Look up `name` and downcast it to `T`.
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.get(name).and_then(|v| v.downcast::<T>().ok())
    }

    /// Store `value` under `name`, replacing any existing entry in
    /// place.
    pub fn put<T: Any + Send + Sync>(&mut self, name: &str, value: T) -> &mut Self {
        self.put_arc(name, Arc::new(value))
    }

    /// Store an already-shared value under `name`.
    pub fn put_arc(&mut self, name: &str, value: Arc<dyn Any + Send + Sync>) -> &mut Self {
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.0.push((name.to_string(), value)),
        }
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        match self.0.iter().position(|(n, _)| n == name) {
            Some(index) => Some(self.0.remove(index).1),
            None => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| &n[..])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Extras {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

/// Where a call is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Created,
    Requesting,
    Responding,
    Connected,
    Disconnected,
    Done,
}

/// The aggregate of one exchange.
///
/// A call has no value equality: two calls are different exchanges even
/// when their messages agree, and a clone is deliberately not equal to
/// its original. Cloning deep-copies the messages and shallow-copies
/// the extras.
#[derive(Debug, Clone)]
pub struct Call {
    pub request: Request,
    pub response: Response,
    error: Option<Error>,
    pub extras: Extras,
    state: State,
}

impl Call {
    pub fn new(request: Request) -> Self {
        Call {
            request,
            response: Response::default(),
            error: None,
            extras: Extras::new(),
            state: State::Created,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Record an error. The first error observed wins; later errors are
    /// dropped.
    pub fn set_error(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }
}

/// A cheap cloneable handle on a [`Call`], scoped to one exchange.
///
/// The cursor is the parameter carried by lifecycle events and the
/// surface pipes and engines mutate. All access goes through short
/// closures over the locked call; the lock is not held across pipe
/// suspension points.
#[derive(Clone)]
pub struct Cursor {
    call: Arc<Mutex<Call>>,
}

impl Cursor {
    pub fn new(request: Request) -> Self {
        Cursor {
            call: Arc::new(Mutex::new(Call::new(request))),
        }
    }

    /// Apply `op` to the locked call.
    pub fn with<T>(&self, op: impl FnOnce(&mut Call) -> T) -> T {
        op(&mut self.call.lock().unwrap())
    }

    /// Apply `op` to the request.
    pub fn request<T>(&self, op: impl FnOnce(&mut Request) -> T) -> T {
        self.with(|call| op(&mut call.request))
    }

    /// Apply `op` to the response.
    pub fn response<T>(&self, op: impl FnOnce(&mut Response) -> T) -> T {
        self.with(|call| op(&mut call.response))
    }

    /// Apply `op` to the extras map.
    pub fn extras<T>(&self, op: impl FnOnce(&mut Extras) -> T) -> T {
        self.with(|call| op(&mut call.extras))
    }

    pub fn error(&self) -> Option<Error> {
        self.with(|call| call.error().cloned())
    }

    pub fn set_error(&self, error: Error) {
        self.with(|call| call.set_error(error))
    }

    pub fn state(&self) -> State {
        self.with(|call| call.state())
    }

    pub fn set_state(&self, state: State) {
        self.with(|call| call.set_state(state))
    }

    pub fn method(&self) -> Method {
        self.request(|r| r.line.method.clone())
    }

    pub fn uri(&self) -> Uri {
        self.request(|r| r.line.uri.clone())
    }

    pub fn status(&self) -> StatusCode {
        self.response(|r| r.line.status.clone())
    }

    /// A detached deep copy of the call as it stands.
    pub fn snapshot(&self) -> Call {
        self.with(|call| call.clone())
    }

    /// Cancel the exchange through the engine handle, if the engine
    /// registered one.
    pub fn cancel(&self) {
        if let Some(token) = self.extras(|e| e.get_as::<CancelToken>(CANCEL_EXTRA)) {
            token.cancel();
        }
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.call.try_lock() {
            Ok(call) => write!(f, "Cursor({:?}, {:?})", call.state(), call.request.line),
            Err(_) => write!(f, "Cursor(<locked>)"),
        }
    }
}
