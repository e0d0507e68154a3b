//! Named lifecycle events.
//!
//! An [`Action`] pairs the set of event names it publishes with a
//! predicate deciding which `(name, parameter)` events it accepts when
//! used as a subscription. Parameters travel as `&dyn Any`; typed
//! actions test the parameter's runtime type before accepting.
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::call::Cursor;
use crate::error::Error;

type Predicate = Arc<dyn Fn(&str, &dyn Any) -> bool + Send + Sync>;

/// A subscriber: invoked with a matching event's parameter, fallible
/// with any crate error.
pub type Callback<T> = Arc<dyn Fn(&T) -> Result<(), Error> + Send + Sync>;

/// An event descriptor: trigger names plus an acceptance predicate.
///
/// `T` is the parameter type callbacks subscribed with this action
/// receive.
pub struct Action<T: Any> {
    triggers: Vec<String>,
    accept: Predicate,
    marker: PhantomData<fn(&T)>,
}

impl<T: Any> Action<T> {
    /// An action with an arbitrary predicate.
    pub fn new<P>(triggers: &[&str], predicate: P) -> Self
    where
        P: Fn(&str, &dyn Any) -> bool + Send + Sync + 'static,
    {
        Action {
            triggers: triggers.iter().map(|s| s.to_string()).collect(),
            accept: Arc::new(predicate),
            marker: PhantomData,
        }
    }

    /// An action accepting events whose name fully matches `pattern`,
    /// regardless of parameter type.
    pub fn regex(pattern: &str, triggers: &[&str]) -> Result<Self, Error> {
        let regex = full_match(pattern)?;
        Ok(Action::new(triggers, move |name, _| regex.is_match(name)))
    }

    /// An action accepting events whose name fully matches `pattern`
    /// and whose parameter is a `T`.
    pub fn typed(pattern: &str, triggers: &[&str]) -> Result<Self, Error> {
        let regex = full_match(pattern)?;
        Ok(Action::new(triggers, move |name, param| {
            param.is::<T>() && regex.is_match(name)
        }))
    }

    /// The union of `actions`: accepts what any of them accepts,
    /// publishes the union of their trigger names.
    pub fn any(actions: &[&Action<T>]) -> Self {
        let mut triggers: Vec<String> = Vec::new();
        for action in actions {
            for name in &action.triggers {
                if !triggers.contains(name) {
                    triggers.push(name.clone());
                }
            }
        }
        let predicates: Vec<Predicate> = actions.iter().map(|a| a.accept.clone()).collect();
        Action {
            triggers,
            accept: Arc::new(move |name, param| predicates.iter().any(|p| p(name, param))),
            marker: PhantomData,
        }
    }

    /// The names this action publishes when performed.
    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    /// Whether this action accepts the event `(name, param)`.
    pub fn accepts(&self, name: &str, param: &dyn Any) -> bool {
        (self.accept)(name, param)
    }

    pub(crate) fn predicate(&self) -> Predicate {
        self.accept.clone()
    }
}

impl<T: Any> Clone for Action<T> {
    fn clone(&self) -> Self {
        Action {
            triggers: self.triggers.clone(),
            accept: self.accept.clone(),
            marker: PhantomData,
        }
    }
}

impl<T: Any> fmt::Debug for Action<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("triggers", &self.triggers)
            .finish()
    }
}

fn full_match(pattern: &str) -> Result<Regex, Error> {
    Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|_| Error::malformed_input("action-pattern", pattern))
}

lazy_static! {
    /// The start of an exchange. Parameter: the call cursor.
    pub static ref CONNECT: Action<Cursor> = Action::typed("connect", &["connect"]).unwrap();
    /// The request is about to be handed to the transport.
    pub static ref REQUEST: Action<Cursor> = Action::typed("request", &["request"]).unwrap();
    /// The transport produced a response, before `connected`.
    pub static ref RESPONSE: Action<Cursor> = Action::typed("response", &["response"]).unwrap();
    /// The exchange completed.
    pub static ref CONNECTED: Action<Cursor> = Action::typed("connected", &["connected"]).unwrap();
    /// Any terminal failure: the generic `disconnected` name or one of
    /// its sub-kinds. Publishes only the generic name.
    pub static ref DISCONNECTED: Action<Cursor> = Action::typed(
        "disconnected|not-sent|not-received|malformed|not-parsed",
        &["disconnected"]
    )
    .unwrap();
    /// The request could not be written.
    pub static ref NOT_SENT: Action<Cursor> = Action::typed("not-sent", &["not-sent"]).unwrap();
    /// The response could not be read.
    pub static ref NOT_RECEIVED: Action<Cursor> =
        Action::typed("not-received", &["not-received"]).unwrap();
    /// Wire bytes arrived but were not valid HTTP.
    pub static ref MALFORMED: Action<Cursor> = Action::typed("malformed", &["malformed"]).unwrap();
    /// The response head parsed but the body could not be decoded.
    pub static ref NOT_PARSED: Action<Cursor> =
        Action::typed("not-parsed", &["not-parsed"]).unwrap();
    /// A callback failed. Parameter: the error. Must be subscribed
    /// explicitly; `ALL` does not cover it.
    pub static ref EXCEPTION: Action<Error> = Action::typed("exception", &["exception"]).unwrap();
    /// Every event name except `exception`.
    pub static ref ALL: Action<Cursor> = Action::new(&[], |name, _| name != "exception");
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::request::Request;
    use crate::response::Response;

    #[test]
    fn test_regex_action_matches_names() {
        let action = Action::<Cursor>::regex("2\\d\\d", &["200"]).unwrap();
        assert!(action.accepts("200", &Cursor::new(Request::new())));
        assert!(action.accepts("299", &Cursor::new(Request::new())));
        assert!(!action.accepts("300", &Cursor::new(Request::new())));
        // Full match only: no prefix or suffix slack.
        assert!(!action.accepts("2000", &Cursor::new(Request::new())));
    }

    #[test]
    fn test_regex_action_ignores_parameter_type() {
        let action = Action::<Cursor>::regex("ping", &["ping"]).unwrap();
        assert!(action.accepts("ping", &Response::new(200)));
    }

    #[test]
    fn test_typed_action_requires_parameter_type() {
        assert!(CONNECT.accepts("connect", &Cursor::new(Request::new())));
        assert!(!CONNECT.accepts("connect", &Response::new(200)));
        assert!(!CONNECT.accepts("connected", &Cursor::new(Request::new())));
    }

    #[test]
    fn test_disconnected_superset() {
        let cursor = Cursor::new(Request::new());
        for name in &[
            "disconnected",
            "not-sent",
            "not-received",
            "malformed",
            "not-parsed",
        ] {
            assert!(DISCONNECTED.accepts(name, &cursor), "{}", name);
        }
        assert!(!DISCONNECTED.accepts("connected", &cursor));
        assert_eq!(DISCONNECTED.triggers(), &["disconnected".to_string()]);
    }

    #[test]
    fn test_all_matches_everything_but_exception() {
        let cursor = Cursor::new(Request::new());
        assert!(ALL.accepts("connected", &cursor));
        assert!(ALL.accepts("request", &cursor));
        assert!(ALL.accepts("response", &cursor));
        assert!(!ALL.accepts("exception", &cursor));
    }

    #[test]
    fn test_exception_is_typed_to_errors() {
        assert!(EXCEPTION.accepts("exception", &Error::Cancelled));
        assert!(!EXCEPTION.accepts("exception", &Cursor::new(Request::new())));
    }

    #[test]
    fn test_any_unions_triggers_and_predicates() {
        let a = Action::<Cursor>::regex("a", &["a", "shared"]).unwrap();
        let b = Action::<Cursor>::regex("b", &["b", "shared"]).unwrap();
        let both = Action::any(&[&a, &b]);
        assert_eq!(
            both.triggers(),
            &["a".to_string(), "shared".to_string(), "b".to_string()]
        );
        let cursor = Cursor::new(Request::new());
        assert!(both.accepts("a", &cursor));
        assert!(both.accepts("b", &cursor));
        assert!(!both.accepts("c", &cursor));
    }

    #[test]
    fn test_bad_pattern_is_refused() {
        assert!(Action::<Cursor>::regex("(", &[]).is_err());
    }
}
