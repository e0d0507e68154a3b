//! Middleware: functions that register callbacks on a client.
use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info};

use crate::action;
use crate::call::Cursor;
use crate::client::Client;
use crate::error::Error;

/// Registers one or more `(action, callback)` pairs on a client.
/// Duplicate suppression is each middleware's own responsibility.
pub trait Middleware: Send + Sync {
    fn inject(&self, client: &mut Client);
}

impl<F> Middleware for F
where
    F: Fn(&mut Client) + Send + Sync,
{
    fn inject(&self, client: &mut Client) {
        self(client)
    }
}

/// Combine middlewares into one that injects each in order.
pub fn combine(middlewares: Vec<Arc<dyn Middleware>>) -> Combined {
    Combined { middlewares }
}

/// The middleware produced by [`combine`].
pub struct Combined {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Middleware for Combined {
    fn inject(&self, client: &mut Client) {
        for middleware in &self.middlewares {
            middleware.inject(client);
        }
    }
}

const START_EXTRA: &str = "log.start";

/// One log line per exchange: method, target, outcome, size, elapsed
/// time. Errors surface at error level, callback failures included.
pub struct LogMiddleware;

impl Middleware for LogMiddleware {
    fn inject(&self, client: &mut Client) {
        client.on(&action::REQUEST, |cursor: &Cursor| {
            cursor.extras(|extras| {
                extras.put(START_EXTRA, Instant::now());
            });
            debug!("{} {}", cursor.method(), cursor.uri());
            Ok(())
        });
        client.on(&action::CONNECTED, |cursor: &Cursor| {
            info!(
                "{} {} -> {} ({} bytes) - {}ms",
                cursor.method(),
                cursor.uri(),
                cursor.response(|r| r.line.to_string()),
                cursor.response(|r| r.content_length().unwrap_or(0)),
                elapsed_ms(cursor),
            );
            Ok(())
        });
        client.on(&action::DISCONNECTED, |cursor: &Cursor| {
            error!(
                "{} {} failed after {}ms: {}",
                cursor.method(),
                cursor.uri(),
                elapsed_ms(cursor),
                cursor
                    .error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown error".to_string()),
            );
            Ok(())
        });
        client.on(&action::EXCEPTION, |error: &Error| {
            error!("callback failed: {}", error);
            Ok(())
        });
    }
}

/// Reject responses that fail a user predicate.
///
/// The predicate runs on the `response` event; a refusal dispatches
/// [`Error::Unexpected`] to the exception callbacks while the call
/// completes normally otherwise.
pub struct ExpectMiddleware<F> {
    predicate: Arc<F>,
}

impl<F> ExpectMiddleware<F>
where
    F: Fn(&Cursor) -> bool + Send + Sync + 'static,
{
    pub fn new(predicate: F) -> Self {
        ExpectMiddleware {
            predicate: Arc::new(predicate),
        }
    }
}

impl<F> Middleware for ExpectMiddleware<F>
where
    F: Fn(&Cursor) -> bool + Send + Sync + 'static,
{
    fn inject(&self, client: &mut Client) {
        let predicate = self.predicate.clone();
        client.on(&action::RESPONSE, move |cursor: &Cursor| {
            if (*predicate)(cursor) {
                Ok(())
            } else {
                Err(Error::Unexpected(format!(
                    "{} {} -> {}",
                    cursor.method(),
                    cursor.uri(),
                    cursor.status().as_str(),
                )))
            }
        });
    }
}

fn elapsed_ms(cursor: &Cursor) -> u128 {
    cursor
        .extras(|extras| extras.get_as::<Instant>(START_EXTRA))
        .map(|start| start.elapsed().as_millis())
        .unwrap_or(0)
}
