//! Transport engines.
//!
//! A [`ClientEngine`] performs the wire exchange for one call: it
//! mutates the cursor's response and resolves the continuation. The
//! default [`TcpEngine`] speaks HTTP/1.1 over TCP; [`StreamEngine`]
//! runs the same exchange over any `Read + Write`, which is also the
//! in-memory test transport.
use std::io::Write;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::debug;

use crate::call::Cursor;
use crate::error::Error;
use crate::pipe::{Next, Pipe};

pub mod stream;
pub mod tcp;

pub use stream::StreamEngine;
pub use tcp::TcpEngine;

/// The extras key under which engines register their cancel handle.
pub const CANCEL_EXTRA: &str = "engine.cancel";

/// A transport implementation.
///
/// `connect` is expected to return promptly and complete
/// asynchronously: on success it fills in the cursor's response and
/// resolves `next` successfully, on failure it resolves `next` with a
/// classified error (`NotSent`, `NotReceived`, `Malformed`,
/// `NotParsed`, `Cancelled`).
pub trait ClientEngine: Send + Sync {
    fn connect(&self, cursor: Cursor, next: Next);
}

/// A cancellation handle registered in the call's extras.
///
/// Cancelling sets a flag and shuts the attached socket down, so
/// blocked reads and writes fail immediately; the engine reports the
/// failure as [`Error::Cancelled`].
pub struct CancelToken {
    cancelled: AtomicBool,
    stream: Mutex<Option<TcpStream>>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken {
            cancelled: AtomicBool::new(false),
            stream: Mutex::new(None),
        }
    }

    pub(crate) fn attach(&self, stream: TcpStream) {
        *self.stream.lock().unwrap() = Some(stream);
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(stream) = self.stream.lock().unwrap().take() {
            debug!("shutting down cancelled connection");
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        CancelToken::new()
    }
}

/// The pipeline stage wrapping the engine; always the last stage.
pub(crate) struct EnginePipe(pub Arc<dyn ClientEngine>);

impl Pipe for EnginePipe {
    fn pipe(&self, cursor: Cursor, next: Next) -> Result<(), Error> {
        cursor.set_state(crate::call::State::Responding);
        self.0.connect(cursor, next);
        Ok(())
    }
}

/// Fill in defaultable request headers, then write the request head
/// and body to `writer`. Defaults become visible on the request, so
/// callbacks and logs see what went on the wire.
pub(crate) fn write_request<W: Write>(writer: &mut W, cursor: &Cursor) -> Result<(), Error> {
    type Prepared = Result<(String, Option<crate::body::ByteSource>), Error>;
    let (head, body) = cursor.request(|request| -> Prepared {
        if !request.headers.contains("host") {
            let authority = &request.line.uri.authority;
            if !authority.host.is_empty() {
                let host = match authority.port.as_str() {
                    "" => authority.host.as_str().to_string(),
                    port => format!("{}:{}", authority.host.as_str(), port),
                };
                request.headers.put("Host", &host);
            }
        }
        if let Some(body) = &request.body {
            if !request.headers.contains("content-type") {
                let mime = body
                    .mime()
                    .cloned()
                    .unwrap_or_else(|| body.default_mime());
                request.headers.put("Content-Type", &mime.to_string());
            }
            if !request.headers.contains("content-length")
                && !request.headers.contains("transfer-encoding")
            {
                let length = body.content_length()?;
                request.headers.put("Content-Length", &length.to_string());
            }
        }
        if !request.headers.contains("user-agent") {
            request
                .headers
                .put("User-Agent", &format!("pipehttp/{}", crate::VERSION));
        }
        // One exchange per connection; ask the peer to close.
        if !request.headers.contains("connection") {
            request.headers.put("Connection", "close");
        }

        let target = {
            let uri = &request.line.uri;
            let mut target = match uri.path.as_str() {
                "" => "/".to_string(),
                path => path.to_string(),
            };
            if !uri.query.is_empty() {
                target.push('?');
                target.push_str(&uri.query.to_string());
            }
            target
        };
        let head = format!(
            "{} {} {}\r\n{}\r\n",
            request.line.method, target, request.line.version, request.headers
        );
        let body = match &request.body {
            Some(body) => Some(body.open()?),
            None => None,
        };
        Ok((head, body))
    })?;

    writer
        .write_all(head.as_bytes())
        .map_err(|e| Error::NotSent(e.to_string()))?;
    if let Some(mut body) = body {
        std::io::copy(&mut body, writer).map_err(|e| Error::NotSent(e.to_string()))?;
    }
    writer.flush().map_err(|e| Error::NotSent(e.to_string()))?;
    Ok(())
}
